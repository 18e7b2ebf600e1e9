#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

//! Deferred evaluation runtime for tidal.
//!
//! A [`Runtime`] owns an arena of environments and an arena of promises.
//! Function arguments are captured as promises, which can be forced (once),
//! inspected with [`Runtime::capture_argument`], or rewritten with
//! [`Runtime::substitute`]. The data-masking operators ([`Runtime::filter`],
//! [`Runtime::mutate`] and friends) evaluate captured expressions against the
//! columns of a [`Table`] before falling back to the caller's scope.

mod builtins;
pub mod env;
pub mod error;
pub mod eval;
pub mod mask;
pub mod promise;
pub mod quote;
pub mod registry;
pub mod runtime;
pub mod subst;
pub mod table;
mod verbs;

pub use env::{Binding, DotsEntry};
pub use error::{EvalError, NativeError, Result};
pub use eval::Context;
pub use mask::DataMask;
pub use promise::PromiseId;
pub use quote::quote;
pub use registry::{ArgValue, NativeFn, Registry};
pub use runtime::{Limits, Runtime, MAX_CALL_DEPTH, TOP_ENV};
pub use subst::{Bindings, Replacement, SubstMap};
pub use table::{DataFrame, Table};
