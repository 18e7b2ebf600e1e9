#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

//! Expression and value model shared by the tidal parser, runtime and CLI.
//!
//! Expressions are pure data. Every surface construct (operators, blocks,
//! assignment, function literals) is encoded as a [`expr::Call`] so that
//! quoting and substitution only ever deal with four node kinds.

mod display;
pub mod expr;
pub mod fold;
pub mod value;

pub use expr::{Arg, Call, Expr};
pub use fold::{fold_expr, walk_call, Folder};
pub use value::{Closure, EnvId, Formal, Value};
