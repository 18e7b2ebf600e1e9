#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

//! Host-side parser for tidal's R-like expression syntax.
//!
//! The runtime never parses text itself; this crate is the utility the CLI
//! and tests use to build [`tidal_ast::Expr`] values from source.

mod lexer;
mod parser;
mod token;

pub use parser::{parse_arg, parse_expr, parse_program, MAX_NESTING_DEPTH};
