use thiserror::Error;
use tidal_ast::Expr;

use crate::promise::PromiseId;

/// Failures raised by native functions in the callable registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    /// Argument of the wrong type
    #[error("type error: {0}")]
    Type(String),
    /// Wrong number of arguments
    #[error("expected {expected} argument(s), got {found}")]
    Arity { expected: usize, found: usize },
    /// Vector operands whose lengths cannot be recycled to a common length
    #[error("operand lengths {left} and {right} are incompatible")]
    Length { left: usize, right: usize },
}

/// Every way evaluation can fail. Operations return the first failure met
/// during a traversal; nothing here is recovered internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("object '{0}' not found")]
    UnboundSymbol(String),
    #[error("attempt to apply non-function: {0}")]
    NotAFunction(Expr),
    /// The promise's value was demanded while it was being computed
    #[error("promise {0} already under evaluation: recursive default argument reference or earlier problems?")]
    CyclicForce(PromiseId),
    #[error("shape mismatch: expected {expected}, found {actual}")]
    ShapeMismatch { expected: String, actual: String },
    /// Malformed argument list or misuse of a special form
    #[error("argument error: {0}")]
    Argument(String),
    #[error("in {name}(): {source}")]
    Native {
        name: String,
        #[source]
        source: NativeError,
    },
    #[error("maximum call depth exceeded (limit: {0} calls)")]
    CallDepthExceeded(u32),
}

impl EvalError {
    pub(crate) fn argument(msg: impl Into<String>) -> Self {
        EvalError::Argument(msg.into())
    }

    pub(crate) fn shape(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        EvalError::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

pub type Result<T, E = EvalError> = std::result::Result<T, E>;
