//! Common error taxonomy shared by every crate in the `galvani` workspace.
//!
//! All tree validation happens eagerly at node construction, so an [`Error`]
//! coming out of a constructor means the requested tree was never built.
//! Evaluation-time failures (missing state, missing input, shape mismatch)
//! use the same type and propagate immediately; the engine performs no
//! retries and has no fallback values.

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure class the expression engine can produce.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// A domain or auxiliary-domain precondition was violated.
    #[error("domain error: {0}")]
    Domain(String),

    /// An argument had the wrong kind (integration variable, index type,
    /// edge/node mismatch on a gradient-like operator).
    #[error("type error: {0}")]
    Type(String),

    /// An argument had the right kind but an invalid value (edge-valued
    /// operand where node-valued is required, out-of-range index under
    /// strict checks).
    #[error("value error: {0}")]
    Value(String),

    /// A model-level precondition was violated (boundary value on tabs
    /// outside the current collector).
    #[error("model error: {0}")]
    Model(String),

    /// The operation is deliberately unsupported.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Numeric evaluation failed (missing state vector, missing input).
    #[error("evaluation error: {0}")]
    Evaluate(String),

    /// Array shapes were incompatible during evaluation.
    #[error("shape error: {0}")]
    Shape(String),
}

impl Error {
    pub fn domain(msg: impl Into<String>) -> Self {
        Self::Domain(msg.into())
    }

    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }

    pub fn value(msg: impl Into<String>) -> Self {
        Self::Value(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::NotImplemented(msg.into())
    }

    pub fn evaluate(msg: impl Into<String>) -> Self {
        Self::Evaluate(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }
}
