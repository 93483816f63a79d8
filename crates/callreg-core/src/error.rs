//! Error types for callreg.
//!
//! Every failure a caller can trigger through `register` or `call` is reported
//! here as a value. Call-time errors are produced before the target method runs,
//! so a failed call never leaves the receiver half-modified.

use crate::convert::ConversionError;
use crate::value::ValueType;
use thiserror::Error;

/// Main error type for the registry.
#[derive(Debug, Error)]
pub enum CallregError {
    // Lookup errors
    #[error("Method not found: {name}")]
    MethodNotFound { name: String },

    // Argument matching errors
    #[error("Argument count mismatch for {name}: expected {expected}, got {actual}")]
    ArgumentCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Argument {index} of {name}: {actual} is not convertible to {expected}")]
    ArgumentTypeMismatch {
        name: String,
        index: usize,
        expected: ValueType,
        actual: ValueType,
        #[source]
        source: ConversionError,
    },

    // Registration errors
    #[error("Invalid {kind} name: {name:?}")]
    InvalidName { kind: &'static str, name: String },

    // Invocation errors
    #[error("Return value mismatch for {name}: {message}")]
    ReturnMismatch { name: String, message: String },

    #[error("Adapter mismatch: {message}")]
    AdapterMismatch { message: String },

    #[error("Receiver of type {type_name} is poisoned by an earlier panic")]
    ReceiverPoisoned { type_name: String },

    #[error("Registry lock poisoned")]
    LockPoisoned,

    // JSON bridge errors
    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, CallregError>;

impl From<serde_json::Error> for CallregError {
    fn from(err: serde_json::Error) -> Self {
        CallregError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl CallregError {
    /// Convert to a JSON-RPC error code.
    ///
    /// - -32601: Method not found
    /// - -32602: Invalid params (arity, argument type, malformed JSON params)
    /// - -32603: Internal error
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            CallregError::MethodNotFound { .. } => -32601,

            CallregError::ArgumentCountMismatch { .. }
            | CallregError::ArgumentTypeMismatch { .. }
            | CallregError::InvalidParams { .. } => -32602,

            _ => -32603,
        }
    }

    /// Check if the error was caused by what the caller passed in, as opposed
    /// to a fault inside the registry or a registered method.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            CallregError::MethodNotFound { .. }
                | CallregError::ArgumentCountMismatch { .. }
                | CallregError::ArgumentTypeMismatch { .. }
                | CallregError::InvalidName { .. }
                | CallregError::InvalidParams { .. }
        )
    }
}
