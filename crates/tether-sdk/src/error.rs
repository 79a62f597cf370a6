//! Error types for the Tether ABI

/// Result type for ABI calls
pub type AbiResult<T> = Result<T, NativeError>;

/// Binding error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NativeError {
    /// The boundary call itself reported a fault
    #[error("Native call {operation} failed: {message}")]
    NativeCallFailure {
        /// Operation id that failed
        operation: String,
        /// Message reported by the native side
        message: String,
    },

    /// Type mismatch during conversion or reconstruction
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// Operation on a proxy whose storage was released
    #[error("Use after release: {kind} proxy was already released")]
    UseAfterRelease {
        /// Kind id of the released proxy
        kind: String,
    },

    /// A null handle reached an operation that would dereference it
    #[error("Null handle passed to {operation}")]
    NullHandle {
        /// Operation that received the null handle
        operation: String,
    },

    /// Field name not declared by the kind
    #[error("Field '{field}' not found in kind '{kind}'")]
    UnknownField {
        /// Kind id
        kind: String,
        /// Requested field name
        field: String,
    },

    /// Invalid argument
    #[error("Argument error: {0}")]
    ArgumentError(String),

    /// Other ABI failure
    #[error("{0}")]
    AbiError(String),
}

impl NativeError {
    /// Build a `NativeCallFailure` for an operation
    pub fn call_failure(operation: impl ToString, message: impl Into<String>) -> Self {
        NativeError::NativeCallFailure {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Build a `TypeMismatch`
    pub fn mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        NativeError::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// True for programmer errors that must never be retried or absorbed
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            NativeError::UseAfterRelease { .. } | NativeError::NullHandle { .. }
        )
    }
}

impl From<String> for NativeError {
    fn from(s: String) -> Self {
        NativeError::AbiError(s)
    }
}

impl From<&str> for NativeError {
    fn from(s: &str) -> Self {
        NativeError::AbiError(s.to_string())
    }
}
