//! Authentication error types.

use std::fmt;

use kc_storage::StorageError;
use uuid::Uuid;

/// Authentication operation errors.
#[derive(Debug)]
pub enum AuthError {
    /// Authentication flow error.
    FlowError(String),
    /// Invalid authentication state.
    InvalidState,
    /// No authenticator is registered under the provider id.
    UnknownAuthenticator(String),
    /// Execution not found in the flow.
    ExecutionNotFound(Uuid),
    /// Storage error while loading or seeding flows.
    Storage(StorageError),
    /// Internal error.
    Internal(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FlowError(msg) => write!(f, "authentication flow error: {msg}"),
            Self::InvalidState => write!(f, "invalid authentication state"),
            Self::UnknownAuthenticator(id) => write!(f, "unknown authenticator: {id}"),
            Self::ExecutionNotFound(id) => write!(f, "execution not found: {id}"),
            Self::Storage(err) => write!(f, "storage error: {err}"),
            Self::Internal(msg) => write!(f, "internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = AuthError::UnknownAuthenticator("auth-magic".to_string());
        assert_eq!(err.to_string(), "unknown authenticator: auth-magic");

        let err = AuthError::FlowError("missing nested flow".to_string());
        assert!(err.to_string().contains("missing nested flow"));
    }

    #[test]
    fn storage_errors_convert() {
        let err: AuthError = StorageError::not_found("AuthenticationFlow", Uuid::now_v7()).into();
        assert!(matches!(err, AuthError::Storage(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
