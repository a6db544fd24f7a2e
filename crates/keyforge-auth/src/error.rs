//! Error types for the authentication boundary.

/// Everything that can go wrong inside the authentication core.
///
/// The transport layer maps each variant to a wire status. `NotFound` and
/// `InvalidCredential` stay distinct here so they can be logged apart, but
/// login responses must not tell them apart (see
/// [`is_login_failure`](Self::is_login_failure)).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Malformed, missing, or contradictory input. A caller bug; never
    /// retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The referenced account or token does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An account with this username already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The presented credential does not match.
    #[error("invalid credential")]
    InvalidCredential,

    /// The token, session key, or session data is past its validity window.
    #[error("expired: {0}")]
    Expired(String),

    /// The persistence collaborator could not be reached.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    /// `true` only for transient store failures. Retry policy belongs to
    /// the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// `true` for the failures that must look identical on the wire to
    /// prevent account enumeration.
    pub fn is_login_failure(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(AuthError::Unavailable("db down".into()).is_retryable());
        assert!(!AuthError::InvalidCredential.is_retryable());
        assert!(!AuthError::Conflict("bob".into()).is_retryable());
        assert!(!AuthError::Expired("session key".into()).is_retryable());
    }

    #[test]
    fn test_login_failure_groups_not_found_and_bad_credential() {
        assert!(AuthError::NotFound("account".into()).is_login_failure());
        assert!(AuthError::InvalidCredential.is_login_failure());
        assert!(!AuthError::Expired("x".into()).is_login_failure());
        assert!(!AuthError::InvalidArgument("x".into()).is_login_failure());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            AuthError::Conflict("username bob".into()).to_string(),
            "conflict: username bob"
        );
        assert_eq!(AuthError::InvalidCredential.to_string(), "invalid credential");
    }
}
