//! Unified error type for the Keyforge framework.

use keyforge_auth::AuthError;
use keyforge_protocol::ProtocolError;
use keyforge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum KeyforgeError {
    /// Binding, accepting, or talking to a connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An account operation or login was refused.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::FrameTooLarge { size: 20, limit: 10 };
        let keyforge_err: KeyforgeError = err.into();
        assert!(matches!(keyforge_err, KeyforgeError::Transport(_)));
        assert!(keyforge_err.to_string().contains("limit of 10"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let keyforge_err: KeyforgeError = err.into();
        assert!(matches!(keyforge_err, KeyforgeError::Protocol(_)));
    }

    #[test]
    fn test_from_auth_error_is_transparent() {
        let err = AuthError::Conflict("username alice is taken".into());
        let keyforge_err: KeyforgeError = err.clone().into();
        assert!(matches!(keyforge_err, KeyforgeError::Auth(_)));
        assert_eq!(keyforge_err.to_string(), err.to_string());
    }
}
