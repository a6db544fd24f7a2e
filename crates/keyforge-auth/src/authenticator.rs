//! The strategy trait every login flow is verified through.
//!
//! An [`Authenticator`] takes one normalized [`AuthenticationRequest`] and
//! returns the flow's result type, or an [`AuthError`]. The built-in
//! authenticators live in [`crate::builtin`]; an extension replaces any of
//! them by returning its own implementation from its
//! [`AuthenticationSystem`](crate::AuthenticationSystem).

use async_trait::async_trait;

use crate::{AuthError, AuthenticationRequest};

/// Verifies one login flow and produces a `T`.
///
/// # Contract
///
/// - Read only the payload of your own flow. A request built for another
///   flow is a caller bug: answer [`AuthError::InvalidArgument`].
/// - Credentials arrive already hashed. Never hash, log, or echo them.
/// - Talking to the account store is fine (issuing or renewing session
///   keys); report an unreachable store as [`AuthError::Unavailable`].
///
/// Implementations are shared across connection tasks, hence
/// `Send + Sync`. The trait is object safe so the server can hold
/// `Arc<dyn Authenticator<T>>` handles.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use keyforge_auth::{AuthError, AuthenticationRequest, Authenticator};
/// use keyforge_protocol::{AccountId, LoginResult};
///
/// /// Lets every password login in as account 1. Development only.
/// struct OpenDoor;
///
/// #[async_trait]
/// impl Authenticator<LoginResult> for OpenDoor {
///     async fn authenticate(
///         &self,
///         request: AuthenticationRequest,
///     ) -> Result<LoginResult, AuthError> {
///         let payload = request.password_payload().ok_or_else(|| {
///             AuthError::InvalidArgument("password flow only".into())
///         })?;
///         Ok(LoginResult {
///             account_id: AccountId(1),
///             username: payload.username.clone(),
///             session_token: "dev".into(),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait Authenticator<T>: Send + Sync {
    /// Verifies the request.
    ///
    /// # Errors
    /// - [`AuthError::NotFound`]: no matching account
    /// - [`AuthError::InvalidCredential`]: hash or token mismatch
    /// - [`AuthError::Expired`]: token or session past its window
    /// - [`AuthError::InvalidArgument`]: wrong flow or malformed payload
    /// - [`AuthError::Unavailable`]: the store could not be reached
    async fn authenticate(
        &self,
        request: AuthenticationRequest,
    ) -> Result<T, AuthError>;
}
