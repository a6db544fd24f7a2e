//! The authentication system: account lifecycle plus the three
//! authenticators, behind one replaceable trait.

use std::sync::Arc;

use async_trait::async_trait;
use keyforge_protocol::{AccountId, ComboTokenResult, LoginResult};

use crate::store::{Account, TokenPurpose};
use crate::{AuthError, Authenticator};

/// The extension point of the login boundary.
///
/// Exactly one implementation is active per server. The built-in one is
/// [`DefaultAuthenticationSystem`](crate::DefaultAuthenticationSystem); an
/// extension replaces it through
/// [`AuthSystemRegistry`](crate::AuthSystemRegistry) before the server
/// starts. A replacement must honor every contract documented here.
///
/// All methods may be called concurrently without external locking.
#[async_trait]
pub trait AuthenticationSystem: Send + Sync + 'static {
    /// Registers a new account. `hashed_password` is the client-side hash.
    ///
    /// # Errors
    /// - [`AuthError::InvalidArgument`]: empty username or hash
    /// - [`AuthError::Conflict`]: username already taken
    async fn create_account(
        &self,
        username: &str,
        hashed_password: &str,
    ) -> Result<AccountId, AuthError>;

    /// Starts a password reset by issuing one verification token and
    /// handing it to the out-of-band channel. Does not change the
    /// password.
    ///
    /// # Errors
    /// [`AuthError::NotFound`] if no such account exists.
    async fn reset_password(&self, username: &str) -> Result<(), AuthError>;

    /// Redeems a one-time verification token.
    ///
    /// Returns `true` exactly once per valid, unexpired token. Unknown,
    /// expired, and already-used tokens yield `false`, as does an
    /// unreachable store. Never fails: guessing tokens is expected input.
    async fn verify_user(&self, token: &str) -> bool;

    /// The authenticator for the password flow. Same instance every call.
    fn password_authenticator(&self) -> Arc<dyn Authenticator<LoginResult>>;

    /// The authenticator for the token-refresh flow. Same instance every
    /// call.
    fn token_authenticator(&self) -> Arc<dyn Authenticator<LoginResult>>;

    /// The authenticator for the session-key (combo token) flow. Same
    /// instance every call.
    fn session_key_authenticator(
        &self,
    ) -> Arc<dyn Authenticator<ComboTokenResult>>;
}

/// The out-of-band channel verification tokens travel through (email,
/// SMS, an admin console...).
#[async_trait]
pub trait TokenDelivery: Send + Sync + 'static {
    /// Hands `token` to the account owner.
    async fn deliver(
        &self,
        account: &Account,
        purpose: TokenPurpose,
        token: &str,
    ) -> Result<(), AuthError>;
}

/// A [`TokenDelivery`] that drops tokens after logging who they were for.
///
/// The token itself is never logged. Deployments that support password
/// resets must install a real channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardDelivery;

#[async_trait]
impl TokenDelivery for DiscardDelivery {
    async fn deliver(
        &self,
        account: &Account,
        purpose: TokenPurpose,
        _token: &str,
    ) -> Result<(), AuthError> {
        tracing::info!(
            account_id = %account.id,
            %purpose,
            "verification token issued, no delivery channel configured"
        );
        Ok(())
    }
}
