//! The built-in [`AuthenticationSystem`].

use std::sync::Arc;

use async_trait::async_trait;
use keyforge_protocol::{AccountId, ComboTokenResult, LoginResult};

use crate::builtin::{
    PasswordAuthenticator, SessionKeyAuthenticator, TokenAuthenticator,
};
use crate::config::AuthConfig;
use crate::store::{AccountStore, TokenPurpose, TokenState};
use crate::system::{DiscardDelivery, TokenDelivery};
use crate::token::{duration_millis, now_millis};
use crate::{AuthError, AuthenticationSystem, Authenticator};

/// Account lifecycle and the three built-in authenticators over one
/// [`AccountStore`].
///
/// The authenticators are built once in [`new`](Self::new); the accessor
/// methods hand out clones of the same `Arc`s.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use keyforge_auth::{
///     AuthConfig, AuthenticationSystem, DefaultAuthenticationSystem,
///     MemoryAccountStore,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), keyforge_auth::AuthError> {
/// let store = Arc::new(MemoryAccountStore::new());
/// let system = DefaultAuthenticationSystem::new(store, AuthConfig::default());
/// let id = system.create_account("bob", "5e884898da28").await?;
/// assert_eq!(id.0, 1);
/// # Ok(())
/// # }
/// ```
pub struct DefaultAuthenticationSystem<S> {
    store: Arc<S>,
    config: Arc<AuthConfig>,
    delivery: Arc<dyn TokenDelivery>,
    password: Arc<dyn Authenticator<LoginResult>>,
    token: Arc<dyn Authenticator<LoginResult>>,
    session_key: Arc<dyn Authenticator<ComboTokenResult>>,
}

impl<S: AccountStore> DefaultAuthenticationSystem<S> {
    /// Builds the system with [`DiscardDelivery`] as the token channel.
    pub fn new(store: Arc<S>, config: AuthConfig) -> Self {
        let config = Arc::new(config);
        Self {
            password: Arc::new(PasswordAuthenticator::new(
                Arc::clone(&store),
                Arc::clone(&config),
            )),
            token: Arc::new(TokenAuthenticator::new(
                Arc::clone(&store),
                Arc::clone(&config),
            )),
            session_key: Arc::new(SessionKeyAuthenticator::new(
                Arc::clone(&store),
                Arc::clone(&config),
            )),
            delivery: Arc::new(DiscardDelivery),
            store,
            config,
        }
    }

    /// Replaces the channel verification tokens are delivered through.
    pub fn with_delivery(mut self, delivery: Arc<dyn TokenDelivery>) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Issues a verification token for `username` and hands it to the
    /// delivery channel.
    ///
    /// # Errors
    /// - [`AuthError::NotFound`] if the account does not exist
    /// - whatever the delivery channel reports
    pub async fn issue_verification(
        &self,
        username: &str,
        purpose: TokenPurpose,
    ) -> Result<(), AuthError> {
        let account = self
            .store
            .find_account(username)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("account {username}")))?;

        let ttl_millis = duration_millis(self.config.verification_token_ttl());
        let expires_at = now_millis().saturating_add(ttl_millis);
        let token = self.store.issue_token(purpose, account.id, expires_at).await?;

        self.delivery.deliver(&account, purpose, &token).await?;
        tracing::info!(account_id = %account.id, %purpose, "verification token issued");
        Ok(())
    }

    /// Finishes a password reset: redeems a `PasswordReset` token and
    /// replaces the account's password hash.
    ///
    /// The old session key and combo token are revoked, so every device
    /// has to log in again with the new password.
    ///
    /// # Errors
    /// - [`AuthError::InvalidArgument`] for an empty hash or a token issued
    ///   for another purpose
    /// - [`AuthError::NotFound`] for an unknown token
    /// - [`AuthError::Expired`] if the token is expired or already used
    pub async fn complete_password_reset(
        &self,
        token: &str,
        new_hashed_password: &str,
    ) -> Result<(), AuthError> {
        if new_hashed_password.trim().is_empty() {
            return Err(AuthError::InvalidArgument("password is required".into()));
        }

        let record = self
            .store
            .find_token(token)
            .await?
            .ok_or_else(|| AuthError::NotFound("verification token".into()))?;
        if record.purpose != TokenPurpose::PasswordReset {
            return Err(AuthError::InvalidArgument(format!(
                "token was issued for {}",
                record.purpose
            )));
        }

        let redeemed = self
            .store
            .invalidate_token_atomically(token, TokenState::Verified, now_millis())
            .await?;
        if !redeemed {
            return Err(AuthError::Expired("verification token".into()));
        }

        self.store
            .update_password(record.account_id, new_hashed_password)
            .await?;
        tracing::info!(account_id = %record.account_id, "password reset completed");
        Ok(())
    }
}

#[async_trait]
impl<S: AccountStore> AuthenticationSystem for DefaultAuthenticationSystem<S> {
    async fn create_account(
        &self,
        username: &str,
        hashed_password: &str,
    ) -> Result<AccountId, AuthError> {
        if username.trim().is_empty() {
            return Err(AuthError::InvalidArgument("username is required".into()));
        }
        if hashed_password.trim().is_empty() {
            return Err(AuthError::InvalidArgument("password is required".into()));
        }

        let account = self.store.create_account(username, hashed_password).await?;
        tracing::info!(account_id = %account.id, "account created");
        Ok(account.id)
    }

    async fn reset_password(&self, username: &str) -> Result<(), AuthError> {
        self.issue_verification(username, TokenPurpose::PasswordReset)
            .await
    }

    async fn verify_user(&self, token: &str) -> bool {
        match self
            .store
            .invalidate_token_atomically(token, TokenState::Consumed, now_millis())
            .await
        {
            Ok(true) => {
                tracing::info!("verification token consumed");
                true
            }
            Ok(false) => {
                tracing::debug!("verification token rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "verification failed: store error");
                false
            }
        }
    }

    fn password_authenticator(&self) -> Arc<dyn Authenticator<LoginResult>> {
        Arc::clone(&self.password)
    }

    fn token_authenticator(&self) -> Arc<dyn Authenticator<LoginResult>> {
        Arc::clone(&self.token)
    }

    fn session_key_authenticator(
        &self,
    ) -> Arc<dyn Authenticator<ComboTokenResult>> {
        Arc::clone(&self.session_key)
    }
}
