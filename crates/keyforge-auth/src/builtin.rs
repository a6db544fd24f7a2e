//! The built-in authenticators, one per login flow.
//!
//! All three are generic over the [`AccountStore`] and hold no state of
//! their own beyond shared handles, so one instance serves every
//! connection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keyforge_protocol::{ComboTokenResult, LoginResult};

use crate::config::AuthConfig;
use crate::store::{Account, AccountStore, SessionKey};
use crate::token::{duration_millis, generate_token, is_past, now_millis, secrets_match};
use crate::{AuthError, AuthenticationRequest, Authenticator};

/// Account type reported for regular (non-guest, non-third-party) logins.
const ACCOUNT_TYPE_STANDARD: u32 = 1;

/// How far ahead of the server clock combo data may be stamped.
const MAX_CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);

// ---------------------------------------------------------------------------
// Password
// ---------------------------------------------------------------------------

/// Username + hashed password → fresh session key.
pub struct PasswordAuthenticator<S> {
    store: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S: AccountStore> PasswordAuthenticator<S> {
    pub fn new(store: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self { store, config }
    }

    async fn find_or_create(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Account, AuthError> {
        if let Some(account) = self.store.find_account(username).await? {
            return Ok(account);
        }
        if !self.config.auto_create_accounts {
            return Err(AuthError::NotFound(format!("account {username}")));
        }

        match self.store.create_account(username, password_hash).await {
            Ok(account) => {
                tracing::info!(
                    account_id = %account.id,
                    "account created on first login"
                );
                Ok(account)
            }
            // Lost a race against a concurrent first login.
            Err(AuthError::Conflict(_)) => self
                .store
                .find_account(username)
                .await?
                .ok_or_else(|| AuthError::NotFound(format!("account {username}"))),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<S: AccountStore> Authenticator<LoginResult> for PasswordAuthenticator<S> {
    async fn authenticate(
        &self,
        request: AuthenticationRequest,
    ) -> Result<LoginResult, AuthError> {
        let payload = request.expect_password()?;
        let handle = request.handle();

        let account = self
            .find_or_create(&payload.username, &payload.password)
            .await
            .inspect_err(|e| {
                tracing::debug!(%handle, error = %e, "password login rejected");
            })?;

        if !secrets_match(&payload.password, &account.password_hash) {
            tracing::debug!(
                %handle,
                account_id = %account.id,
                "password login rejected: hash mismatch"
            );
            return Err(AuthError::InvalidCredential);
        }

        let key = SessionKey {
            token: generate_token(),
            issued_at: now_millis(),
        };
        self.store.store_session_key(account.id, key.clone()).await?;

        tracing::info!(%handle, account_id = %account.id, "password login succeeded");
        Ok(LoginResult {
            account_id: account.id,
            username: account.username,
            session_token: key.token,
        })
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// Account id + session key → the same key with a renewed validity window.
pub struct TokenAuthenticator<S> {
    store: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S: AccountStore> TokenAuthenticator<S> {
    pub fn new(store: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self { store, config }
    }
}

#[async_trait]
impl<S: AccountStore> Authenticator<LoginResult> for TokenAuthenticator<S> {
    async fn authenticate(
        &self,
        request: AuthenticationRequest,
    ) -> Result<LoginResult, AuthError> {
        let payload = request.expect_token()?;
        let handle = request.handle();

        let account = self
            .store
            .find_account_by_id(payload.account_id)
            .await?
            .ok_or_else(|| {
                AuthError::NotFound(format!("account {}", payload.account_id))
            })?;

        let key = current_session_key(&account, &payload.token)?;
        let now = now_millis();
        if is_past(key.issued_at, self.config.session_key_ttl(), now) {
            tracing::debug!(%handle, account_id = %account.id, "session key expired");
            return Err(AuthError::Expired("session key".into()));
        }

        // A password change may have revoked the key since it was read.
        if !self
            .store
            .renew_session_key(account.id, &key.token, now)
            .await?
        {
            tracing::debug!(%handle, account_id = %account.id, "session key revoked during refresh");
            return Err(AuthError::InvalidCredential);
        }

        tracing::info!(%handle, account_id = %account.id, "token login succeeded");
        Ok(LoginResult {
            account_id: account.id,
            username: account.username.clone(),
            session_token: key.token.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Session key (combo token)
// ---------------------------------------------------------------------------

/// Combo-token request + decoded data → new combo token for the game
/// server connection.
pub struct SessionKeyAuthenticator<S> {
    store: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S: AccountStore> SessionKeyAuthenticator<S> {
    pub fn new(store: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self { store, config }
    }
}

#[async_trait]
impl<S: AccountStore> Authenticator<ComboTokenResult>
    for SessionKeyAuthenticator<S>
{
    async fn authenticate(
        &self,
        request: AuthenticationRequest,
    ) -> Result<ComboTokenResult, AuthError> {
        let (combo, data) = request.expect_session_key()?;
        let handle = request.handle();
        let now = now_millis();

        if is_past(data.issued_at, self.config.combo_data_max_age(), now) {
            tracing::debug!(%handle, account_id = %data.account_id, "combo data too old");
            return Err(AuthError::Expired("combo token data".into()));
        }
        if data.issued_at > now.saturating_add(duration_millis(MAX_CLOCK_SKEW)) {
            tracing::debug!(%handle, account_id = %data.account_id, "combo data stamped in the future");
            return Err(AuthError::InvalidArgument(
                "combo token data is stamped in the future".into(),
            ));
        }

        let account = self
            .store
            .find_account_by_id(data.account_id)
            .await?
            .ok_or_else(|| {
                AuthError::NotFound(format!("account {}", data.account_id))
            })?;

        let key = current_session_key(&account, &data.token)?;
        if is_past(key.issued_at, self.config.session_key_ttl(), now) {
            return Err(AuthError::Expired("session key".into()));
        }

        let combo_token = generate_token();
        self.store.store_combo_token(account.id, &combo_token).await?;

        tracing::info!(
            %handle,
            account_id = %account.id,
            app_id = combo.app_id,
            channel_id = combo.channel_id,
            "combo token issued"
        );
        Ok(ComboTokenResult {
            account_id: account.id,
            combo_id: self.config.combo_id.clone(),
            combo_token,
            guest: data.guest,
            heartbeat: false,
            account_type: ACCOUNT_TYPE_STANDARD,
        })
    }
}

/// Returns the account's session key if `presented` matches it.
fn current_session_key<'a>(
    account: &'a Account,
    presented: &str,
) -> Result<&'a SessionKey, AuthError> {
    account
        .session_key
        .as_ref()
        .filter(|key| secrets_match(presented, &key.token))
        .ok_or(AuthError::InvalidCredential)
}
