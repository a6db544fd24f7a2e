//! In-memory [`AccountStore`].
//!
//! Keeps accounts, a username index, and verification tokens in plain
//! `HashMap`s behind one `tokio::sync::Mutex`. Each trait method takes the
//! lock once, so every check-and-update (username uniqueness, token
//! transitions) is atomic for all tasks sharing the store. It does not
//! survive a restart and cannot be shared between processes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use keyforge_protocol::AccountId;
use tokio::sync::Mutex;

use crate::store::{
    Account, AccountStore, SessionKey, TokenPurpose, TokenRecord, TokenState,
};
use crate::token::{generate_token, now_millis, secrets_match};
use crate::AuthError;

#[derive(Default)]
struct Inner {
    accounts: HashMap<AccountId, Account>,
    /// Username → id. Kept in sync with `accounts`.
    usernames: HashMap<String, AccountId>,
    tokens: HashMap<String, TokenRecord>,
    next_id: u64,
}

impl Inner {
    fn account_mut(&mut self, id: AccountId) -> Result<&mut Account, AuthError> {
        self.accounts
            .get_mut(&id)
            .ok_or_else(|| AuthError::NotFound(format!("account {id}")))
    }
}

/// Process-local account and token store.
///
/// ## Token lifecycle
///
/// ```text
/// issue_token() ──→ [Issued] ──invalidate_token_atomically()──→ [Verified | Consumed]
///                      │
///                      ▼ expires_at reached (on access or expire_stale())
///                  [Expired]
///
/// terminal tokens ──cleanup_expired()──→ removed
/// ```
#[derive(Default)]
pub struct MemoryAccountStore {
    inner: Mutex<Inner>,
    offline: AtomicBool,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: while set, every [`AccountStore`] method answers
    /// [`AuthError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), AuthError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }

    /// Marks every `Issued` token whose `expires_at` has passed as
    /// `Expired`.
    ///
    /// Returns the account and purpose of each token that expired, so
    /// callers can react (e.g. tell the user the reset link lapsed).
    pub async fn expire_stale(&self, now: u64) -> Vec<(AccountId, TokenPurpose)> {
        let mut inner = self.inner.lock().await;
        let mut expired = Vec::new();

        for record in inner.tokens.values_mut() {
            if record.state == TokenState::Issued && now >= record.expires_at {
                record.state = TokenState::Expired;
                expired.push((record.account_id, record.purpose));
                tracing::debug!(
                    account_id = %record.account_id,
                    purpose = %record.purpose,
                    "verification token expired"
                );
            }
        }

        expired
    }

    /// Removes every token in a terminal state.
    ///
    /// Separate from [`expire_stale`](Self::expire_stale) so callers can
    /// inspect expirations before the records are gone.
    pub async fn cleanup_expired(&self) {
        self.inner
            .lock()
            .await
            .tokens
            .retain(|_, record| !record.state.is_terminal());
    }

    pub async fn account_count(&self) -> usize {
        self.inner.lock().await.accounts.len()
    }

    /// Number of stored tokens in any state.
    pub async fn token_count(&self) -> usize {
        self.inner.lock().await.tokens.len()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_account(
        &self,
        username: &str,
    ) -> Result<Option<Account>, AuthError> {
        self.check_online()?;
        let inner = self.inner.lock().await;
        Ok(inner
            .usernames
            .get(username)
            .and_then(|id| inner.accounts.get(id))
            .cloned())
    }

    async fn find_account_by_id(
        &self,
        id: AccountId,
    ) -> Result<Option<Account>, AuthError> {
        self.check_online()?;
        Ok(self.inner.lock().await.accounts.get(&id).cloned())
    }

    async fn create_account(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Account, AuthError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;

        if inner.usernames.contains_key(username) {
            return Err(AuthError::Conflict(format!(
                "username {username} is taken"
            )));
        }

        inner.next_id += 1;
        let account = Account {
            id: AccountId(inner.next_id),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            session_key: None,
            combo_token: None,
            created_at: now_millis(),
        };

        inner.usernames.insert(account.username.clone(), account.id);
        inner.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update_password(
        &self,
        id: AccountId,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;
        let account = inner.account_mut(id)?;
        account.password_hash = password_hash.to_string();
        account.session_key = None;
        account.combo_token = None;
        Ok(())
    }

    async fn store_session_key(
        &self,
        id: AccountId,
        key: SessionKey,
    ) -> Result<(), AuthError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;
        inner.account_mut(id)?.session_key = Some(key);
        Ok(())
    }

    async fn renew_session_key(
        &self,
        id: AccountId,
        expected_token: &str,
        issued_at: u64,
    ) -> Result<bool, AuthError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;
        match inner.account_mut(id)?.session_key.as_mut() {
            Some(key) if secrets_match(expected_token, &key.token) => {
                key.issued_at = issued_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn store_combo_token(
        &self,
        id: AccountId,
        token: &str,
    ) -> Result<(), AuthError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;
        inner.account_mut(id)?.combo_token = Some(token.to_string());
        Ok(())
    }

    async fn issue_token(
        &self,
        purpose: TokenPurpose,
        account_id: AccountId,
        expires_at: u64,
    ) -> Result<String, AuthError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;

        if !inner.accounts.contains_key(&account_id) {
            return Err(AuthError::NotFound(format!("account {account_id}")));
        }

        let mut token = generate_token();
        while inner.tokens.contains_key(&token) {
            token = generate_token();
        }

        inner.tokens.insert(
            token.clone(),
            TokenRecord {
                token: token.clone(),
                purpose,
                account_id,
                expires_at,
                state: TokenState::Issued,
            },
        );
        Ok(token)
    }

    async fn find_token(
        &self,
        token: &str,
    ) -> Result<Option<TokenRecord>, AuthError> {
        self.check_online()?;
        Ok(self.inner.lock().await.tokens.get(token).cloned())
    }

    async fn invalidate_token_atomically(
        &self,
        token: &str,
        outcome: TokenState,
        now: u64,
    ) -> Result<bool, AuthError> {
        self.check_online()?;
        if !matches!(outcome, TokenState::Verified | TokenState::Consumed) {
            return Err(AuthError::InvalidArgument(format!(
                "{outcome:?} is not a redemption outcome"
            )));
        }

        let mut inner = self.inner.lock().await;
        let Some(record) = inner.tokens.get_mut(token) else {
            return Ok(false);
        };

        if record.state != TokenState::Issued {
            return Ok(false);
        }
        if now >= record.expires_at {
            record.state = TokenState::Expired;
            return Ok(false);
        }

        record.state = outcome;
        Ok(true)
    }
}
