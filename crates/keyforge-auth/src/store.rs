//! The persistence collaborator behind the authentication system.
//!
//! Keyforge does not own a database. Everything it remembers (accounts,
//! session keys, verification tokens) goes through an [`AccountStore`].
//! [`MemoryAccountStore`](crate::MemoryAccountStore) is the reference
//! implementation; production deployments plug in their own.

use std::fmt;

use async_trait::async_trait;
use keyforge_protocol::AccountId;

use crate::AuthError;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A session key and when it was issued (or last refreshed), in unix
/// milliseconds.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub token: String,
    pub issued_at: u64,
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// A stored account.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    /// The client-side hash exactly as received. Never the plaintext.
    pub password_hash: String,
    /// Current session key, if the account has logged in.
    pub session_key: Option<SessionKey>,
    /// Last combo token handed out by the session-key flow.
    ///
    /// Keyforge only issues and revokes it. The downstream game server
    /// reads it from the shared store to admit the client, so it must be
    /// cleared whenever the session key is.
    pub combo_token: Option<String>,
    /// Creation time in unix milliseconds.
    pub created_at: u64,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("session_key", &self.session_key)
            .field("combo_token", &self.combo_token.as_ref().map(|_| "<redacted>"))
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// What a verification token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenPurpose {
    /// Confirms identity before a password change.
    PasswordReset,
    /// Generic out-of-band identity confirmation requested by an extension.
    IdentityCheck,
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PasswordReset => write!(f, "password_reset"),
            Self::IdentityCheck => write!(f, "identity_check"),
        }
    }
}

/// Lifecycle of a verification token.
///
/// ```text
///            ┌──(complete_password_reset)──→ Verified
///            │
///   Issued ──┼──(verify_user)──────────────→ Consumed
///            │
///            └──(expires_at reached)───────→ Expired
/// ```
///
/// Every state except `Issued` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenState {
    Issued,
    Verified,
    Consumed,
    Expired,
}

impl TokenState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Issued)
    }
}

/// A stored verification token.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub token: String,
    pub purpose: TokenPurpose,
    pub account_id: AccountId,
    /// Unix milliseconds after which the token can no longer be redeemed.
    pub expires_at: u64,
    pub state: TokenState,
}

impl TokenRecord {
    /// `true` if the token is still `Issued` and `now` is before
    /// `expires_at`.
    pub fn is_redeemable(&self, now: u64) -> bool {
        self.state == TokenState::Issued && now < self.expires_at
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("token", &"<redacted>")
            .field("purpose", &self.purpose)
            .field("account_id", &self.account_id)
            .field("expires_at", &self.expires_at)
            .field("state", &self.state)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AccountStore
// ---------------------------------------------------------------------------

/// Storage for accounts and verification tokens.
///
/// Every method may block on I/O. Transient failures are reported as
/// [`AuthError::Unavailable`]. Implementations must be safe to call from
/// many tasks at once; the store may also be shared by several server
/// processes.
#[async_trait]
pub trait AccountStore: Send + Sync + 'static {
    /// Looks an account up by username.
    async fn find_account(
        &self,
        username: &str,
    ) -> Result<Option<Account>, AuthError>;

    /// Looks an account up by id.
    async fn find_account_by_id(
        &self,
        id: AccountId,
    ) -> Result<Option<Account>, AuthError>;

    /// Creates an account and assigns its id.
    ///
    /// # Errors
    /// [`AuthError::Conflict`] if the username is taken.
    async fn create_account(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Account, AuthError>;

    /// Replaces the password hash and revokes the current session key and
    /// combo token.
    ///
    /// # Errors
    /// [`AuthError::NotFound`] if the account does not exist.
    async fn update_password(
        &self,
        id: AccountId,
        password_hash: &str,
    ) -> Result<(), AuthError>;

    /// Stores (or replaces) the account's session key.
    async fn store_session_key(
        &self,
        id: AccountId,
        key: SessionKey,
    ) -> Result<(), AuthError>;

    /// Moves the session key's `issued_at` forward, but only if the stored
    /// key is still `expected_token`.
    ///
    /// Returns `false` when the key was revoked or rotated since the caller
    /// read it. The comparison and the write must be one step, so a refresh
    /// can never resurrect a key a password change just cleared.
    ///
    /// # Errors
    /// [`AuthError::NotFound`] if the account does not exist.
    async fn renew_session_key(
        &self,
        id: AccountId,
        expected_token: &str,
        issued_at: u64,
    ) -> Result<bool, AuthError>;

    /// Stores (or replaces) the account's combo token.
    async fn store_combo_token(
        &self,
        id: AccountId,
        token: &str,
    ) -> Result<(), AuthError>;

    /// Issues a fresh, unique verification token in state `Issued`.
    async fn issue_token(
        &self,
        purpose: TokenPurpose,
        account_id: AccountId,
        expires_at: u64,
    ) -> Result<String, AuthError>;

    /// Looks a verification token up.
    async fn find_token(
        &self,
        token: &str,
    ) -> Result<Option<TokenRecord>, AuthError>;

    /// Atomically moves a token from `Issued` to the terminal `outcome`.
    ///
    /// Returns `true` only for the single caller that performed the
    /// transition. Returns `false` for unknown tokens, tokens already in a
    /// terminal state, and tokens past `expires_at` (which the store moves
    /// to `Expired` instead). The check and the transition must be one
    /// linearizable step across every process sharing the store, e.g. a
    /// conditional `UPDATE ... WHERE state = 'issued'`.
    async fn invalidate_token_atomically(
        &self,
        token: &str,
        outcome: TokenState,
        now: u64,
    ) -> Result<bool, AuthError>;
}
