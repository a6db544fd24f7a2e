//! Wire types for the Keyforge login protocol.
//!
//! Three request payload shapes reach the login boundary, one per flow:
//!
//! - [`PasswordLoginRequest`]: username plus pre-hashed password
//! - [`TokenLoginRequest`]: account id plus the session key from an
//!   earlier password login
//! - [`ComboTokenRequest`]: game-client session request whose `data`
//!   field is itself JSON, decoded into [`ComboTokenData`]
//!
//! The server answers with a [`LoginResult`] or a [`ComboTokenResult`].
//! Credentials never appear in `Debug` output.

use std::fmt;
use std::net::SocketAddr;

use keyforge_transport::ConnectionId;
use serde::{Deserialize, Serialize};

const REDACTED: &str = "<redacted>";

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique account identifier, assigned by the account store.
///
/// Serialized as a plain number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A-{}", self.0)
    }
}

/// Opaque handle to the transport request a login payload arrived on.
///
/// Only used to correlate the answer with its connection and to tag log
/// lines. Authenticators pass it through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHandle {
    /// Connection the request arrived on.
    pub connection: ConnectionId,
    /// Client-chosen sequence number, echoed in the response.
    pub seq: u64,
    /// Remote address, when the transport knows it.
    pub peer: Option<SocketAddr>,
}

impl RequestHandle {
    pub fn new(
        connection: ConnectionId,
        seq: u64,
        peer: Option<SocketAddr>,
    ) -> Self {
        Self {
            connection,
            seq,
            peer,
        }
    }
}

impl fmt::Display for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.connection, self.seq)
    }
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Password login payload.
///
/// `password` is already hashed by the client; the server never sees the
/// plaintext.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordLoginRequest {
    pub username: String,
    pub password: String,
    /// Whether the client additionally encrypted the hash in transit.
    #[serde(default)]
    pub is_crypto: bool,
}

impl fmt::Debug for PasswordLoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordLoginRequest")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("is_crypto", &self.is_crypto)
            .finish()
    }
}

/// Token (refresh) login payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLoginRequest {
    pub account_id: AccountId,
    /// Session key returned by an earlier password login.
    pub token: String,
}

impl fmt::Debug for TokenLoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenLoginRequest")
            .field("account_id", &self.account_id)
            .field("token", &REDACTED)
            .finish()
    }
}

/// Combo-token (session key) request as sent by the game client.
///
/// `data` carries a JSON document that decodes into [`ComboTokenData`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboTokenRequest {
    pub app_id: u32,
    pub channel_id: u32,
    pub data: String,
    pub device: String,
    #[serde(default)]
    pub sign: String,
}

/// The decoded `data` field of a [`ComboTokenRequest`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboTokenData {
    pub account_id: AccountId,
    /// Session key the client holds for this account.
    pub token: String,
    /// When the client obtained `token`, in unix milliseconds.
    pub issued_at: u64,
    #[serde(default)]
    pub guest: bool,
}

impl fmt::Debug for ComboTokenData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComboTokenData")
            .field("account_id", &self.account_id)
            .field("token", &REDACTED)
            .field("issued_at", &self.issued_at)
            .field("guest", &self.guest)
            .finish()
    }
}

/// Account registration payload. `password` is pre-hashed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for CreateAccountRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateAccountRequest")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Successful password or token login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResult {
    pub account_id: AccountId,
    pub username: String,
    /// Session key to present on the token and combo-token flows.
    pub session_token: String,
}

impl fmt::Debug for LoginResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResult")
            .field("account_id", &self.account_id)
            .field("username", &self.username)
            .field("session_token", &REDACTED)
            .finish()
    }
}

/// Successful combo-token exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboTokenResult {
    pub account_id: AccountId,
    pub combo_id: String,
    /// Fresh session-key material for the game server connection.
    pub combo_token: String,
    pub guest: bool,
    pub heartbeat: bool,
    pub account_type: u32,
}

impl fmt::Debug for ComboTokenResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComboTokenResult")
            .field("account_id", &self.account_id)
            .field("combo_id", &self.combo_id)
            .field("combo_token", &REDACTED)
            .field("guest", &self.guest)
            .field("heartbeat", &self.heartbeat)
            .field("account_type", &self.account_type)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Everything a login client can ask for.
///
/// Internally tagged: `{ "type": "PasswordLogin", "username": ..., ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    PasswordLogin(PasswordLoginRequest),
    TokenLogin(TokenLoginRequest),
    ComboToken(ComboTokenRequest),
    CreateAccount(CreateAccountRequest),
    ResetPassword { username: String },
}

impl ClientRequest {
    /// Short name of the request kind, for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PasswordLogin(_) => "password_login",
            Self::TokenLogin(_) => "token_login",
            Self::ComboToken(_) => "combo_token",
            Self::CreateAccount(_) => "create_account",
            Self::ResetPassword { .. } => "reset_password",
        }
    }
}

/// Everything the server answers with.
///
/// `code` on [`ServerResponse::Error`] follows HTTP conventions
/// (400 bad request, 401 unauthorized, 409 conflict, 503 unavailable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerResponse {
    Login(LoginResult),
    ComboToken(ComboTokenResult),
    AccountCreated { account_id: AccountId },
    PasswordResetIssued,
    Error { code: u16, message: String },
}

/// One frame on the wire. The server echoes the request's `seq` in its
/// response so clients can pipeline requests on a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub seq: u64,
    pub body: T,
}
