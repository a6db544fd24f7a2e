//! Wire protocol for Keyforge.
//!
//! - **Types** ([`ClientRequest`], [`ServerResponse`], [`Envelope`] and the
//!   per-flow payloads): what login clients and the server exchange.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (frames) → Protocol (Envelope<ClientRequest>) → Auth (AuthenticationRequest)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AccountId, ClientRequest, ComboTokenData, ComboTokenRequest,
    ComboTokenResult, CreateAccountRequest, Envelope, LoginResult,
    PasswordLoginRequest, RequestHandle, ServerResponse, TokenLoginRequest,
};
