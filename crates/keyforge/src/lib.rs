//! # Keyforge
//!
//! Pluggable login and account boundary for game servers.
//!
//! Keyforge accepts login clients over WebSocket, decodes their requests,
//! and hands them to an [`AuthenticationSystem`](keyforge_auth::AuthenticationSystem).
//! The built-in system covers password login, session-key refresh, combo
//! tokens for the game server, account creation and password resets. An
//! extension replaces it wholesale before the server starts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keyforge::prelude::*;
//!
//! # async fn start() -> Result<(), KeyforgeError> {
//! let server = KeyforgeServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::KeyforgeError;
pub use server::{CUSTOM_SYSTEM_NAME, KeyforgeServer, KeyforgeServerBuilder, ServerConfig};

pub use keyforge_auth as auth;
pub use keyforge_protocol as protocol;
pub use keyforge_transport as transport;

pub mod prelude {
    pub use crate::{KeyforgeError, KeyforgeServer, KeyforgeServerBuilder, ServerConfig};
    pub use keyforge_auth::{
        Account, AccountStore, AuthConfig, AuthError, AuthSystemRegistry,
        AuthenticationRequest, AuthenticationSystem, Authenticator,
        DefaultAuthenticationSystem, MemoryAccountStore, TokenDelivery,
        TokenPurpose,
    };
    pub use keyforge_protocol::{
        AccountId, ClientRequest, ComboTokenData, ComboTokenRequest,
        ComboTokenResult, Envelope, LoginResult, PasswordLoginRequest,
        ServerResponse, TokenLoginRequest,
    };
}
