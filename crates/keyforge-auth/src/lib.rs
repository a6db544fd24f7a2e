//! Pluggable authentication for Keyforge.
//!
//! Everything between a decoded login request and a verified identity
//! lives here:
//!
//! - [`AuthenticationRequest`]: one normalized request per login flow
//! - [`Authenticator`]: the strategy trait each flow is verified through
//! - [`AuthenticationSystem`]: account lifecycle plus the three
//!   authenticators, replaceable through [`AuthSystemRegistry`]
//! - [`AccountStore`]: the persistence collaborator, with
//!   [`MemoryAccountStore`] as the reference implementation
//!
//! # How it fits in the stack
//!
//! ```text
//! keyforge server (above)  ← decodes frames, dispatches to authenticators
//!     ↕
//! Auth Layer (this crate)  ← verifies credentials, manages accounts/tokens
//!     ↕
//! AccountStore (below)     ← memory, or a database an extension provides
//! ```

mod authenticator;
pub mod builtin;
mod config;
mod default_system;
mod error;
mod memory;
mod registry;
mod request;
mod store;
mod system;
pub mod token;

pub use authenticator::Authenticator;
pub use builtin::{PasswordAuthenticator, SessionKeyAuthenticator, TokenAuthenticator};
pub use config::AuthConfig;
pub use default_system::DefaultAuthenticationSystem;
pub use error::AuthError;
pub use memory::MemoryAccountStore;
pub use registry::{AuthSystemRegistry, DEFAULT_SYSTEM_NAME};
pub use request::{AuthFlow, AuthenticationPayload, AuthenticationRequest};
pub use store::{
    Account, AccountStore, SessionKey, TokenPurpose, TokenRecord, TokenState,
};
pub use system::{AuthenticationSystem, DiscardDelivery, TokenDelivery};
