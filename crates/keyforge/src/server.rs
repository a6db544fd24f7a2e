//! `KeyforgeServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → auth. The accept loop
//! only takes TCP peers off the listener; each peer's WebSocket upgrade and
//! every request after it run on that peer's own task. The active
//! authentication system is resolved once in
//! [`KeyforgeServerBuilder::build`] and its three authenticators are cached
//! for the lifetime of the server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use keyforge_auth::token::duration_millis;
use keyforge_auth::{
    AuthConfig, AuthSystemRegistry, AuthenticationSystem, Authenticator,
    DefaultAuthenticationSystem, MemoryAccountStore,
};
use keyforge_protocol::{Codec, ComboTokenResult, JsonCodec, LoginResult};
use keyforge_transport::{DEFAULT_MAX_FRAME_BYTES, Transport, WebSocketTransport};
use serde::{Deserialize, Serialize};

use crate::KeyforgeError;
use crate::handler::handle_pending;

/// Name under which [`KeyforgeServerBuilder::auth_system`] registers a
/// replacement system.
pub const CUSTOM_SYSTEM_NAME: &str = "custom";

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on. Port 0 picks a free port.
    pub bind_addr: String,
    /// A connection that sends nothing for this many milliseconds is
    /// closed.
    pub idle_timeout_ms: u64,
    /// A peer that has not finished the WebSocket upgrade within this many
    /// milliseconds of its TCP accept is dropped.
    pub handshake_timeout_ms: u64,
    /// Largest inbound frame accepted.
    pub max_frame_bytes: usize,
}

impl ServerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            idle_timeout_ms: 30_000,
            handshake_timeout_ms: 5_000,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) system: Arc<dyn AuthenticationSystem>,
    pub(crate) password: Arc<dyn Authenticator<LoginResult>>,
    pub(crate) token: Arc<dyn Authenticator<LoginResult>>,
    pub(crate) session_key: Arc<dyn Authenticator<ComboTokenResult>>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
    pub(crate) handshake_timeout: Duration,
}

/// Builder for configuring and starting a Keyforge server.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use keyforge::prelude::*;
///
/// # async fn start() -> Result<(), KeyforgeError> {
/// let server = KeyforgeServer::builder()
///     .bind("0.0.0.0:8080")
///     .idle_timeout(Duration::from_secs(60))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct KeyforgeServerBuilder<C = JsonCodec> {
    config: ServerConfig,
    registry: AuthSystemRegistry,
    codec: C,
}

impl KeyforgeServerBuilder<JsonCodec> {
    /// Creates a builder with default settings: JSON frames, and a
    /// [`DefaultAuthenticationSystem`] over a fresh [`MemoryAccountStore`].
    pub fn new() -> Self {
        let default = DefaultAuthenticationSystem::new(
            Arc::new(MemoryAccountStore::new()),
            AuthConfig::default(),
        );
        Self {
            config: ServerConfig::default(),
            registry: AuthSystemRegistry::new(Arc::new(default)),
            codec: JsonCodec,
        }
    }
}

impl Default for KeyforgeServerBuilder<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> KeyforgeServerBuilder<C> {
    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout_ms = duration_millis(timeout);
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout_ms = duration_millis(timeout);
        self
    }

    pub fn max_frame_bytes(mut self, limit: usize) -> Self {
        self.config.max_frame_bytes = limit;
        self
    }

    /// Replaces all listener settings at once.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the authentication system.
    pub fn auth_system(mut self, system: Arc<dyn AuthenticationSystem>) -> Self {
        self.registry.replace(CUSTOM_SYSTEM_NAME, system);
        self
    }

    /// Uses a registry an extension has already prepared.
    pub fn registry(mut self, registry: AuthSystemRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Swaps the frame codec.
    pub fn codec<D: Codec>(self, codec: D) -> KeyforgeServerBuilder<D> {
        KeyforgeServerBuilder {
            config: self.config,
            registry: self.registry,
            codec,
        }
    }

    /// Binds the listener and resolves the active authentication system.
    pub async fn build(self) -> Result<KeyforgeServer<C>, KeyforgeError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr)
            .await?
            .with_max_frame_bytes(self.config.max_frame_bytes);

        let system = self.registry.active();
        tracing::info!(
            system = self.registry.active_name(),
            "authentication system resolved"
        );

        let state = Arc::new(ServerState {
            password: system.password_authenticator(),
            token: system.token_authenticator(),
            session_key: system.session_key_authenticator(),
            system,
            codec: self.codec,
            idle_timeout: self.config.idle_timeout(),
            handshake_timeout: self.config.handshake_timeout(),
        });

        Ok(KeyforgeServer { transport, state })
    }
}

/// A bound Keyforge server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct KeyforgeServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl KeyforgeServer<JsonCodec> {
    pub fn builder() -> KeyforgeServerBuilder<JsonCodec> {
        KeyforgeServerBuilder::new()
    }
}

impl<C: Codec> KeyforgeServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The authentication system this server dispatches to.
    pub fn auth_system(&self) -> Arc<dyn AuthenticationSystem> {
        Arc::clone(&self.state.system)
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), KeyforgeError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Connections already being served keep running on their own tasks
    /// until they close or go idle.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), KeyforgeError> {
        tracing::info!("Keyforge server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Keyforge server shutting down");
                    return Ok(());
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_pending(pending, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.idle_timeout(), Duration::from_secs(30));
        assert_eq!(config.handshake_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_frame_bytes, DEFAULT_MAX_FRAME_BYTES);
    }

    #[test]
    fn test_builder_timeouts_saturate_instead_of_truncating() {
        let builder = KeyforgeServerBuilder::new()
            .idle_timeout(Duration::MAX)
            .handshake_timeout(Duration::from_millis(250));
        assert_eq!(builder.config.idle_timeout_ms, u64::MAX);
        assert_eq!(builder.config.handshake_timeout_ms, 250);
    }

    #[test]
    fn test_builder_auth_system_registers_custom() {
        let replacement: Arc<dyn AuthenticationSystem> =
            Arc::new(DefaultAuthenticationSystem::new(
                Arc::new(MemoryAccountStore::new()),
                AuthConfig::default(),
            ));
        let builder = KeyforgeServerBuilder::new().auth_system(Arc::clone(&replacement));
        assert_eq!(builder.registry.active_name(), CUSTOM_SYSTEM_NAME);
        assert!(Arc::ptr_eq(&builder.registry.active(), &replacement));
    }

    #[tokio::test]
    async fn test_build_caches_authenticators_of_active_system() {
        let server = KeyforgeServerBuilder::new()
            .bind("127.0.0.1:0")
            .build()
            .await
            .unwrap();
        let system = server.auth_system();
        assert!(Arc::ptr_eq(
            &server.state.password,
            &system.password_authenticator()
        ));
        assert!(Arc::ptr_eq(
            &server.state.session_key,
            &system.session_key_authenticator()
        ));
        assert!(server.local_addr().unwrap().port() != 0);
    }

    #[tokio::test]
    async fn test_run_until_returns_on_shutdown() {
        let server = KeyforgeServerBuilder::new()
            .bind("127.0.0.1:0")
            .build()
            .await
            .unwrap();
        let result = server.run_until(async {}).await;
        assert!(result.is_ok());
    }
}
