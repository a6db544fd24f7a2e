//! Startup-time selection of the active [`AuthenticationSystem`].

use std::sync::Arc;

use crate::AuthenticationSystem;

/// Name the registry gives the system it was created with.
pub const DEFAULT_SYSTEM_NAME: &str = "default";

/// Holds the one authentication system a server will use.
///
/// Created with the default system; an extension may [`replace`] it while
/// the server is being assembled. The server reads [`active`] once when it
/// is built, so replacing afterwards has no effect on a running server.
///
/// [`replace`]: Self::replace
/// [`active`]: Self::active
pub struct AuthSystemRegistry {
    name: String,
    system: Arc<dyn AuthenticationSystem>,
}

impl AuthSystemRegistry {
    pub fn new(default: Arc<dyn AuthenticationSystem>) -> Self {
        Self {
            name: DEFAULT_SYSTEM_NAME.to_string(),
            system: default,
        }
    }

    /// Installs `system` in place of the current one.
    pub fn replace(
        &mut self,
        name: impl Into<String>,
        system: Arc<dyn AuthenticationSystem>,
    ) {
        let name = name.into();
        tracing::info!(previous = %self.name, replacement = %name, "authentication system replaced");
        self.name = name;
        self.system = system;
    }

    pub fn active(&self) -> Arc<dyn AuthenticationSystem> {
        Arc::clone(&self.system)
    }

    pub fn active_name(&self) -> &str {
        &self.name
    }
}
