//! The normalized authentication request.
//!
//! Three wire payloads reach the boundary, one per login flow.
//! [`AuthenticationRequest`] wraps an [`AuthenticationPayload`] enum, so a
//! request is always exactly one flow. The per-flow constructors are the
//! only way to build one and they reject absent payloads up front.

use std::fmt;

use keyforge_protocol::{
    ComboTokenData, ComboTokenRequest, PasswordLoginRequest, RequestHandle,
    TokenLoginRequest,
};

use crate::AuthError;

/// Which login flow produced a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthFlow {
    Password,
    Token,
    SessionKey,
}

impl fmt::Display for AuthFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password => write!(f, "password"),
            Self::Token => write!(f, "token"),
            Self::SessionKey => write!(f, "session_key"),
        }
    }
}

/// The flow-specific part of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationPayload {
    Password(PasswordLoginRequest),
    Token(TokenLoginRequest),
    /// The combo-token request and its decoded data always travel together.
    SessionKey {
        request: ComboTokenRequest,
        data: ComboTokenData,
    },
}

/// One login-related request, normalized for the authenticators.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationRequest {
    handle: RequestHandle,
    payload: AuthenticationPayload,
}

impl AuthenticationRequest {
    /// Builds a password-flow request.
    ///
    /// # Errors
    /// [`AuthError::InvalidArgument`] if the username or password hash is
    /// empty.
    pub fn from_password_request(
        handle: RequestHandle,
        payload: PasswordLoginRequest,
    ) -> Result<Self, AuthError> {
        require("username", &payload.username)?;
        require("password", &payload.password)?;
        Ok(Self {
            handle,
            payload: AuthenticationPayload::Password(payload),
        })
    }

    /// Builds a token-flow request.
    ///
    /// # Errors
    /// [`AuthError::InvalidArgument`] if the token is empty.
    pub fn from_token_request(
        handle: RequestHandle,
        payload: TokenLoginRequest,
    ) -> Result<Self, AuthError> {
        require("token", &payload.token)?;
        Ok(Self {
            handle,
            payload: AuthenticationPayload::Token(payload),
        })
    }

    /// Builds a session-key request from the combo-token request and its
    /// decoded data.
    ///
    /// # Errors
    /// [`AuthError::InvalidArgument`] if the request carries no data or the
    /// decoded data carries no token.
    pub fn from_combo_token_request(
        handle: RequestHandle,
        request: ComboTokenRequest,
        data: ComboTokenData,
    ) -> Result<Self, AuthError> {
        require("data", &request.data)?;
        require("data.token", &data.token)?;
        Ok(Self {
            handle,
            payload: AuthenticationPayload::SessionKey { request, data },
        })
    }

    /// The transport request this came from.
    pub fn handle(&self) -> &RequestHandle {
        &self.handle
    }

    pub fn flow(&self) -> AuthFlow {
        match &self.payload {
            AuthenticationPayload::Password(_) => AuthFlow::Password,
            AuthenticationPayload::Token(_) => AuthFlow::Token,
            AuthenticationPayload::SessionKey { .. } => AuthFlow::SessionKey,
        }
    }

    pub fn payload(&self) -> &AuthenticationPayload {
        &self.payload
    }

    /// The password payload, or `None` for other flows.
    pub fn password_payload(&self) -> Option<&PasswordLoginRequest> {
        match &self.payload {
            AuthenticationPayload::Password(p) => Some(p),
            _ => None,
        }
    }

    /// The token payload, or `None` for other flows.
    pub fn token_payload(&self) -> Option<&TokenLoginRequest> {
        match &self.payload {
            AuthenticationPayload::Token(p) => Some(p),
            _ => None,
        }
    }

    /// The combo-token request and its data, or `None` for other flows.
    pub fn session_key_payload(
        &self,
    ) -> Option<(&ComboTokenRequest, &ComboTokenData)> {
        match &self.payload {
            AuthenticationPayload::SessionKey { request, data } => {
                Some((request, data))
            }
            _ => None,
        }
    }

    /// Like [`password_payload`](Self::password_payload) but fails for a
    /// request of another flow. Used by authenticators.
    pub(crate) fn expect_password(
        &self,
    ) -> Result<&PasswordLoginRequest, AuthError> {
        self.password_payload()
            .ok_or_else(|| self.wrong_flow(AuthFlow::Password))
    }

    pub(crate) fn expect_token(&self) -> Result<&TokenLoginRequest, AuthError> {
        self.token_payload()
            .ok_or_else(|| self.wrong_flow(AuthFlow::Token))
    }

    pub(crate) fn expect_session_key(
        &self,
    ) -> Result<(&ComboTokenRequest, &ComboTokenData), AuthError> {
        self.session_key_payload()
            .ok_or_else(|| self.wrong_flow(AuthFlow::SessionKey))
    }

    fn wrong_flow(&self, expected: AuthFlow) -> AuthError {
        AuthError::InvalidArgument(format!(
            "expected a {expected} request, got a {} request",
            self.flow()
        ))
    }
}

fn require(field: &str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::InvalidArgument(format!("{field} is required")));
    }
    Ok(())
}
