//! Per-connection handler: decode, dispatch, answer.
//!
//! Each accepted peer gets its own Tokio task running this handler, which
//! first finishes the WebSocket upgrade under the handshake timeout. Every
//! inbound frame is an `Envelope<ClientRequest>`; every outbound
//! frame is an `Envelope<ServerResponse>` carrying the same `seq`. A
//! connection that stays silent past the idle timeout is closed.

use std::sync::Arc;

use keyforge_auth::{AuthError, AuthenticationRequest, Authenticator};
use keyforge_protocol::{
    ClientRequest, Codec, CreateAccountRequest, Envelope, RequestHandle,
    ServerResponse,
};
use keyforge_transport::{
    Connection, PendingConnection, PendingWebSocket, WebSocketConnection,
};

use crate::KeyforgeError;
use crate::server::ServerState;

/// Message for every failed login, whether the account is missing or the
/// credential is wrong.
pub(crate) const LOGIN_FAILED: &str = "invalid account or credentials";

/// Completes the upgrade for a freshly accepted peer, then serves it.
///
/// A peer that does not finish the upgrade in time is dropped, which
/// closes its socket.
pub(crate) async fn handle_pending<C: Codec>(
    pending: PendingWebSocket,
    state: Arc<ServerState<C>>,
) -> Result<(), KeyforgeError> {
    let peer = pending.peer_addr();
    let conn = match tokio::time::timeout(state.handshake_timeout, pending.complete())
        .await
    {
        Ok(conn) => conn?,
        Err(_) => {
            tracing::debug!(?peer, "handshake timed out, dropping peer");
            return Ok(());
        }
    };
    handle_connection(conn, state).await
}

/// Handles a single connection from upgrade to close.
async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), KeyforgeError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv())
            .await
        {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, closing");
                let _ = conn.close().await;
                break;
            }
        };

        let envelope: Envelope<ClientRequest> = match state.codec.decode(&data)
        {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode request");
                let response = ServerResponse::Error {
                    code: 400,
                    message: format!("malformed request: {e}"),
                };
                send_response(&conn, &state.codec, 0, response).await?;
                continue;
            }
        };

        let handle = RequestHandle::new(conn_id, envelope.seq, conn.peer_addr());
        tracing::debug!(%handle, kind = envelope.body.kind(), "request received");

        let response = dispatch(&state, handle, envelope.body).await;
        send_response(&conn, &state.codec, envelope.seq, response).await?;
    }

    Ok(())
}

/// Routes one request to the authentication system and turns the outcome
/// into a response.
async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    handle: RequestHandle,
    request: ClientRequest,
) -> ServerResponse {
    let result = match request {
        ClientRequest::PasswordLogin(payload) => {
            let request = AuthenticationRequest::from_password_request(handle, payload);
            run_login(state.password.as_ref(), request)
                .await
                .map(ServerResponse::Login)
        }
        ClientRequest::TokenLogin(payload) => {
            let request = AuthenticationRequest::from_token_request(handle, payload);
            run_login(state.token.as_ref(), request)
                .await
                .map(ServerResponse::Login)
        }
        ClientRequest::ComboToken(payload) => {
            let data = match payload.decode_data() {
                Ok(data) => data,
                Err(e) => {
                    tracing::debug!(%handle, error = %e, "invalid combo token data");
                    return ServerResponse::Error {
                        code: 400,
                        message: format!("invalid combo token data: {e}"),
                    };
                }
            };
            let request =
                AuthenticationRequest::from_combo_token_request(handle, payload, data);
            run_login(state.session_key.as_ref(), request)
                .await
                .map(ServerResponse::ComboToken)
        }
        ClientRequest::CreateAccount(CreateAccountRequest { username, password }) => {
            state
                .system
                .create_account(&username, &password)
                .await
                .map(|account_id| ServerResponse::AccountCreated { account_id })
        }
        ClientRequest::ResetPassword { username } => {
            match state.system.reset_password(&username).await {
                Ok(()) => Ok(ServerResponse::PasswordResetIssued),
                Err(e) if e.is_retryable() => Err(e),
                // Unknown accounts get the same answer as known ones.
                Err(e) => {
                    tracing::debug!(%handle, error = %e, "password reset not issued");
                    Ok(ServerResponse::PasswordResetIssued)
                }
            }
        }
    };

    result.unwrap_or_else(|e| {
        tracing::debug!(%handle, error = %e, "request refused");
        error_response(&e)
    })
}

async fn run_login<T>(
    authenticator: &dyn Authenticator<T>,
    request: Result<AuthenticationRequest, AuthError>,
) -> Result<T, AuthError> {
    authenticator.authenticate(request?).await
}

/// Maps an [`AuthError`] to its wire form.
pub(crate) fn error_response(err: &AuthError) -> ServerResponse {
    let (code, message) = match err {
        AuthError::InvalidArgument(msg) => (400, msg.clone()),
        AuthError::NotFound(_) | AuthError::InvalidCredential => {
            (401, LOGIN_FAILED.to_string())
        }
        AuthError::Expired(_) => (401, "credentials expired".to_string()),
        AuthError::Conflict(msg) => (409, msg.clone()),
        AuthError::Unavailable(reason) => {
            tracing::warn!(%reason, "account store unavailable");
            (503, "service unavailable".to_string())
        }
    };
    ServerResponse::Error { code, message }
}

async fn send_response(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    seq: u64,
    body: ServerResponse,
) -> Result<(), KeyforgeError> {
    let bytes = codec.encode(&Envelope { seq, body })?;
    conn.send(&bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_and_message(response: ServerResponse) -> (u16, String) {
        match response {
            ServerResponse::Error { code, message } => (code, message),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_response_login_failures_are_indistinguishable() {
        let missing = error_response(&AuthError::NotFound("account bob".into()));
        let mismatch = error_response(&AuthError::InvalidCredential);
        assert_eq!(missing, mismatch);
        assert_eq!(code_and_message(missing), (401, LOGIN_FAILED.to_string()));
    }

    #[test]
    fn test_error_response_expired_hides_detail() {
        let (code, message) =
            code_and_message(error_response(&AuthError::Expired("session key".into())));
        assert_eq!(code, 401);
        assert_eq!(message, "credentials expired");
    }

    #[test]
    fn test_error_response_invalid_argument_keeps_text() {
        let (code, message) = code_and_message(error_response(
            &AuthError::InvalidArgument("username is required".into()),
        ));
        assert_eq!(code, 400);
        assert_eq!(message, "username is required");
    }

    #[test]
    fn test_error_response_conflict_is_409() {
        let (code, _) = code_and_message(error_response(&AuthError::Conflict(
            "username alice is taken".into(),
        )));
        assert_eq!(code, 409);
    }

    #[test]
    fn test_error_response_unavailable_hides_reason() {
        let (code, message) = code_and_message(error_response(
            &AuthError::Unavailable("db connection refused".into()),
        ));
        assert_eq!(code, 503);
        assert_eq!(message, "service unavailable");
    }
}
