//! A standalone login server with one seeded account.
//!
//! ```text
//! RUST_LOG=keyforge=debug KEYFORGE_BIND=0.0.0.0:8080 cargo run -p login-server
//! ```
//!
//! Clients hash the password before it leaves the device; the server only
//! ever sees and stores that hash. [`client_hash`] is the scheme the demo
//! client uses.

use std::sync::Arc;

use keyforge::prelude::*;
use sha2::{Digest, Sha256};
use tracing_subscriber::EnvFilter;

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEMO_USERNAME: &str = "demo";
const DEMO_PASSWORD: &str = "demo";

/// Hex-encoded SHA-256 of the password, as a game client sends it.
fn client_hash(password: &str) -> String {
    Sha256::digest(password.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Builds the authentication system and registers the demo account.
async fn demo_system() -> Result<Arc<DefaultAuthenticationSystem<MemoryAccountStore>>, AuthError>
{
    let config = AuthConfig {
        auto_create_accounts: true,
        ..AuthConfig::default()
    };
    let system = Arc::new(DefaultAuthenticationSystem::new(
        Arc::new(MemoryAccountStore::new()),
        config,
    ));
    let account_id = system
        .create_account(DEMO_USERNAME, &client_hash(DEMO_PASSWORD))
        .await?;
    tracing::info!(%account_id, username = DEMO_USERNAME, "demo account ready");
    Ok(system)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind = std::env::var("KEYFORGE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());

    let server = KeyforgeServerBuilder::new()
        .bind(&bind)
        .auth_system(demo_system().await?)
        .build()
        .await?;
    tracing::info!(addr = %server.local_addr()?, "login server listening");

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::Message;

    type Ws = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn start() -> String {
        let server = KeyforgeServerBuilder::new()
            .bind("127.0.0.1:0")
            .auth_system(demo_system().await.unwrap())
            .build()
            .await
            .unwrap();
        let addr = server.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        addr
    }

    async fn ws(addr: &str) -> Ws {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        ws
    }

    async fn call(ws: &mut Ws, seq: u64, body: ClientRequest) -> ServerResponse {
        let env = Envelope { seq, body };
        ws.send(Message::Binary(serde_json::to_vec(&env).unwrap().into()))
            .await
            .unwrap();
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout")
            .unwrap()
            .unwrap();
        let reply: Envelope<ServerResponse> =
            serde_json::from_slice(&msg.into_data()).unwrap();
        assert_eq!(reply.seq, seq);
        reply.body
    }

    fn login(username: &str, password: &str) -> ClientRequest {
        ClientRequest::PasswordLogin(PasswordLoginRequest {
            username: username.into(),
            password: client_hash(password),
            is_crypto: false,
        })
    }

    #[test]
    fn test_client_hash_is_sha256_hex() {
        assert_eq!(
            client_hash("demo"),
            "2a97516c354b68848cdbd8f54a226a0a55b21ed138e207ad6c5cbb9c00aa5aea"
        );
        assert_ne!(client_hash("demo"), client_hash("Demo"));
    }

    #[tokio::test]
    async fn test_demo_account_logs_in() {
        let addr = start().await;
        let mut c = ws(&addr).await;

        match call(&mut c, 1, login(DEMO_USERNAME, DEMO_PASSWORD)).await {
            ServerResponse::Login(result) => {
                assert_eq!(result.username, DEMO_USERNAME);
                assert_eq!(result.session_token.len(), 32);
            }
            other => panic!("expected Login, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let addr = start().await;
        let mut c = ws(&addr).await;

        let reply = call(&mut c, 1, login(DEMO_USERNAME, "hunter2")).await;
        assert!(matches!(reply, ServerResponse::Error { code: 401, .. }));
    }

    #[tokio::test]
    async fn test_first_login_creates_account() {
        let addr = start().await;
        let mut c = ws(&addr).await;

        let first = call(&mut c, 1, login("newcomer", "pw")).await;
        assert!(matches!(first, ServerResponse::Login(_)));

        // The first hash is now the account's password.
        let second = call(&mut c, 2, login("newcomer", "other")).await;
        assert!(matches!(second, ServerResponse::Error { code: 401, .. }));
    }

    #[tokio::test]
    async fn test_session_key_exchanges_for_combo_token() {
        let addr = start().await;
        let mut c = ws(&addr).await;

        let ServerResponse::Login(session) =
            call(&mut c, 1, login(DEMO_USERNAME, DEMO_PASSWORD)).await
        else {
            panic!("login failed");
        };
        let data = ComboTokenData {
            account_id: session.account_id,
            token: session.session_token,
            issued_at: keyforge::auth::token::now_millis(),
            guest: false,
        };
        let request = ClientRequest::ComboToken(ComboTokenRequest {
            app_id: 4,
            channel_id: 1,
            data: serde_json::to_string(&data).unwrap(),
            device: "pc".into(),
            sign: String::new(),
        });

        match call(&mut c, 2, request).await {
            ServerResponse::ComboToken(result) => {
                assert_eq!(result.account_id, session.account_id);
                assert_eq!(result.account_type, 1);
            }
            other => panic!("expected ComboToken, got {other:?}"),
        }
    }
}
