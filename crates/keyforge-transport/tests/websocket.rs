//! Integration tests for the WebSocket transport.
//!
//! Each test binds a real listener on port 0 and drives it with a
//! `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;

    use keyforge_transport::{
        Connection, PendingConnection, Transport, TransportError,
        WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn connect_client(addr: std::net::SocketAddr) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        ws
    }

    /// Binds a transport, connects one client and returns both ends.
    async fn pair(
        transport: WebSocketTransport,
    ) -> (keyforge_transport::WebSocketConnection, ClientWs) {
        let mut transport = transport;
        let addr = transport.local_addr().expect("bound address");
        let server = tokio::spawn(async move {
            let pending = transport.accept().await.expect("should accept");
            pending.complete().await.expect("handshake should complete")
        });
        let client = connect_client(addr).await;
        let conn = server.await.expect("accept task should complete");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_request_and_response_frames() {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let (conn, mut client) = pair(transport).await;

        assert!(conn.id().into_inner() > 0);
        assert!(conn.peer_addr().is_some());

        client
            .send(Message::Binary(b"login".to_vec().into()))
            .await
            .expect("client send");
        let received = conn.recv().await.expect("recv").expect("frame");
        assert_eq!(received, b"login");

        conn.send(b"ok").await.expect("server send");
        let reply = client.next().await.expect("frame").expect("ok frame");
        assert_eq!(reply.into_data().as_ref(), b"ok");
    }

    #[tokio::test]
    async fn test_websocket_text_frames_are_accepted() {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let (conn, mut client) = pair(transport).await;

        client
            .send(Message::Text("{\"seq\":1}".into()))
            .await
            .expect("client send");
        let received = conn.recv().await.expect("recv").expect("frame");
        assert_eq!(received, b"{\"seq\":1}");
    }

    #[tokio::test]
    async fn test_websocket_client_close_returns_none() {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let (conn, mut client) = pair(transport).await;

        client.close(None).await.expect("client close");
        let received = conn.recv().await.expect("recv should not error");
        assert!(received.is_none());
    }

    #[tokio::test]
    async fn test_websocket_oversized_frame_is_rejected() {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind")
            .with_max_frame_bytes(8);
        let (conn, mut client) = pair(transport).await;

        client
            .send(Message::Binary(vec![0u8; 64].into()))
            .await
            .expect("client send");
        let result = conn.recv().await;
        assert!(matches!(
            result,
            Err(TransportError::FrameTooLarge { size: 64, limit: 8 })
        ));
    }

    #[tokio::test]
    async fn test_websocket_connection_ids_are_unique() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("bound address");

        let server = tokio::spawn(async move {
            let a = transport.accept().await.expect("first");
            let a = a.complete().await.expect("first handshake");
            let b = transport.accept().await.expect("second");
            let b = b.complete().await.expect("second handshake");
            (a.id(), b.id())
        });
        let _c1 = connect_client(addr).await;
        let _c2 = connect_client(addr).await;

        let (a, b) = server.await.expect("accept task");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_websocket_accept_returns_before_handshake() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("bound address");

        // Connects over TCP but never sends the upgrade request.
        let _silent = tokio::net::TcpStream::connect(addr)
            .await
            .expect("tcp connect");

        let pending = tokio::time::timeout(Duration::from_secs(2), transport.accept())
            .await
            .expect("accept should not wait for the handshake")
            .expect("should accept");
        assert!(pending.peer_addr().is_some());

        let handshake =
            tokio::time::timeout(Duration::from_millis(200), pending.complete()).await;
        assert!(handshake.is_err(), "silent peer cannot finish the handshake");
    }

    #[tokio::test]
    async fn test_websocket_oversized_text_frame_is_rejected() {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind")
            .with_max_frame_bytes(16);
        let (conn, mut client) = pair(transport).await;

        client
            .send(Message::Text("x".repeat(1024).into()))
            .await
            .expect("client send");
        let result = conn.recv().await;
        assert!(matches!(
            result,
            Err(TransportError::FrameTooLarge { size: 1024, limit: 16 })
        ));
    }
}
