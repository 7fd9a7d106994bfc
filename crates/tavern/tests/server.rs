//! Integration tests for the Tavern server over real TCP connections.

use std::net::SocketAddr;
use std::time::Duration;

use tavern::prelude::*;
use tavern_protocol::{AuthRequest, JoinRoomRequest, SendChatRequest, decode, encode};
use tavern_transport::{FrameReader, FrameWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;

// =========================================================================
// Helpers
// =========================================================================

struct Running {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    world: WorldRegistry,
    task: JoinHandle<Result<(), TavernError>>,
}

async fn start(config: ServerConfig) -> Running {
    let auth = StaticTokenAuthenticator::new()
        .with_token("t-alice", "alice")
        .with_token("t-bob", "bob");
    let server = TavernServer::builder()
        .config(config)
        .bind("127.0.0.1:0")
        .build(auth, MemoryPlayerStore::new(), NoActionService)
        .await
        .unwrap();

    let running_addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();
    let world = server.world().clone();
    let task = tokio::spawn(server.run());

    Running {
        addr: running_addr,
        shutdown,
        world,
        task,
    }
}

struct Client {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
}

impl Client {
    /// Connects and consumes the welcome message.
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, write) = stream.into_split();
        let mut client = Self {
            reader: FrameReader::new(read),
            writer: FrameWriter::new(write),
        };
        assert!(matches!(client.recv().await, ServerMessage::SimpleMessage(_)));
        client
    }

    async fn send(&mut self, request: &ClientRequest) {
        let bytes = encode(request).unwrap();
        self.send_raw(&bytes).await;
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_frame(bytes).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn recv(&mut self) -> ServerMessage {
        let frame = tokio::time::timeout(Duration::from_secs(5), self.reader.read_frame())
            .await
            .expect("timed out waiting for a server message")
            .unwrap()
            .expect("connection closed");
        decode(&frame).unwrap()
    }

    /// Waits for the server to close the connection. A reset counts.
    async fn closed(&mut self) {
        let result = tokio::time::timeout(Duration::from_secs(5), self.reader.read_frame())
            .await
            .expect("timed out waiting for close");
        assert!(matches!(result, Ok(None) | Err(_)), "expected close, got a frame");
    }

    async fn auth(&mut self, token: &str) {
        self.send(&ClientRequest::Auth(AuthRequest {
            token: token.into(),
        }))
        .await;
        match self.recv().await {
            ServerMessage::AuthResponse(r) => assert!(r.success),
            other => panic!("expected AUTH_RESPONSE, got {other:?}"),
        }
    }

    async fn chat(&mut self, text: &str) {
        self.send(&ClientRequest::SendChat(SendChatRequest { text: text.into() }))
            .await;
    }

    async fn expect_chat(&mut self, from: &str, text: &str) {
        match self.recv().await {
            ServerMessage::NewChatMessage(m) => {
                assert_eq!(m.player_id, PlayerId::new(from));
                assert_eq!(m.text, text);
            }
            other => panic!("expected NEW_CHAT_MESSAGE from {from}, got {other:?}"),
        }
    }
}

// =========================================================================
// Chat
// =========================================================================

#[tokio::test]
async fn test_two_clients_chat_over_tcp() {
    let server = start(ServerConfig::default()).await;
    let mut alice = Client::connect(server.addr).await;
    let mut bob = Client::connect(server.addr).await;
    alice.auth("t-alice").await;
    bob.auth("t-bob").await;

    for client in [&mut alice, &mut bob] {
        client
            .send(&ClientRequest::JoinRoom(JoinRoomRequest {
                criteria: Some(RoomCriteria::room("lobby")),
            }))
            .await;
        match client.recv().await {
            ServerMessage::JoinRoomResponse(r) => assert!(r.success),
            other => panic!("expected JOIN_ROOM_RESPONSE, got {other:?}"),
        }
    }
    assert!(matches!(alice.recv().await, ServerMessage::RoomMemberJoined(_)));

    // Each reply trails the line it answers, so an echo to the sender
    // would arrive ahead of it.
    alice.chat("evening, bob").await;
    bob.expect_chat("alice", "evening, bob").await;

    bob.chat("evening, alice").await;
    alice.expect_chat("bob", "evening, alice").await;

    alice.chat("quiet night").await;
    bob.expect_chat("alice", "quiet night").await;

    server.shutdown.shutdown();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_world_tracks_connected_players() {
    let server = start(ServerConfig::default()).await;
    let mut alice = Client::connect(server.addr).await;
    alice.auth("t-alice").await;

    assert!(server.world.is_online(PlayerId::new("alice")).await.unwrap());

    drop(alice);
    let mut online = true;
    for _ in 0..100 {
        online = server.world.is_online(PlayerId::new("alice")).await.unwrap();
        if !online {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!online);

    server.shutdown.shutdown();
    server.task.await.unwrap().unwrap();
}

// =========================================================================
// Limits and errors
// =========================================================================

#[tokio::test]
async fn test_protocol_error_over_tcp_keeps_connection() {
    let server = start(ServerConfig::default()).await;
    let mut client = Client::connect(server.addr).await;

    client.send_raw(b"{\"type\":").await;
    match client.recv().await {
        ServerMessage::Error(e) => assert_eq!(e.code, ErrorCode::ProtocolError),
        other => panic!("expected ERROR, got {other:?}"),
    }

    client.auth("t-alice").await;

    server.shutdown.shutdown();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_oversized_frame_closes_connection() {
    let config = ServerConfig {
        max_frame_len: 64,
        ..ServerConfig::default()
    };
    let server = start(config).await;
    let mut client = Client::connect(server.addr).await;

    let big = serde_json::to_vec(&serde_json::json!({
        "type": "SEND_CHAT",
        "payload": { "text": "x".repeat(500) },
    }))
    .unwrap();
    client.send_raw(&big).await;

    client.closed().await;

    server.shutdown.shutdown();
    server.task.await.unwrap().unwrap();
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_shutdown_notifies_clients_and_returns() {
    let server = start(ServerConfig::default()).await;
    let mut alice = Client::connect(server.addr).await;
    let mut bob = Client::connect(server.addr).await;
    alice.auth("t-alice").await;

    server.shutdown.shutdown();

    for client in [&mut alice, &mut bob] {
        assert!(matches!(client.recv().await, ServerMessage::SimpleMessage(_)));
        client.closed().await;
    }

    tokio::time::timeout(Duration::from_secs(10), server.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(TcpStream::connect(server.addr).await.is_err());
}

#[tokio::test]
async fn test_shutdown_handle_is_idempotent() {
    let server = start(ServerConfig::default()).await;

    server.shutdown.shutdown();
    server.shutdown.shutdown();
    assert!(server.shutdown.is_shutdown());

    server.task.await.unwrap().unwrap();
}
