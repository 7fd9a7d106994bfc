//! Framing over real sockets and with realistic payloads.

use tavern_protocol::{ClientRequest, SendChatRequest, decode_request};
use tavern_transport::{FrameReader, FrameWriter, TcpTransport};
use tokio::net::TcpStream;

#[tokio::test]
async fn test_envelope_with_newlines_survives_framing() {
    // Both an escaped newline inside the string and a raw newline between
    // tokens: neither is a message boundary.
    let payload = b"{\"type\":\"SEND_CHAT\",\n\"payload\":{\"text\":\"line one\\nline two\"}}";

    let (a, b) = tokio::io::duplex(256);
    let mut writer = FrameWriter::new(a);
    writer.write_frame(payload).await.unwrap();
    writer.write_frame(payload).await.unwrap();
    writer.flush().await.unwrap();

    let mut reader = FrameReader::new(b);
    for _ in 0..2 {
        let frame = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(&frame[..], &payload[..]);
        let req = decode_request(&frame).unwrap();
        assert_eq!(
            req,
            ClientRequest::SendChat(SendChatRequest {
                text: "line one\nline two".into()
            })
        );
    }
}

#[tokio::test]
async fn test_tcp_accept_and_exchange_frames() {
    let transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();

    let client = tokio::spawn(async move {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, write) = stream.into_split();
        let mut w = FrameWriter::new(write);
        w.write_frame(b"from client").await.unwrap();
        w.flush().await.unwrap();
        let mut r = FrameReader::new(read);
        r.read_frame().await.unwrap().unwrap()
    });

    let conn = transport.accept().await.unwrap();
    assert!(conn.peer_addr().is_some());
    let (mut reader, mut writer) = conn.split();

    let frame = reader.recv().await.unwrap().unwrap();
    assert_eq!(&frame[..], b"from client");
    writer.send(b"from server").await.unwrap();

    let echoed = client.await.unwrap();
    assert_eq!(&echoed[..], b"from server");
}

#[tokio::test]
async fn test_tcp_frame_limit_applies_to_accepted_connections() {
    let transport = TcpTransport::bind("127.0.0.1:0")
        .await
        .unwrap()
        .max_frame_len(8);
    let addr = transport.local_addr().unwrap();

    tokio::spawn(async move {
        let stream = TcpStream::connect(addr).await.unwrap();
        let mut w = FrameWriter::new(stream);
        w.write_frame(b"definitely more than eight bytes").await.unwrap();
        w.flush().await.unwrap();
        // Keep the socket open until the server has read.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    });

    let (mut reader, _writer) = transport.accept().await.unwrap().split();
    assert!(reader.recv().await.is_err());
}
