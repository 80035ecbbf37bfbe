//! Tests for the TCP inter-process channel

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use shared::{IpcMessage, IpcRole, STOP_NODE_TOPIC};

use super::common::with_timeout;
use crate::error::SupervisorError;
use crate::services::ipc::{TcpIpcChannel, read_frame, write_frame};
use crate::traits::{IpcChannel, RequestHandler};

fn any_port() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

async fn server() -> TcpIpcChannel {
    let server = TcpIpcChannel::new(IpcRole::Server, any_port());
    server.connect().await.unwrap();
    server
}

async fn client_of(server: &TcpIpcChannel) -> TcpIpcChannel {
    let client = TcpIpcChannel::new(IpcRole::Client, server.address());
    client.connect().await.unwrap();
    client
}

async fn wait_for_peers(server: &TcpIpcChannel, count: usize) {
    with_timeout(async {
        while server.peer_count().await < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("peers should attach");
}

#[tokio::test]
async fn test_request_is_answered_by_handler() {
    let server = server().await;
    let handler: RequestHandler = Arc::new(|_| Ok(Some("http://localhost:8545".to_string())));
    server.on("blockchain:node", handler).await.unwrap();

    let client = client_of(&server).await;
    let reply = with_timeout(client.request("blockchain:node", None)).await.unwrap();
    assert_eq!(reply.unwrap(), Some("http://localhost:8545".to_string()));
}

#[tokio::test]
async fn test_request_without_handler_fails() {
    let server = server().await;
    let client = client_of(&server).await;

    let reply = with_timeout(client.request("nobody:home", None)).await.unwrap();
    assert!(matches!(reply, Err(SupervisorError::IpcError { .. })));
}

#[tokio::test]
async fn test_handler_error_travels_back() {
    let server = server().await;
    let handler: RequestHandler = Arc::new(|_| Err("not configured".to_string()));
    server.on("blockchain:node", handler).await.unwrap();

    let client = client_of(&server).await;
    match with_timeout(client.request("blockchain:node", None)).await.unwrap() {
        Err(SupervisorError::IpcError { message }) => assert_eq!(message, "not configured"),
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn test_broadcast_reaches_every_client() {
    let server = server().await;
    let first = client_of(&server).await;
    let second = client_of(&server).await;
    let mut first_rx = first.subscribe();
    let mut second_rx = second.subscribe();
    wait_for_peers(&server, 2).await;

    server.broadcast(STOP_NODE_TOPIC, None).await.unwrap();

    for rx in [&mut first_rx, &mut second_rx] {
        let message = with_timeout(rx.recv()).await.unwrap().unwrap();
        assert_eq!(message.topic(), Some(STOP_NODE_TOPIC));
    }
}

#[tokio::test]
async fn test_second_server_on_same_address_fails() {
    let first = server().await;
    let second = TcpIpcChannel::new(IpcRole::Server, first.address());

    assert!(second.connect().await.is_err());
    assert!(!second.is_connected());
}

#[tokio::test]
async fn test_role_restrictions() {
    let neither = TcpIpcChannel::new(IpcRole::Neither, any_port());
    assert!(neither.connect().await.is_err());

    let server = server().await;
    let client = client_of(&server).await;
    assert!(client.broadcast(STOP_NODE_TOPIC, None).await.is_err());
    assert!(server.request("blockchain:node", None).await.is_err());
}

#[tokio::test]
async fn test_shutdown_disconnects() {
    let server = server().await;
    assert!(server.is_connected());

    server.shutdown().await;
    assert!(!server.is_connected());
    assert_eq!(server.peer_count().await, 0);
}

#[tokio::test]
async fn test_frame_codec() {
    let (mut a, mut b) = tokio::io::duplex(1024);
    let message = IpcMessage::broadcast(STOP_NODE_TOPIC);

    write_frame(&mut a, &message).await.unwrap();
    assert_eq!(read_frame(&mut b).await, Some(message));
}

#[tokio::test]
async fn test_oversized_frame_is_rejected() {
    use tokio::io::AsyncWriteExt;

    let (mut a, mut b) = tokio::io::duplex(64);
    a.write_all(&(2 * 1024 * 1024u32).to_be_bytes()).await.unwrap();
    assert_eq!(read_frame(&mut b).await, None);
}
