//! Control client: one request, one reply, per connection.
//!
//! Requests go out as a single JSON frame; the coordinator replies with
//! `{"status":"ack"}` and closes.  The ack is a receipt: absence of it (or
//! any transport failure) means the request must be treated as not applied,
//! and the caller leaves its local state unchanged.

use gc_protocol::{ControlReply, MAX_FRAME, Request};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Connection error: {0}")]
    Connect(String),
    #[error("Transport error: {0}")]
    Io(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Coordinator did not acknowledge the request")]
    NoAck,
}

/// Issues control requests to the coordinator.
#[derive(Debug, Clone)]
pub struct ControlClient {
    coordinator: SocketAddr,
}

impl ControlClient {
    pub fn new(coordinator: SocketAddr) -> Self {
        ControlClient { coordinator }
    }

    pub fn coordinator(&self) -> SocketAddr {
        self.coordinator
    }

    /// Send one request and wait for the ack.
    pub async fn send(&self, request: &Request) -> Result<(), ControlError> {
        let bytes =
            serde_json::to_vec(request).map_err(|e| ControlError::Protocol(e.to_string()))?;

        let mut stream = TcpStream::connect(self.coordinator)
            .await
            .map_err(|e| ControlError::Connect(e.to_string()))?;
        stream
            .write_all(&bytes)
            .await
            .map_err(|e| ControlError::Io(e.to_string()))?;

        let mut buf = vec![0u8; MAX_FRAME];
        let n = stream
            .read(&mut buf)
            .await
            .map_err(|e| ControlError::Io(e.to_string()))?;
        if n == 0 {
            // Closed without a reply: the coordinator rejected the frame.
            return Err(ControlError::NoAck);
        }

        let reply: ControlReply = serde_json::from_slice(&buf[..n])
            .map_err(|e| ControlError::Protocol(format!("JSON parse: {}", e)))?;
        if !reply.is_ack() {
            return Err(ControlError::NoAck);
        }
        debug!(command = ?request, "request acknowledged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Accept one connection, read one frame, reply with `reply` bytes.
    async fn one_shot_coordinator(reply: &'static [u8]) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; MAX_FRAME];
            let _ = stream.read(&mut buf).await.unwrap();
            if !reply.is_empty() {
                stream.write_all(reply).await.unwrap();
            }
        });
        addr
    }

    fn deregister() -> Request {
        Request::Deregister {
            participant_id: "A".to_owned(),
        }
    }

    #[tokio::test]
    async fn ack_reply_is_success() {
        let addr = one_shot_coordinator(br#"{"status":"ack"}"#).await;
        ControlClient::new(addr).send(&deregister()).await.unwrap();
    }

    #[tokio::test]
    async fn close_without_reply_is_no_ack() {
        let addr = one_shot_coordinator(b"").await;
        let err = ControlClient::new(addr).send(&deregister()).await.unwrap_err();
        assert!(matches!(err, ControlError::NoAck));
    }

    #[tokio::test]
    async fn non_ack_status_is_no_ack() {
        let addr = one_shot_coordinator(br#"{"status":"err"}"#).await;
        let err = ControlClient::new(addr).send(&deregister()).await.unwrap_err();
        assert!(matches!(err, ControlError::NoAck));
    }

    #[tokio::test]
    async fn unreachable_coordinator_is_a_connect_error() {
        // Bind then drop to get a port nothing listens on.
        let addr = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap()
        };
        let err = ControlClient::new(addr).send(&deregister()).await.unwrap_err();
        assert!(matches!(err, ControlError::Connect(_)));
    }
}
