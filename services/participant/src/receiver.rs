//! Receiver endpoint: accepts deliveries from the coordinator.
//!
//! Bound *before* the control request is transmitted, because on reconnect the
//! coordinator may open a delivery connection immediately after acking.
//! Each delivery arrives on a fresh connection carrying one JSON frame; the
//! coordinator closes after its single send, so EOF is the frame boundary.
//!
//! The accept loop runs in its own task and supports cooperative shutdown
//! through a watch signal; the handle joins the task so teardown is clean
//! before the next bind reuses the port.

use crate::sink::MessageSink;
use gc_protocol::{Delivery, MAX_FRAME};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A bound, not-yet-running receiver endpoint.
pub struct Receiver {
    listener: TcpListener,
    sink: Arc<MessageSink>,
}

impl Receiver {
    /// Bind the receiver socket (port 0 lets the OS choose, used by tests).
    pub async fn bind(port: u16, sink: Arc<MessageSink>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        Ok(Receiver { listener, sink })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener
            .local_addr()
            .expect("local_addr always succeeds after bind")
    }

    /// Start the accept loop and hand back its control handle.
    pub fn spawn(self) -> ReceiverHandle {
        let addr = self.local_addr();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        ReceiverHandle {
            addr,
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown.borrow() { break; }
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _peer)) => {
                            tokio::spawn(handle_delivery(stream, self.sink.clone()));
                        }
                        Err(e) => warn!(error = %e, "receiver accept failed"),
                    }
                }
            }
        }
        debug!("receiver stopped");
    }
}

/// Read one delivery frame and hand it to the sink.
async fn handle_delivery(stream: TcpStream, sink: Arc<MessageSink>) {
    let mut buf = Vec::new();
    let mut bounded = stream.take(MAX_FRAME as u64);
    if let Err(e) = bounded.read_to_end(&mut buf).await {
        warn!(error = %e, "delivery read failed");
        return;
    }
    match serde_json::from_slice::<Delivery>(&buf) {
        Ok(Delivery::Multicast {
            sender_id,
            message,
            timestamp,
        }) => sink.record(&sender_id, &message, timestamp).await,
        Err(e) => warn!(error = %e, "unparseable delivery payload"),
    }
}

/// Owner handle for a running receiver.
pub struct ReceiverHandle {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReceiverHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal the accept loop to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
