// gc-test-utils: in-process harness pieces for the integration suites.
//
// Everything binds to 127.0.0.1:0 so suites can run in parallel without
// port coordination.

use coordinator::server::Coordinator;
use coordinator::{CoordinatorConfig, group};
use gc_protocol::{ControlReply, Delivery, MAX_FRAME, Request};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};

/// A running in-process coordinator.
pub struct CoordinatorHarness {
    pub addr: SocketAddr,
    pub group: group::SharedGroup,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CoordinatorHarness {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Start a coordinator on an ephemeral port with the given window.
pub async fn spawn_coordinator(persistence_window_secs: u64) -> CoordinatorHarness {
    let coordinator = Coordinator::bind(&CoordinatorConfig {
        port: 0,
        persistence_window_secs,
    })
    .await
    .expect("bind coordinator");
    // Connect via loopback; the listener is bound to 0.0.0.0.
    let addr = SocketAddr::from(([127, 0, 0, 1], coordinator.local_addr().port()));
    let group = coordinator.group();
    let (shutdown, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(coordinator.run(shutdown_rx));
    CoordinatorHarness {
        addr,
        group,
        shutdown,
        task,
    }
}

// ---------------------------------------------------------------------------
// ControlProbe: raw control-socket client
// ---------------------------------------------------------------------------

/// Issues control frames the way a participant's control client would, plus
/// deliberately malformed ones.  Returns the raw reply bytes (empty when the
/// coordinator closed without ack).
pub struct ControlProbe {
    coordinator: SocketAddr,
}

impl ControlProbe {
    pub fn new(coordinator: SocketAddr) -> Self {
        ControlProbe { coordinator }
    }

    pub async fn send_raw(&self, bytes: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(self.coordinator)
            .await
            .expect("connect to coordinator");
        stream.write_all(bytes).await.expect("write request");
        let mut reply = Vec::new();
        let _ = stream.read_to_end(&mut reply).await;
        reply
    }

    /// Send a request and assert the coordinator acked it.
    pub async fn send(&self, request: &Request) {
        let reply = self
            .send_raw(&serde_json::to_vec(request).expect("serialize request"))
            .await;
        let reply: ControlReply =
            serde_json::from_slice(&reply).expect("coordinator reply should parse");
        assert!(reply.is_ack(), "coordinator replied without ack");
    }

    pub async fn register(&self, id: &str, port: u16) {
        self.send(&Request::Register {
            participant_id: id.to_owned(),
            ip: "127.0.0.1".to_owned(),
            port,
        })
        .await;
    }

    pub async fn reconnect(&self, id: &str, port: u16) {
        self.send(&Request::Reconnect {
            participant_id: id.to_owned(),
            ip: "127.0.0.1".to_owned(),
            port,
        })
        .await;
    }

    pub async fn deregister(&self, id: &str) {
        self.send(&Request::Deregister {
            participant_id: id.to_owned(),
        })
        .await;
    }

    pub async fn disconnect(&self, id: &str) {
        self.send(&Request::Disconnect {
            participant_id: id.to_owned(),
        })
        .await;
    }

    pub async fn msend(&self, id: &str, message: &str) {
        self.send(&Request::Msend {
            participant_id: id.to_owned(),
            message: message.to_owned(),
        })
        .await;
    }
}

// ---------------------------------------------------------------------------
// MockReceiver: a participant receiver endpoint that records deliveries
// ---------------------------------------------------------------------------

/// Collects every delivery the coordinator pushes at it.
///
/// Dropping the handle (via `kill`) closes the listener, turning the
/// endpoint into a dead address for dispatch-failure scenarios.
pub struct MockReceiver {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<Delivery>>>,
    task: JoinHandle<()>,
}

impl MockReceiver {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock receiver");
        let addr = listener.local_addr().expect("local_addr after bind");
        let received: Arc<Mutex<Vec<Delivery>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let task = tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let mut buf = Vec::new();
                let mut bounded = (&mut stream).take(MAX_FRAME as u64);
                if bounded.read_to_end(&mut buf).await.is_err() {
                    continue;
                }
                if let Ok(delivery) = serde_json::from_slice::<Delivery>(&buf) {
                    sink.lock().await.push(delivery);
                }
            }
        });
        MockReceiver {
            addr,
            received,
            task,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Everything received so far, in arrival order.
    pub async fn received(&self) -> Vec<Delivery> {
        self.received.lock().await.clone()
    }

    /// Messages received so far, as `(sender_id, message)` pairs.
    pub async fn messages(&self) -> Vec<(String, String)> {
        self.received()
            .await
            .into_iter()
            .map(|d| match d {
                Delivery::Multicast {
                    sender_id, message, ..
                } => (sender_id, message),
            })
            .collect()
    }

    /// Wait until at least `n` deliveries have arrived.
    pub async fn wait_for(&self, n: usize) -> Vec<Delivery> {
        timeout(Duration::from_secs(2), async {
            loop {
                let received = self.received().await;
                if received.len() >= n {
                    return received;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("expected {n} deliveries, timed out"))
    }

    /// Stop listening; subsequent deliveries to this endpoint fail.
    pub async fn kill(self) -> SocketAddr {
        self.task.abort();
        let _ = self.task.await;
        self.addr
    }
}

/// A settle pause for side effects that run after the ack.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
