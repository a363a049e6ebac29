//! Control front-end: accept loop and request handlers.
//!
//! One worker task per inbound control connection.  Each connection carries
//! exactly one framed request: a single bounded read, then an ack, then the
//! side effects.  The ack is a receipt, not a success indicator: it goes
//! out before the request's legality is checked, so the caller only observes
//! handshake latency.  Malformed payloads close the connection without ack.
//!
//! Per-connection errors never tear the coordinator down; the only fatal
//! conditions are config failure at startup and interrupt.

use crate::config::CoordinatorConfig;
use crate::dispatch;
use crate::group::{GroupState, SharedGroup, now_epoch};
use gc_protocol::{ControlReply, MAX_FRAME, Request};
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{info, warn};

/// The coordinator process: listener plus shared group state.
pub struct Coordinator {
    listener: TcpListener,
    group: SharedGroup,
}

impl Coordinator {
    /// Bind the control listener.  Port 0 lets the OS choose (used by tests).
    pub async fn bind(config: &CoordinatorConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
        Ok(Coordinator {
            listener,
            group: GroupState::shared(config.persistence_window_secs),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener
            .local_addr()
            .expect("local_addr always succeeds after bind")
    }

    /// Handle on the shared state, for inspection from tests and tooling.
    pub fn group(&self) -> SharedGroup {
        self.group.clone()
    }

    /// Accept loop.  Runs until the shutdown watch flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown.borrow() { break; }
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            tokio::spawn(handle_control(stream, peer, self.group.clone()));
                        }
                        Err(e) => warn!(error = %e, "accept failed"),
                    }
                }
            }
        }
        info!("coordinator stopped");
    }
}

/// Drive one control connection: read, ack, execute.
async fn handle_control(mut stream: TcpStream, peer: SocketAddr, group: SharedGroup) {
    let mut buf = vec![0u8; MAX_FRAME];
    let n = match stream.read(&mut buf).await {
        Ok(0) => return,
        Ok(n) => n,
        Err(e) => {
            warn!(%peer, error = %e, "control read failed");
            return;
        }
    };

    let request: Request = match serde_json::from_slice(&buf[..n]) {
        Ok(r) => r,
        Err(e) => {
            // Absence of the ack is the caller's failure signal.
            warn!(%peer, error = %e, "malformed request, closing without ack");
            return;
        }
    };

    let ack = match serde_json::to_vec(&ControlReply::ack()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "ack serialization failed");
            return;
        }
    };
    if let Err(e) = stream.write_all(&ack).await {
        // Caller is gone; skip the side effects like the read path would.
        warn!(%peer, error = %e, "ack write failed");
        return;
    }
    let _ = stream.shutdown().await;
    drop(stream);

    process_request(&group, request).await;
}

fn receiver_addr(ip: &str, port: u16) -> Option<SocketAddr> {
    ip.parse::<IpAddr>().ok().map(|ip| SocketAddr::new(ip, port))
}

/// Execute a request's side effects.  State-illegal requests log at warn and
/// mutate nothing; the ack has already gone out either way.
async fn process_request(group: &SharedGroup, request: Request) {
    match request {
        Request::Register {
            participant_id,
            ip,
            port,
        } => {
            let Some(addr) = receiver_addr(&ip, port) else {
                warn!(participant_id = %participant_id, ip = %ip, "register with unparseable address");
                return;
            };
            match group.lock().await.members.register(&participant_id, addr) {
                Ok(()) => info!(participant_id = %participant_id, %addr, "participant registered"),
                Err(e) => warn!(participant_id = %participant_id, error = %e, "register rejected"),
            }
        }
        Request::Deregister { participant_id } => {
            match group.lock().await.members.deregister(&participant_id) {
                Ok(()) => info!(participant_id = %participant_id, "participant deregistered"),
                Err(e) => warn!(participant_id = %participant_id, error = %e, "deregister rejected"),
            }
        }
        Request::Disconnect { participant_id } => {
            match group
                .lock()
                .await
                .members
                .disconnect(&participant_id, now_epoch())
            {
                Ok(()) => info!(participant_id = %participant_id, "participant disconnected"),
                Err(e) => warn!(participant_id = %participant_id, error = %e, "disconnect rejected"),
            }
        }
        Request::Reconnect {
            participant_id,
            ip,
            port,
        } => {
            let Some(addr) = receiver_addr(&ip, port) else {
                warn!(participant_id = %participant_id, ip = %ip, "reconnect with unparseable address");
                return;
            };
            // Transition + replay selection are atomic; delivery happens
            // after the guard is dropped.
            let replay = match group
                .lock()
                .await
                .accept_reconnect(&participant_id, addr, now_epoch())
            {
                Ok(replay) => replay,
                Err(e) => {
                    warn!(participant_id = %participant_id, error = %e, "reconnect rejected");
                    return;
                }
            };
            info!(
                participant_id = %participant_id,
                %addr,
                missed = replay.len(),
                "participant reconnected"
            );
            dispatch::replay(group, &participant_id, addr, replay).await;
        }
        Request::Msend {
            participant_id,
            message,
        } => {
            let accepted = group
                .lock()
                .await
                .accept_multicast(&participant_id, &message, now_epoch());
            match accepted {
                Ok((payload, recipients)) => {
                    info!(
                        sender_id = %participant_id,
                        recipients = recipients.len(),
                        "multicast accepted"
                    );
                    dispatch::fan_out(group, &payload, recipients).await;
                }
                Err(e) => warn!(sender_id = %participant_id, error = %e, "multicast rejected"),
            }
        }
    }
}
