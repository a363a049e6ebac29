//! Outbound delivery: multicast fan-out and reconnect replay.
//!
//! Each delivery opens a fresh connection to the recipient's receiver
//! endpoint, writes the framed JSON payload in a single send, and closes.
//! Deliveries run outside the group lock; only demotion after a failure
//! re-acquires it.
//!
//! There are no in-place retries.  A failed recipient is marked offline with
//! the acceptance instant of the payload that failed, which keeps that very
//! message inside its replay cutoff; the next reconnect is the retry
//! mechanism.

use crate::group::SharedGroup;
use gc_protocol::Delivery;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("connect/write: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize: {0}")]
    Json(#[from] serde_json::Error),
}

/// Deliver one payload to one receiver endpoint.
pub async fn deliver(addr: SocketAddr, payload: &Delivery) -> Result<(), DispatchError> {
    let bytes = serde_json::to_vec(payload)?;
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(&bytes).await?;
    stream.shutdown().await?;
    Ok(())
}

fn accepted_at(payload: &Delivery) -> f64 {
    match payload {
        Delivery::Multicast { timestamp, .. } => *timestamp,
    }
}

/// Fan one accepted multicast out to the snapshot of online members.
///
/// Recipients are attempted in snapshot order, exactly once each; a failure
/// to one recipient never aborts the others.
pub async fn fan_out(
    group: &SharedGroup,
    payload: &Delivery,
    recipients: Vec<(String, SocketAddr)>,
) {
    for (id, addr) in recipients {
        match deliver(addr, payload).await {
            Ok(()) => debug!(participant_id = %id, %addr, "multicast delivered"),
            Err(e) => {
                warn!(participant_id = %id, %addr, error = %e, "delivery failed, marking offline");
                group.lock().await.members.mark_offline(&id, accepted_at(payload));
            }
        }
    }
}

/// Replay missed messages to a freshly-reconnected member, in log order.
///
/// A failure demotes the member and abandons the rest of the slice; the
/// undelivered entries remain eligible after the next reconnect.
pub async fn replay(group: &SharedGroup, id: &str, addr: SocketAddr, entries: Vec<Delivery>) {
    for payload in &entries {
        if let Err(e) = deliver(addr, payload).await {
            warn!(participant_id = %id, %addr, error = %e, "replay failed, marking offline");
            group.lock().await.members.mark_offline(id, accepted_at(payload));
            return;
        }
    }
    if !entries.is_empty() {
        debug!(participant_id = %id, replayed = entries.len(), "replay complete");
    }
}
