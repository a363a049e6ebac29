//! Participant-local state machine.
//!
//! The participant tracks its own state independently of the coordinator:
//! commands are rejected locally when the state forbids them, a successful
//! ack advances the state, and a failed request tears down any receiver that
//! was started speculatively and leaves the state unchanged.
//!
//! Register and reconnect bind the receiver endpoint *before* the control
//! request goes out, because the coordinator may attempt delivery (replay)
//! the moment it processes the request.

use crate::config::ParticipantConfig;
use crate::control::{ControlClient, ControlError};
use crate::receiver::{Receiver, ReceiverHandle};
use crate::sink::MessageSink;
use gc_protocol::Request;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalState {
    Unregistered,
    Registered,
    Disconnected,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Already registered")]
    AlreadyRegistered,
    #[error("Not registered with coordinator")]
    NotRegistered,
    #[error("Not in disconnected state")]
    NotDisconnected,
    #[error("Failed to start message receiver: {0}")]
    Bind(std::io::Error),
    #[error("Error communicating with coordinator: {0}")]
    Control(#[from] ControlError),
}

/// One participant's control state, receiver handle, and log sink.
pub struct Session {
    participant_id: String,
    control: ControlClient,
    sink: Arc<MessageSink>,
    state: LocalState,
    receiver: Option<ReceiverHandle>,
}

impl Session {
    pub fn new(config: &ParticipantConfig) -> std::io::Result<Self> {
        let sink = Arc::new(MessageSink::open(&config.log_path)?);
        Ok(Session {
            participant_id: config.participant_id.clone(),
            control: ControlClient::new(config.coordinator_addr),
            sink,
            state: LocalState::Unregistered,
            receiver: None,
        })
    }

    pub fn state(&self) -> LocalState {
        self.state
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    /// The bound receiver endpoint, while one is running.
    pub fn receiver_addr(&self) -> Option<SocketAddr> {
        self.receiver.as_ref().map(ReceiverHandle::addr)
    }

    /// Join the group, listening for deliveries on `port`.
    ///
    /// Returns the registered endpoint on success.
    pub async fn register(&mut self, port: u16) -> Result<SocketAddr, SessionError> {
        if self.state != LocalState::Unregistered {
            return Err(SessionError::AlreadyRegistered);
        }
        self.join_group(port, /*reconnect=*/ false).await
    }

    /// Leave the group and stop the receiver.
    pub async fn deregister(&mut self) -> Result<(), SessionError> {
        if self.state != LocalState::Registered {
            return Err(SessionError::NotRegistered);
        }
        self.control
            .send(&Request::Deregister {
                participant_id: self.participant_id.clone(),
            })
            .await?;
        self.state = LocalState::Unregistered;
        self.stop_receiver().await;
        info!(participant_id = %self.participant_id, "deregistered");
        Ok(())
    }

    /// Go offline temporarily; the coordinator retains messages for replay.
    pub async fn disconnect(&mut self) -> Result<(), SessionError> {
        if self.state != LocalState::Registered {
            return Err(SessionError::NotRegistered);
        }
        self.control
            .send(&Request::Disconnect {
                participant_id: self.participant_id.clone(),
            })
            .await?;
        self.state = LocalState::Disconnected;
        self.stop_receiver().await;
        info!(participant_id = %self.participant_id, "disconnected");
        Ok(())
    }

    /// Return from offline, listening on `port` (possibly a new one).
    ///
    /// Replayed messages start arriving as soon as the coordinator processes
    /// the request, which is why the receiver is already bound.
    pub async fn reconnect(&mut self, port: u16) -> Result<SocketAddr, SessionError> {
        if self.state != LocalState::Disconnected {
            return Err(SessionError::NotDisconnected);
        }
        self.join_group(port, /*reconnect=*/ true).await
    }

    /// Multicast a message to the group.
    pub async fn msend(&mut self, message: &str) -> Result<(), SessionError> {
        if self.state != LocalState::Registered {
            return Err(SessionError::NotRegistered);
        }
        self.control
            .send(&Request::Msend {
                participant_id: self.participant_id.clone(),
                message: message.to_owned(),
            })
            .await?;
        Ok(())
    }

    /// Tear down the receiver on the way out of the process.
    pub async fn shutdown(&mut self) {
        self.stop_receiver().await;
    }

    /// Shared body of register and reconnect: bind the receiver first, then
    /// send the control request; roll the receiver back if the request fails.
    async fn join_group(&mut self, port: u16, reconnect: bool) -> Result<SocketAddr, SessionError> {
        let receiver = Receiver::bind(port, self.sink.clone())
            .await
            .map_err(SessionError::Bind)?;
        let ip = local_ip_toward(self.control.coordinator());
        let addr = SocketAddr::new(ip, receiver.local_addr().port());
        let handle = receiver.spawn();

        let request = if reconnect {
            Request::Reconnect {
                participant_id: self.participant_id.clone(),
                ip: ip.to_string(),
                port: addr.port(),
            }
        } else {
            Request::Register {
                participant_id: self.participant_id.clone(),
                ip: ip.to_string(),
                port: addr.port(),
            }
        };

        match self.control.send(&request).await {
            Ok(()) => {
                self.receiver = Some(handle);
                self.state = LocalState::Registered;
                info!(participant_id = %self.participant_id, %addr, reconnect, "joined group");
                Ok(addr)
            }
            Err(e) => {
                // The speculative receiver must not outlive the failure.
                handle.shutdown().await;
                Err(SessionError::Control(e))
            }
        }
    }

    async fn stop_receiver(&mut self) {
        if let Some(handle) = self.receiver.take() {
            handle.shutdown().await;
        }
    }
}

/// The local address the OS would route toward the coordinator from.
///
/// Connecting a UDP socket sends no packets; it only resolves the outbound
/// interface.  Falls back to loopback when the route lookup fails.
fn local_ip_toward(coordinator: SocketAddr) -> IpAddr {
    std::net::UdpSocket::bind(("0.0.0.0", 0))
        .and_then(|s| {
            s.connect(coordinator)?;
            Ok(s.local_addr()?.ip())
        })
        .unwrap_or_else(|_| IpAddr::from([127, 0, 0, 1]))
}
