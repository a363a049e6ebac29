// gc-protocol: multicast group wire types and serialization.
//
// Every connection carries exactly one JSON object per direction, written in
// a single send of at most `MAX_FRAME` bytes.  Control requests use a
// top-level `command` field for discriminated deserialization; deliveries to
// a participant's receiver endpoint use a top-level `type` field.

use serde::{Deserialize, Serialize};

/// Upper bound on a single frame in either direction, in bytes.
///
/// The receiving side performs one bounded read; payloads are expected to fit
/// in a single TCP segment buffer.  Frames larger than this are truncated by
/// the reader and fail to parse.
pub const MAX_FRAME: usize = 4096;

// ---------------------------------------------------------------------------
// Participant -> Coordinator control requests
// ---------------------------------------------------------------------------

/// All control request kinds accepted by the coordinator.
///
/// Serializes/deserializes using the `command` field as a tag.
///
/// ```json
/// { "command": "register", "participant_id": "A", "ip": "10.0.0.5", "port": 9100 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
#[serde(rename_all = "snake_case")]
pub enum Request {
    /// Join the group; the supplied endpoint is where multicasts are delivered.
    Register {
        participant_id: String,
        ip: String,
        port: u16,
    },
    /// Leave the group entirely, forfeiting any replay of later messages.
    Deregister { participant_id: String },
    /// Go offline temporarily; messages accepted while offline are replayed
    /// on reconnect, subject to the coordinator's persistence window.
    Disconnect { participant_id: String },
    /// Return from offline; may use a different receiver endpoint.
    Reconnect {
        participant_id: String,
        ip: String,
        port: u16,
    },
    /// Multicast a message to every currently-online member.
    Msend {
        participant_id: String,
        message: String,
    },
}

impl Request {
    /// The id of the participant issuing this request.
    pub fn participant_id(&self) -> &str {
        match self {
            Request::Register { participant_id, .. }
            | Request::Deregister { participant_id }
            | Request::Disconnect { participant_id }
            | Request::Reconnect { participant_id, .. }
            | Request::Msend { participant_id, .. } => participant_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Coordinator -> Participant control reply
// ---------------------------------------------------------------------------

/// Reply on the control socket.
///
/// The ack is a receipt, not a success indicator: the coordinator sends it
/// after parsing the request but before executing its side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlReply {
    pub status: String,
}

impl ControlReply {
    pub const ACK: &'static str = "ack";

    pub fn ack() -> Self {
        ControlReply {
            status: Self::ACK.to_owned(),
        }
    }

    pub fn is_ack(&self) -> bool {
        self.status == Self::ACK
    }
}

// ---------------------------------------------------------------------------
// Coordinator -> Participant receiver endpoint
// ---------------------------------------------------------------------------

/// Payloads delivered to a participant's receiver endpoint over a fresh
/// connection per delivery.
///
/// `timestamp` is the coordinator's acceptance instant in seconds since the
/// Unix epoch.  The coordinator's clock is authoritative; receivers render it
/// in their local zone but never use it for eligibility decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Multicast {
        sender_id: String,
        message: String,
        timestamp: f64,
    },
}
