// participant: interactive member of the multicast group.
//
// Owns a receiver endpoint for inbound deliveries from the coordinator and a
// control client for issuing requests to it.  Local state (unregistered /
// registered / disconnected) is tracked independently of the coordinator's
// view; the two can diverge when a dispatch failure demotes a live member.

pub mod config;
pub mod control;
pub mod receiver;
pub mod repl;
pub mod session;
pub mod sink;

pub use config::ParticipantConfig;
pub use session::{LocalState, Session};
