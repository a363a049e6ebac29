// coordinator: central authority of the multicast group.
//
// Maintains the membership table and the retained message log, fans accepted
// multicasts out to every online member, and replays missed messages to
// reconnecting members within the configured persistence window.

pub mod config;
pub mod dispatch;
pub mod group;
pub mod membership;
pub mod retention;
pub mod server;

pub use config::CoordinatorConfig;
pub use server::Coordinator;
