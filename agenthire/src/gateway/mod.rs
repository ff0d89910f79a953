//! Server-push gateway: run and balance updates fanned out over `/ws`.

pub mod events;
pub mod protocol;
pub mod ws;

pub use events::EventBroadcaster;
pub use protocol::{EventType, GatewayEvent};
