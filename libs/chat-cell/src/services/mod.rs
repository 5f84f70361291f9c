pub mod delivery;
pub mod presence;

pub use delivery::ChatDeliveryService;
pub use presence::{OutboundFrame, PresenceRegistry};
