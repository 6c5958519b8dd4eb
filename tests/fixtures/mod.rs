//! Shared event types for the integration suite.

use typebus::Event;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlaced {
    pub id: u64,
}

impl Event for OrderPlaced {
    fn event_name() -> &'static str {
        "order-placed"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderShipped {
    pub id: u64,
    pub carrier: &'static str,
}

impl Event for OrderShipped {
    fn event_name() -> &'static str {
        "order-shipped"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat(pub u32);

impl Event for Heartbeat {
    fn event_name() -> &'static str {
        "heartbeat"
    }
}
