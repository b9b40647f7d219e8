//! Wire messages of the real-time channel.

use common::OrderId;
use serde::{Deserialize, Serialize};

/// Names of server-to-client events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "order:new")]
    OrderNew,
    #[serde(rename = "order:updated")]
    OrderUpdated,
    #[serde(rename = "order:assigned")]
    OrderAssigned,
    #[serde(rename = "order:courier_assigned")]
    OrderCourierAssigned,
    #[serde(rename = "courier:location")]
    CourierLocation,
    #[serde(rename = "notification:new")]
    NotificationNew,
    #[serde(rename = "stats:update")]
    StatsUpdate,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OrderNew => "order:new",
            EventKind::OrderUpdated => "order:updated",
            EventKind::OrderAssigned => "order:assigned",
            EventKind::OrderCourierAssigned => "order:courier_assigned",
            EventKind::CourierLocation => "courier:location",
            EventKind::NotificationNew => "notification:new",
            EventKind::StatsUpdate => "stats:update",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A server-to-client message: `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event: EventKind,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(event: EventKind, data: serde_json::Value) -> Self {
        Self { event, data }
    }

    /// Builds an event from any serializable payload.
    pub fn from_payload<T: Serialize>(event: EventKind, payload: &T) -> serde_json::Result<Self> {
        Ok(Self {
            event,
            data: serde_json::to_value(payload)?,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A courier's position relayed for one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub order_id: OrderId,
    pub lat: f64,
    pub lng: f64,
}

/// Client-to-server messages. Anything else is ignored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "courier:location")]
    CourierLocation(LocationUpdate),
    #[serde(rename = "stats:request")]
    StatsRequest,
}

impl ClientMessage {
    /// Parses a text frame; unknown or malformed messages yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}
