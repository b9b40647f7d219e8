//! Real-time channel: rooms, wire events and the connection hub.
//!
//! Delivery is at-most-once. Each connection owns a bounded buffer; events
//! for a full buffer are dropped, and nothing is replayed on reconnect.

pub mod event;
pub mod hub;
pub mod room;

pub use event::{ClientMessage, Event, EventKind, LocationUpdate};
pub use hub::{Connection, ConnectionId, DEFAULT_BUFFER, Publisher, RoomHub};
pub use room::{ParseRoomError, Room};
