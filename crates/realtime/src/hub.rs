//! RoomHub: room-scoped fan-out to live connections.
//!
//! ```text
//! emit(room, event)
//!       │
//!       ▼
//! RoomHub
//!   ├── rooms: room → {connection ids}
//!   └── connections: id → bounded mpsc sender
//!           │ try_send (full buffer drops the event)
//!           ▼
//!       Connection::recv → socket task
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::{Event, Room};

/// Events buffered per connection before new ones are dropped.
pub const DEFAULT_BUFFER: usize = 64;

/// Receives live events addressed to rooms.
pub trait Publisher: Send + Sync {
    /// Delivers `event` to every current member of `room` and returns how
    /// many connections accepted it. Zero means nobody received it.
    fn emit(&self, room: Room, event: Event) -> usize;
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    fn emit(&self, room: Room, event: Event) -> usize {
        (**self).emit(room, event)
    }
}

pub type ConnectionId = u64;

struct Inner {
    rooms: DashMap<Room, HashSet<ConnectionId>>,
    connections: DashMap<ConnectionId, mpsc::Sender<Event>>,
    next_id: AtomicU64,
    buffer: usize,
}

/// Registry of live connections and their room memberships.
///
/// Cloning is cheap; all clones share the same registry.
#[derive(Clone)]
pub struct RoomHub {
    inner: Arc<Inner>,
}

impl Default for RoomHub {
    fn default() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }
}

impl RoomHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a hub whose connections buffer at most `buffer` events.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                rooms: DashMap::new(),
                connections: DashMap::new(),
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Registers a new connection with no room memberships.
    pub fn connect(&self) -> Connection {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        self.inner.connections.insert(id, tx);

        metrics::gauge!("realtime_connections").set(self.connection_count() as f64);
        tracing::debug!(connection_id = id, "connection registered");

        Connection {
            id,
            hub: self.clone(),
            rooms: HashSet::new(),
            rx,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    /// Number of connections currently in `room`.
    pub fn room_size(&self, room: &Room) -> usize {
        self.inner.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    fn add_member(&self, room: Room, id: ConnectionId) {
        self.inner.rooms.entry(room).or_default().insert(id);
    }

    fn remove_member(&self, room: &Room, id: ConnectionId) {
        if let Some(mut members) = self.inner.rooms.get_mut(room) {
            members.remove(&id);
        }
        self.inner.rooms.remove_if(room, |_, members| members.is_empty());
    }

    fn disconnect(&self, id: ConnectionId, rooms: &HashSet<Room>) {
        for room in rooms {
            self.remove_member(room, id);
        }
        self.inner.connections.remove(&id);

        metrics::gauge!("realtime_connections").set(self.connection_count() as f64);
        tracing::debug!(connection_id = id, "connection removed");
    }
}

impl Publisher for RoomHub {
    fn emit(&self, room: Room, event: Event) -> usize {
        // Snapshot members so no map guard is held while sending.
        let members: Vec<ConnectionId> = match self.inner.rooms.get(&room) {
            Some(members) => members.iter().copied().collect(),
            None => Vec::new(),
        };

        let mut delivered = 0;
        for id in members {
            let Some(tx) = self.inner.connections.get(&id).map(|entry| entry.value().clone()) else {
                continue;
            };
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    record_drop(DropReason::BufferFull);
                    tracing::warn!(connection_id = id, %room, event = %event.event, "connection buffer full, event dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }

        metrics::counter!("realtime_events_emitted_total", "event" => event.event.as_str())
            .increment(1);
        if delivered == 0 {
            record_drop(DropReason::NoSubscribers);
            tracing::debug!(%room, event = %event.event, "no live subscribers");
        }
        delivered
    }
}

/// Why an event did not reach a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropReason {
    /// One connection's queue was full; counted per connection.
    BufferFull,
    /// The whole emit found nobody listening; counted per emit.
    NoSubscribers,
}

impl DropReason {
    fn as_str(self) -> &'static str {
        match self {
            DropReason::BufferFull => "buffer_full",
            DropReason::NoSubscribers => "no_subscribers",
        }
    }
}

fn record_drop(reason: DropReason) {
    metrics::counter!("realtime_events_dropped_total", "reason" => reason.as_str()).increment(1);
}

/// One live client. Dropping it leaves every room it joined.
pub struct Connection {
    id: ConnectionId,
    hub: RoomHub,
    rooms: HashSet<Room>,
    rx: mpsc::Receiver<Event>,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn join(&mut self, room: Room) {
        if self.rooms.insert(room) {
            self.hub.add_member(room, self.id);
        }
    }

    pub fn leave(&mut self, room: &Room) {
        if self.rooms.remove(room) {
            self.hub.remove_member(room, self.id);
        }
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter()
    }

    /// Waits for the next event. Cancel-safe.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Returns a buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.hub.disconnect(self.id, &self.rooms);
    }
}
