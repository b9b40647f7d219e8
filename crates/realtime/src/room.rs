//! Named audiences for live events.

use common::{Role, UserId};
use thiserror::Error;

/// A named set of connections that receives the same events.
///
/// Displays as and parses from `role:<Role>` or `user:<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// Everyone signed in with a role, e.g. `role:Admin`.
    Role(Role),
    /// One user's personal room, e.g. `user:42`.
    User(UserId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid room name: {0:?}")]
pub struct ParseRoomError(String);

impl Room {
    pub const ADMINS: Room = Room::Role(Role::Admin);

    pub fn user(id: UserId) -> Self {
        Room::User(id)
    }

    /// Rooms a verified session belongs to.
    pub fn memberships(user: UserId, role: Role) -> [Room; 2] {
        [Room::Role(role), Room::User(user)]
    }
}

impl std::fmt::Display for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Room::Role(role) => write!(f, "role:{role}"),
            Room::User(id) => write!(f, "user:{id}"),
        }
    }
}

impl std::str::FromStr for Room {
    type Err = ParseRoomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseRoomError(s.to_string());
        let (kind, value) = s.split_once(':').ok_or_else(invalid)?;

        match kind {
            "role" => value.parse().map(Room::Role).map_err(|_| invalid()),
            "user" => value
                .parse::<i64>()
                .map(|id| Room::User(UserId::new(id)))
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}
