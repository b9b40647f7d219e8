use serde::{Deserialize, Serialize};

use crate::state::ParseEnumError;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw row identity.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw row identity.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

id_type!(
    /// Primary identity of an order row.
    OrderId
);
id_type!(
    /// Primary identity of an order line item row.
    OrderLineId
);
id_type!(
    /// Identity of an authenticated user, as issued by the session provider.
    UserId
);
id_type!(
    /// Identity of delivery personnel.
    ///
    /// A courier signs in with their own user account, so the courier id is
    /// also the user id of that account.
    CourierId
);
id_type!(
    /// Primary identity of a persisted notification.
    NotificationId
);

impl CourierId {
    /// Returns the user identity the courier signs in with.
    pub const fn as_user(&self) -> UserId {
        UserId(self.0)
    }
}

impl From<UserId> for CourierId {
    fn from(id: UserId) -> Self {
        Self(id.0)
    }
}

/// Role carried by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Courier,
    Customer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Courier, Role::Customer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Courier => "Courier",
            Role::Customer => "Customer",
        }
    }

    /// Staff roles may update orders they did not place.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Courier)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("role", s))
    }
}
