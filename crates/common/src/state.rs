//! Order lifecycle and delivery state enums.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a stored or submitted string is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// The kitchen/fulfilment state of an order.
///
/// Allowed transitions:
/// ```text
/// Ordered ──► Preparing ──► ReadyForPickup ──► EnRoute ──► Delivered
///    │            │               │   └──────────────────────▲
///    └────────────┴───────────────┴───────────┴──► Cancelled
/// ```
/// Staying in the same state is always allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderState {
    /// Order was placed and acknowledged.
    #[default]
    Ordered,

    /// The kitchen is working on the order.
    Preparing,

    /// Food is ready to be handed to the customer or a courier.
    ReadyForPickup,

    /// A courier is on the way.
    EnRoute,

    /// Order was handed over (terminal state).
    Delivered,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderState {
    pub const ALL: [OrderState; 6] = [
        OrderState::Ordered,
        OrderState::Preparing,
        OrderState::ReadyForPickup,
        OrderState::EnRoute,
        OrderState::Delivered,
        OrderState::Cancelled,
    ];

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Delivered | OrderState::Cancelled)
    }

    /// Returns true while the kitchen has not finished the order.
    pub fn is_pending(&self) -> bool {
        matches!(self, OrderState::Ordered | OrderState::Preparing)
    }

    /// Returns true if the allow-list permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderState) -> bool {
        use OrderState::*;

        if *self == next {
            return true;
        }
        match (*self, next) {
            (Ordered, Preparing)
            | (Preparing, ReadyForPickup)
            | (ReadyForPickup, EnRoute)
            | (ReadyForPickup, Delivered)
            | (EnRoute, Delivered) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Ordered => "Ordered",
            OrderState::Preparing => "Preparing",
            OrderState::ReadyForPickup => "ReadyForPickup",
            OrderState::EnRoute => "EnRoute",
            OrderState::Delivered => "Delivered",
            OrderState::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("order state", s))
    }
}

/// The courier-side delivery state. Any value may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeliveryState {
    #[default]
    Pending,
    Assigned,
    InTransit,
    Delivered,
    Failed,
}

impl DeliveryState {
    pub const ALL: [DeliveryState; 5] = [
        DeliveryState::Pending,
        DeliveryState::Assigned,
        DeliveryState::InTransit,
        DeliveryState::Delivered,
        DeliveryState::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryState::Pending => "Pending",
            DeliveryState::Assigned => "Assigned",
            DeliveryState::InTransit => "InTransit",
            DeliveryState::Delivered => "Delivered",
            DeliveryState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeliveryState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeliveryState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("delivery state", s))
    }
}

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryType {
    Delivery,
    Pickup,
}

impl DeliveryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryType::Delivery => "Delivery",
            DeliveryType::Pickup => "Pickup",
        }
    }
}

impl std::fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeliveryType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Delivery" => Ok(DeliveryType::Delivery),
            "Pickup" => Ok(DeliveryType::Pickup),
            other => Err(ParseEnumError::new("delivery type", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_ordered() {
        assert_eq!(OrderState::default(), OrderState::Ordered);
        assert_eq!(DeliveryState::default(), DeliveryState::Pending);
    }

    #[test]
    fn test_happy_path_is_allowed() {
        assert!(OrderState::Ordered.can_transition_to(OrderState::Preparing));
        assert!(OrderState::Preparing.can_transition_to(OrderState::ReadyForPickup));
        assert!(OrderState::ReadyForPickup.can_transition_to(OrderState::EnRoute));
        assert!(OrderState::EnRoute.can_transition_to(OrderState::Delivered));
    }

    #[test]
    fn test_pickup_handover_is_allowed() {
        assert!(OrderState::ReadyForPickup.can_transition_to(OrderState::Delivered));
    }

    #[test]
    fn test_backwards_and_skipping_jumps_are_rejected() {
        assert!(!OrderState::Delivered.can_transition_to(OrderState::Ordered));
        assert!(!OrderState::EnRoute.can_transition_to(OrderState::Preparing));
        assert!(!OrderState::Ordered.can_transition_to(OrderState::Delivered));
        assert!(!OrderState::Ordered.can_transition_to(OrderState::EnRoute));
    }

    #[test]
    fn test_can_cancel_from_non_terminal_states() {
        for state in OrderState::ALL {
            assert_eq!(
                state.can_transition_to(OrderState::Cancelled),
                !state.is_terminal() || state == OrderState::Cancelled,
                "{state}"
            );
        }
    }

    #[test]
    fn test_same_state_is_always_allowed() {
        for state in OrderState::ALL {
            assert!(state.can_transition_to(state));
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OrderState::Ordered.is_terminal());
        assert!(!OrderState::EnRoute.is_terminal());
        assert!(OrderState::Delivered.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
    }

    #[test]
    fn test_names_round_trip_through_from_str() {
        for state in OrderState::ALL {
            assert_eq!(state.as_str().parse::<OrderState>().unwrap(), state);
        }
        for state in DeliveryState::ALL {
            assert_eq!(state.as_str().parse::<DeliveryState>().unwrap(), state);
        }
        assert_eq!(
            "Pickup".parse::<DeliveryType>().unwrap(),
            DeliveryType::Pickup
        );
    }

    #[test]
    fn test_unknown_names_are_rejected() {
        let err = "Entregado".parse::<OrderState>().unwrap_err();
        assert_eq!(err.kind, "order state");
        assert!("Teleport".parse::<DeliveryType>().is_err());
    }

    #[test]
    fn test_serialization_uses_variant_names() {
        let json = serde_json::to_string(&OrderState::ReadyForPickup).unwrap();
        assert_eq!(json, "\"ReadyForPickup\"");
        let state: OrderState = serde_json::from_str("\"EnRoute\"").unwrap();
        assert_eq!(state, OrderState::EnRoute);
    }
}
