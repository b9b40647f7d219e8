//! Turns a patch into the column changes of one compare-and-write.

use chrono::{DateTime, Utc};
use common::OrderState;
use order_store::{Order, OrderChanges};

use super::{OrderError, OrderPatch};

/// Computes the changes a patch makes to `current`.
///
/// Assigning a courier restarts kitchen work: the state becomes `Preparing`
/// unless the same patch cancels the order. That forced state bypasses the
/// allow-list; explicit states are checked against it unless `patch.force`
/// is set. `delivered_at` is stamped exactly when `Delivered` is written.
pub fn plan_transition(
    current: &Order,
    patch: &OrderPatch,
    now: DateTime<Utc>,
) -> Result<OrderChanges, OrderError> {
    let assigning = patch.assigned_courier().is_some();
    let forced_preparing = assigning && patch.order_state != Some(OrderState::Cancelled);

    let order_state = if forced_preparing {
        Some(OrderState::Preparing)
    } else {
        patch.order_state
    };

    if !forced_preparing
        && !patch.force
        && let Some(to) = patch.order_state
        && !current.order_state.can_transition_to(to)
    {
        return Err(OrderError::IllegalTransition {
            from: current.order_state,
            to,
        });
    }

    Ok(OrderChanges {
        order_state,
        delivery_state: patch.delivery_state,
        courier_id: patch.courier_id,
        estimated_minutes: patch.estimated_minutes,
        delivered_at: (order_state == Some(OrderState::Delivered)).then_some(now),
    })
}
