use common::NotificationId;
use realtime::{EventKind, Room};

/// One live emit and how many connections accepted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub room: Room,
    pub event: EventKind,
    pub delivered: usize,
}

/// What a dispatch persisted and emitted, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub notifications: Vec<NotificationId>,
    pub deliveries: Vec<Delivery>,
}

impl DispatchReport {
    pub fn record(&mut self, room: Room, event: EventKind, delivered: usize) {
        self.deliveries.push(Delivery {
            room,
            event,
            delivered,
        });
    }

    /// True if `event` was emitted to `room`, whether or not anyone received it.
    pub fn emitted(&self, room: Room, event: EventKind) -> bool {
        self.deliveries
            .iter()
            .any(|d| d.room == room && d.event == event)
    }

    /// Events emitted to `room`, in emit order.
    pub fn events_for(&self, room: Room) -> Vec<EventKind> {
        self.deliveries
            .iter()
            .filter(|d| d.room == room)
            .map(|d| d.event)
            .collect()
    }

    pub fn total_delivered(&self) -> usize {
        self.deliveries.iter().map(|d| d.delivered).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UserId;

    #[test]
    fn records_and_queries_deliveries() {
        let mut report = DispatchReport::default();
        report.record(Room::ADMINS, EventKind::OrderUpdated, 2);
        report.record(Room::User(UserId::new(1)), EventKind::OrderUpdated, 0);
        report.record(Room::ADMINS, EventKind::OrderCourierAssigned, 2);

        assert!(report.emitted(Room::User(UserId::new(1)), EventKind::OrderUpdated));
        assert!(!report.emitted(Room::User(UserId::new(1)), EventKind::OrderAssigned));
        assert_eq!(
            report.events_for(Room::ADMINS),
            vec![EventKind::OrderUpdated, EventKind::OrderCourierAssigned]
        );
        assert_eq!(report.total_delivered(), 4);
    }
}
