//! Notification reconciliation.
//!
//! Pure transforms over `(current list, event) -> next list`. Every push
//! event and every local read action funnels through [`apply`], so the
//! optimistic and the pushed variants of a mutation are the same code.
//!
//! Invariants upheld here:
//! - `id` is the only join key.
//! - `is_read` only ever moves from `false` to `true`.
//! - list order is never re-sorted; new records are prepended.

use crate::models::event::PushEvent;
use crate::models::notification::{NotificationId, NotificationRecord};

/// What an event changed, reported back to the caller for logging/UI refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Inserted(NotificationId),
    MarkedRead(NotificationId),
    MarkedAllRead { updated: usize },
    /// Duplicate delivery, unknown id, already read, or unknown frame.
    Unchanged,
}

impl Change {
    pub fn is_noop(&self) -> bool {
        matches!(self, Change::Unchanged | Change::MarkedAllRead { updated: 0 })
    }
}

/// Apply one event to the list in place.
pub fn apply(list: &mut Vec<NotificationRecord>, event: PushEvent) -> Change {
    match event {
        PushEvent::NewNotification { notification } => insert(list, notification),
        PushEvent::NotificationRead { notification_id } => mark_read(list, &notification_id),
        PushEvent::AllNotificationsRead => mark_all_read(list),
        PushEvent::Unknown => Change::Unchanged,
    }
}

/// Prepend `record` unless its id is already held.
pub fn insert(list: &mut Vec<NotificationRecord>, record: NotificationRecord) -> Change {
    if list.iter().any(|n| n.id == record.id) {
        return Change::Unchanged;
    }
    let id = record.id.clone();
    list.insert(0, record);
    Change::Inserted(id)
}

pub fn mark_read(list: &mut [NotificationRecord], id: &NotificationId) -> Change {
    match list.iter_mut().find(|n| &n.id == id) {
        Some(record) if !record.is_read => {
            record.is_read = true;
            Change::MarkedRead(id.clone())
        }
        _ => Change::Unchanged,
    }
}

pub fn mark_all_read(list: &mut [NotificationRecord]) -> Change {
    let mut updated = 0;
    for record in list.iter_mut().filter(|n| !n.is_read) {
        record.is_read = true;
        updated += 1;
    }
    Change::MarkedAllRead { updated }
}

/// Derived on demand; never stored alongside the list.
pub fn unread_count(list: &[NotificationRecord]) -> usize {
    list.iter().filter(|n| !n.is_read).count()
}
