use serde::{Deserialize, Serialize};

use super::notification::{NotificationId, NotificationRecord};

/// One push frame, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    NewNotification { notification: NotificationRecord },
    NotificationRead { notification_id: NotificationId },
    AllNotificationsRead,
    /// Any frame type this client does not understand.
    #[serde(other)]
    Unknown,
}

impl PushEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PushEvent::NewNotification { .. } => "new_notification",
            PushEvent::NotificationRead { .. } => "notification_read",
            PushEvent::AllNotificationsRead => "all_notifications_read",
            PushEvent::Unknown => "unknown",
        }
    }
}
