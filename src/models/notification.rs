use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque notification identifier.
///
/// The backend emits integer primary keys, but nothing on the client relies
/// on that: ids are compared by their canonical string form, so a frame that
/// carries `"42"` and a listing that carries `42` refer to the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<u64> for NotificationId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<i32> for NotificationId {
    fn from(id: i32) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for NotificationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::str::FromStr for NotificationId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().to_string()))
    }
}

impl Serialize for NotificationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Numeric only when the text is the number's canonical form, so "007" stays a string.
        match self.0.parse::<u64>() {
            Ok(n) if n.to_string() == self.0 => serializer.serialize_u64(n),
            _ => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for NotificationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(LenientText::deserialize(deserializer)?.into_string()))
    }
}

/// A JSON scalar the backend may send as either a number or a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientText {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl LenientText {
    fn into_string(self) -> String {
        match self {
            LenientText::Int(n) => n.to_string(),
            LenientText::UInt(n) => n.to_string(),
            LenientText::Float(n) => n.to_string(),
            LenientText::Text(s) => s,
        }
    }
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<LenientText>::deserialize(deserializer)?.map(LenientText::into_string))
}

/// One notification as seen by a single recipient.
///
/// The same shape is used for the inbox listing, the sent listing (where
/// the `recipient_*` fields are populated) and `new_notification` push frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub sender: Option<String>,
    #[serde(default)]
    pub course_title: Option<String>,
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub course_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_read: bool,

    // sent view only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_role: Option<String>,
}

impl NotificationRecord {
    /// A bare unread record; mostly useful for tests and local composition.
    pub fn new(id: impl Into<NotificationId>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            message: message.into(),
            sender: None,
            course_title: None,
            course_code: None,
            course_id: None,
            created_at: None,
            is_read: false,
            recipient_name: None,
            recipient_email: None,
            recipient_role: None,
        }
    }
}

/// Which direction of notifications a view displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Inbox,
    Sent,
}

impl Scope {
    /// Listing path relative to the notifications API root.
    pub fn list_path(self) -> &'static str {
        match self {
            Scope::Inbox => "",
            Scope::Sent => "sent/",
        }
    }

    /// Only the inbox receives live push events.
    pub fn is_live(self) -> bool {
        matches!(self, Scope::Inbox)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Inbox => f.write_str("inbox"),
            Scope::Sent => f.write_str("sent"),
        }
    }
}

/// The inbox page's "all / unread" toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadFilter {
    #[default]
    All,
    Unread,
}

impl ReadFilter {
    pub fn accepts(self, record: &NotificationRecord) -> bool {
        match self {
            ReadFilter::All => true,
            ReadFilter::Unread => !record.is_read,
        }
    }
}
