//! Sent-view grouping.
//!
//! The sent listing holds one record per recipient. For display, records
//! that belong to the same broadcast are folded into a single entry keyed
//! by (minute bucket, title, message prefix). Records without a timestamp
//! all land in bucket 0 and therefore collapse into one group per text.
//!
//! This is a view transform only; the input slice is never modified.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::notification::{NotificationId, NotificationRecord};

/// Characters of the message that take part in the grouping key.
pub const MESSAGE_PREFIX_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub minute_bucket: i64,
    pub title: String,
    pub message_prefix: String,
}

impl GroupKey {
    pub fn for_record(record: &NotificationRecord) -> Self {
        Self {
            minute_bucket: minute_bucket(record.created_at),
            title: record.title.clone().unwrap_or_default(),
            message_prefix: record.message.chars().take(MESSAGE_PREFIX_LEN).collect(),
        }
    }
}

/// Timestamp truncated to the minute, in minutes since the epoch.
pub fn minute_bucket(created_at: Option<DateTime<Utc>>) -> i64 {
    created_at.map(|t| t.timestamp().div_euclid(60)).unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipient {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// One logical broadcast in the sent view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentGroup {
    pub title: Option<String>,
    pub message: String,
    pub course_title: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// Distinct recipients, deduplicated by email.
    pub recipients: Vec<Recipient>,
    pub recipient_count: usize,
    /// Underlying per-recipient ids, in input order.
    pub notification_ids: Vec<NotificationId>,
    pub read_count: usize,
}

/// Fold per-recipient sent records into broadcast groups.
///
/// Groups come out in order of first appearance, so a reverse-chronological
/// input yields reverse-chronological groups.
pub fn group_sent(records: &[NotificationRecord]) -> Vec<SentGroup> {
    let mut groups: Vec<SentGroup> = Vec::new();
    let mut seen_recipients: Vec<HashSet<String>> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();

    for record in records {
        let key = GroupKey::for_record(record);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(SentGroup {
                title: record.title.clone(),
                message: record.message.clone(),
                course_title: record.course_title.clone(),
                created_at: record.created_at,
                recipients: Vec::new(),
                recipient_count: 0,
                notification_ids: Vec::new(),
                read_count: 0,
            });
            seen_recipients.push(HashSet::new());
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.notification_ids.push(record.id.clone());
        if record.is_read {
            group.read_count += 1;
        }
        if let (Some(earliest), Some(t)) = (group.created_at, record.created_at) {
            if t < earliest {
                group.created_at = Some(t);
            }
        }

        if seen_recipients[slot].insert(recipient_key(record)) {
            group.recipients.push(Recipient {
                name: record.recipient_name.clone(),
                email: record.recipient_email.clone(),
                role: record.recipient_role.clone(),
            });
            group.recipient_count += 1;
        }
    }

    groups
}

// Email is the dedup key; records without one count individually by id.
fn recipient_key(record: &NotificationRecord) -> String {
    match record.recipient_email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => email.to_ascii_lowercase(),
        _ => format!("id:{}", record.id),
    }
}
