//! Presentation helpers shared by the inbox listing and the CLI.

use chrono::{DateTime, Utc};

use crate::models::notification::NotificationRecord;

/// Course title the backend uses for "no course".
pub const GENERAL_COURSE: &str = "General";
/// Title the backend falls back to when the sender gave none.
pub const PLACEHOLDER_TITLE: &str = "Notification";

const TITLE_PREVIEW_CHARS: usize = 50;

pub fn sender_display(record: &NotificationRecord) -> &str {
    match record.sender.as_deref() {
        Some(s) if !s.is_empty() => s,
        _ => "System",
    }
}

pub fn course_display(record: &NotificationRecord) -> Option<&str> {
    record
        .course_title
        .as_deref()
        .filter(|c| !c.is_empty() && *c != GENERAL_COURSE)
}

pub fn display_title(record: &NotificationRecord) -> String {
    if let Some(title) = record.title.as_deref() {
        if !title.is_empty() && title != PLACEHOLDER_TITLE {
            return title.to_string();
        }
    }

    if let Some(course) = course_display(record) {
        return format!("{} Update", course);
    }

    if !record.message.is_empty() {
        if record.message.chars().count() > TITLE_PREVIEW_CHARS {
            let preview: String = record.message.chars().take(TITLE_PREVIEW_CHARS).collect();
            return format!("{}...", preview);
        }
        return record.message.clone();
    }

    "New Notification".to_string()
}

/// Short relative age, e.g. "5m ago"; older than a week prints the date.
pub fn relative_time(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = created_at else {
        return String::new();
    };

    let elapsed = now.signed_duration_since(at);
    let mins = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if mins < 1 {
        "Just now".to_string()
    } else if mins < 60 {
        format!("{}m ago", mins)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        at.format("%b %-d, %I:%M %p").to_string()
    }
}

/// Unread badge text; hidden at zero and capped at "9+".
pub fn badge_label(unread: usize) -> Option<String> {
    match unread {
        0 => None,
        1..=9 => Some(unread.to_string()),
        _ => Some("9+".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record() -> NotificationRecord {
        NotificationRecord::new(1, "")
    }

    #[test]
    fn test_sender_falls_back_to_system() {
        let mut r = record();
        assert_eq!(sender_display(&r), "System");
        r.sender = Some("Ms. Okafor".into());
        assert_eq!(sender_display(&r), "Ms. Okafor");
    }

    #[test]
    fn test_general_course_is_hidden() {
        let mut r = record();
        r.course_title = Some("General".into());
        assert_eq!(course_display(&r), None);
        r.course_title = Some("Chemistry".into());
        assert_eq!(course_display(&r), Some("Chemistry"));
    }

    #[test]
    fn test_display_title_fallback_chain() {
        let mut r = record();
        assert_eq!(display_title(&r), "New Notification");

        r.message = "x".repeat(60);
        assert_eq!(display_title(&r), format!("{}...", "x".repeat(50)));

        r.message = "Short note".into();
        assert_eq!(display_title(&r), "Short note");

        r.course_title = Some("Biology".into());
        r.title = Some("Notification".into());
        assert_eq!(display_title(&r), "Biology Update");

        r.title = Some("Field trip".into());
        assert_eq!(display_title(&r), "Field trip");
    }

    #[test]
    fn test_relative_time_ranges() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 15, 30, 0).unwrap();
        assert_eq!(relative_time(None, now), "");
        assert_eq!(relative_time(Some(now - Duration::seconds(20)), now), "Just now");
        assert_eq!(relative_time(Some(now - Duration::minutes(5)), now), "5m ago");
        assert_eq!(relative_time(Some(now - Duration::hours(3)), now), "3h ago");
        assert_eq!(relative_time(Some(now - Duration::days(2)), now), "2d ago");

        let old = Utc.with_ymd_and_hms(2025, 2, 1, 9, 5, 0).unwrap();
        assert_eq!(relative_time(Some(old), now), "Feb 1, 09:05 AM");
    }

    #[test]
    fn test_badge_label() {
        assert_eq!(badge_label(0), None);
        assert_eq!(badge_label(4).as_deref(), Some("4"));
        assert_eq!(badge_label(9).as_deref(), Some("9"));
        assert_eq!(badge_label(12).as_deref(), Some("9+"));
    }
}
