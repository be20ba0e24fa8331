//! Display helpers shared by every screen: status badges and date formatting.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTone {
    Success,
    Warning,
    Danger,
    Info,
    Neutral,
}

/// Badge colour for a serialized status value such as `in_progress`.
#[must_use]
pub fn badge_tone(status: &str) -> BadgeTone {
    match status.trim().to_ascii_lowercase().as_str() {
        "active" | "completed" | "passed" | "valid" | "accepted" | "read" => BadgeTone::Success,
        "maintenance" | "pending" | "needs_attention" | "on_leave" | "scheduled" | "assigned" => {
            BadgeTone::Warning
        }
        "failed" | "expired" | "revoked" | "cancelled" | "out_of_service" | "suspended" | "rejected" => {
            BadgeTone::Danger
        }
        "in_use" | "in_progress" | "open" | "unread" | "planned" => BadgeTone::Info,
        _ => BadgeTone::Neutral,
    }
}

/// `in_progress` becomes `In Progress`.
#[must_use]
pub fn humanize_status(status: &str) -> String {
    status
        .split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

#[must_use]
pub fn format_datetime(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_badge_tones() {
        assert_eq!(badge_tone("active"), BadgeTone::Success);
        assert_eq!(badge_tone("needs_attention"), BadgeTone::Warning);
        assert_eq!(badge_tone("out_of_service"), BadgeTone::Danger);
        assert_eq!(badge_tone("In_Progress"), BadgeTone::Info);
        assert_eq!(badge_tone("draft"), BadgeTone::Neutral);
    }

    #[test]
    fn test_humanize_status() {
        assert_eq!(humanize_status("in_progress"), "In Progress");
        assert_eq!(humanize_status("OUT_OF_SERVICE"), "Out Of Service");
        assert_eq!(humanize_status(""), "");
    }

    #[test]
    fn test_date_formats() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert_eq!(format_date(date), "Mar 5, 2025");
        let at = Utc.with_ymd_and_hms(2025, 3, 5, 14, 7, 0).unwrap();
        assert_eq!(format_datetime(at), "Mar 5, 2025 14:07");
    }
}
