use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::ServiceEvent;

/// Remaining distance at or below which a mileage-scheduled item is "due soon".
pub const DUE_SOON_WINDOW_KM: i64 = 1000;

/// Remaining distance at or below which an item counts as upcoming in the
/// vehicle statistics. Deliberately wider than the due-soon window.
pub const UPCOMING_WINDOW_KM: i64 = 2000;

/// Review interval for time-scheduled items (the battery).
pub const BATTERY_REVIEW_YEARS: u32 = 2;

/// Trailing window for the "recent services" statistic.
pub const RECENT_WINDOW_MONTHS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueStatus {
    /// No due threshold is known for the item
    Unknown,
    Overdue,
    DueSoon,
    Normal,
}

impl DueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DueStatus::Unknown => "unknown",
            DueStatus::Overdue => "overdue",
            DueStatus::DueSoon => "due_soon",
            DueStatus::Normal => "normal",
        }
    }
}

impl std::fmt::Display for DueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a mileage-scheduled item against the current odometer reading.
pub fn due_status(next_due_mileage: Option<i64>, current_mileage: i64) -> DueStatus {
    let Some(next_due) = next_due_mileage else {
        return DueStatus::Unknown;
    };

    let remaining = next_due - current_mileage;
    if remaining <= 0 {
        DueStatus::Overdue
    } else if remaining <= DUE_SOON_WINDOW_KM {
        DueStatus::DueSoon
    } else {
        DueStatus::Normal
    }
}

/// The next due threshold after a service at the given mileage.
/// Items without a positive interval never carry a mileage-based due value.
pub fn next_due_mileage(service_mileage: i64, interval_km: Option<i64>) -> Option<i64> {
    interval_km
        .filter(|km| *km > 0)
        .map(|km| service_mileage + km)
}

/// True when the remaining distance to the due threshold is within the
/// upcoming window (0, UPCOMING_WINDOW_KM].
pub fn is_upcoming(next_due_mileage: Option<i64>, current_mileage: i64) -> bool {
    match next_due_mileage {
        Some(next_due) => {
            let remaining = next_due - current_mileage;
            remaining > 0 && remaining <= UPCOMING_WINDOW_KM
        }
        None => false,
    }
}

/// The chronologically most recent event. Ordering is established here by
/// `date`, not by insertion order; ties resolve to the later-inserted record.
pub fn last_service(history: &[ServiceEvent]) -> Option<&ServiceEvent> {
    history.iter().max_by_key(|event| event.date)
}

/// Next due date for a time-scheduled item: last service date plus the
/// interval. None when no service has ever been recorded.
pub fn time_based_due_date(history: &[ServiceEvent], interval_years: u32) -> Option<NaiveDate> {
    let last = last_service(history)?;
    last.date.checked_add_months(Months::new(interval_years * 12))
}

/// Whether a time-scheduled item is due at the reference date.
pub fn is_due_at(history: &[ServiceEvent], interval_years: u32, reference: NaiveDate) -> bool {
    match time_based_due_date(history, interval_years) {
        Some(due) => reference >= due,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_due_status_unknown_without_threshold() {
        assert_eq!(due_status(None, 50000), DueStatus::Unknown);
    }

    #[test]
    fn test_due_status_boundaries() {
        // remaining exactly 1000 -> due_soon
        assert_eq!(due_status(Some(51000), 50000), DueStatus::DueSoon);
        // remaining 1001 -> normal
        assert_eq!(due_status(Some(51001), 50000), DueStatus::Normal);
        // remaining 0 -> overdue
        assert_eq!(due_status(Some(50000), 50000), DueStatus::Overdue);
        // negative remaining -> overdue
        assert_eq!(due_status(Some(49000), 50000), DueStatus::Overdue);
        assert_eq!(due_status(Some(50001), 50000), DueStatus::DueSoon);
    }

    #[test]
    fn test_next_due_mileage() {
        assert_eq!(next_due_mileage(100200, Some(7500)), Some(107700));
        assert_eq!(next_due_mileage(100200, Some(0)), None);
        assert_eq!(next_due_mileage(100200, None), None);
    }

    #[test]
    fn test_upcoming_boundaries() {
        // gap exactly 2000 -> counted
        assert!(is_upcoming(Some(52000), 50000));
        // gap 2001 -> not counted
        assert!(!is_upcoming(Some(52001), 50000));
        // gap 0 -> not counted
        assert!(!is_upcoming(Some(50000), 50000));
        // negative gap -> not counted
        assert!(!is_upcoming(Some(49000), 50000));
        assert!(!is_upcoming(None, 50000));
    }

    #[test]
    fn test_last_service_by_date_not_insertion() {
        let older = ServiceEvent::new(date("2023-05-01"), 40000);
        let newer = ServiceEvent::new(date("2024-02-01"), 47000);
        // Inserted out of chronological order
        let history = vec![newer.clone(), older];

        assert_eq!(last_service(&history).unwrap().id, newer.id);
    }

    #[test]
    fn test_last_service_tie_prefers_later_inserted() {
        let first = ServiceEvent::new(date("2024-02-01"), 47000);
        let second = ServiceEvent::new(date("2024-02-01"), 47200);
        let history = vec![first, second.clone()];

        assert_eq!(last_service(&history).unwrap().id, second.id);
    }

    #[test]
    fn test_time_based_due_date() {
        let history = vec![ServiceEvent::new(date("2023-06-01"), 45000)];
        let due = time_based_due_date(&history, BATTERY_REVIEW_YEARS).unwrap();
        assert_eq!(due, date("2025-06-01"));
    }

    #[test]
    fn test_time_based_due_date_empty_history() {
        assert_eq!(time_based_due_date(&[], BATTERY_REVIEW_YEARS), None);
    }

    #[test]
    fn test_is_due_at() {
        let history = vec![ServiceEvent::new(date("2023-06-01"), 45000)];
        assert!(is_due_at(&history, 2, date("2025-07-01")));
        assert!(is_due_at(&history, 2, date("2025-06-01")));
        assert!(!is_due_at(&history, 2, date("2025-05-01")));
        assert!(!is_due_at(&[], 2, date("2025-07-01")));
    }
}
