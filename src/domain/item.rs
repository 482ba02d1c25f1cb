use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    DueStatus, ItemDefinition, ServiceEvent, ServiceEventId, due_status, is_due_at, last_service,
    next_due_mileage, time_based_due_date,
};

/// A maintenance item tracked on a vehicle: its static definition, the
/// derived next-due threshold and the append-only service history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedItem {
    pub definition: ItemDefinition,
    /// Derived: mileage of the most recent service plus the interval.
    /// Always None for items that are not mileage-scheduled.
    pub next_due_mileage: Option<i64>,
    /// Chronological ordering is established at read time by sorting on
    /// date; this sequence keeps insertion order.
    pub history: Vec<ServiceEvent>,
}

impl TrackedItem {
    pub fn new(definition: ItemDefinition) -> Self {
        Self {
            definition,
            next_due_mileage: None,
            history: Vec::new(),
        }
    }

    /// Append a service event and recompute the next-due threshold from it.
    /// Items without a mileage interval get their threshold cleared; their
    /// due status derives from time elapsed since the last service instead.
    pub fn record(&mut self, event: ServiceEvent) {
        self.next_due_mileage =
            next_due_mileage(event.mileage, self.definition.mileage_interval());
        self.history.push(event);
    }

    /// Remove an event from the history. The next-due threshold is left
    /// untouched even when the removed event produced it; callers that want
    /// it rebuilt run [`TrackedItem::recompute_next_due`] explicitly.
    pub fn delete_event(&mut self, id: ServiceEventId) -> Result<ServiceEvent, HistoryError> {
        let index = self
            .history
            .iter()
            .position(|event| event.id == id)
            .ok_or(HistoryError::EventNotFound(id))?;
        Ok(self.history.remove(index))
    }

    /// Rebuild the next-due threshold from the most recent remaining event.
    pub fn recompute_next_due(&mut self) {
        self.next_due_mileage = last_service(&self.history)
            .and_then(|event| next_due_mileage(event.mileage, self.definition.mileage_interval()));
    }

    pub fn last_service(&self) -> Option<&ServiceEvent> {
        last_service(&self.history)
    }

    pub fn due_status(&self, current_mileage: i64) -> DueStatus {
        due_status(self.next_due_mileage, current_mileage)
    }

    pub fn time_based_due_date(&self, interval_years: u32) -> Option<NaiveDate> {
        time_based_due_date(&self.history, interval_years)
    }

    pub fn is_due_at(&self, reference: NaiveDate, interval_years: u32) -> bool {
        is_due_at(&self.history, interval_years, reference)
    }

    pub fn total_cost(&self) -> i64 {
        self.history.iter().map(|event| event.cost).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    EventNotFound(ServiceEventId),
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryError::EventNotFound(id) => {
                write!(f, "Service event not found: {}", id)
            }
        }
    }
}

impl std::error::Error for HistoryError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Catalog, Category};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn engine_oil() -> TrackedItem {
        TrackedItem::new(Catalog::builtin().definition_for("engine_oil"))
    }

    fn battery() -> TrackedItem {
        TrackedItem::new(Catalog::builtin().definition_for("battery"))
    }

    #[test]
    fn test_record_sets_next_due_from_interval() {
        let mut item = engine_oil();
        item.record(ServiceEvent::new(date("2024-01-10"), 100200));

        assert_eq!(item.next_due_mileage, Some(107700));
        assert_eq!(item.history.len(), 1);
    }

    #[test]
    fn test_record_never_sets_due_without_interval() {
        let mut item = battery();
        item.record(ServiceEvent::new(date("2024-01-10"), 100200));

        assert_eq!(item.next_due_mileage, None);
    }

    #[test]
    fn test_record_clears_stale_threshold_on_non_mileage_item() {
        let mut item = battery();
        // A stale value could arrive from a persisted record
        item.next_due_mileage = Some(123456);
        item.record(ServiceEvent::new(date("2024-01-10"), 100200));

        assert_eq!(item.next_due_mileage, None);
    }

    #[test]
    fn test_record_appends_without_reordering() {
        let mut item = engine_oil();
        let newer = ServiceEvent::new(date("2024-06-01"), 107000);
        let older = ServiceEvent::new(date("2024-01-10"), 100200);
        item.record(newer.clone());
        item.record(older.clone());

        // History keeps insertion order
        assert_eq!(item.history[0].id, newer.id);
        assert_eq!(item.history[1].id, older.id);
        // But the chronologically last service wins reads
        assert_eq!(item.last_service().unwrap().id, newer.id);
        // next_due follows the appended event, not the chronological max
        assert_eq!(item.next_due_mileage, Some(100200 + 7500));
    }

    #[test]
    fn test_delete_event_missing_id_is_error() {
        let mut item = engine_oil();
        item.record(ServiceEvent::new(date("2024-01-10"), 100200));
        let before = item.clone();

        let missing = uuid::Uuid::new_v4();
        let result = item.delete_event(missing);

        assert_eq!(result, Err(HistoryError::EventNotFound(missing)));
        assert_eq!(item.history.len(), before.history.len());
        assert_eq!(item.next_due_mileage, before.next_due_mileage);
    }

    #[test]
    fn test_delete_event_leaves_threshold_stale() {
        let mut item = engine_oil();
        item.record(ServiceEvent::new(date("2024-01-10"), 100200));
        let latest = ServiceEvent::new(date("2024-06-01"), 107000);
        item.record(latest.clone());
        assert_eq!(item.next_due_mileage, Some(114500));

        item.delete_event(latest.id).unwrap();

        // Stale by contract until a recompute pass is requested
        assert_eq!(item.next_due_mileage, Some(114500));
    }

    #[test]
    fn test_recompute_next_due_after_deletion() {
        let mut item = engine_oil();
        item.record(ServiceEvent::new(date("2024-01-10"), 100200));
        let latest = ServiceEvent::new(date("2024-06-01"), 107000);
        item.record(latest.clone());

        item.delete_event(latest.id).unwrap();
        item.recompute_next_due();

        assert_eq!(item.next_due_mileage, Some(107700));
    }

    #[test]
    fn test_recompute_next_due_empty_history() {
        let mut item = engine_oil();
        item.record(ServiceEvent::new(date("2024-01-10"), 100200));
        let id = item.history[0].id;
        item.delete_event(id).unwrap();
        item.recompute_next_due();

        assert_eq!(item.next_due_mileage, None);
    }

    #[test]
    fn test_due_status_worked_example() {
        // Engine oil at interval 7500, serviced at 100200
        let mut item = engine_oil();
        item.record(ServiceEvent::new(date("2024-01-10"), 100200));

        assert_eq!(item.due_status(106800), DueStatus::DueSoon); // 900 km left
        assert_eq!(item.due_status(107700), DueStatus::Overdue);
        assert_eq!(item.due_status(100500), DueStatus::Normal);
    }

    #[test]
    fn test_battery_time_based_due() {
        let mut item = battery();
        item.record(ServiceEvent::new(date("2023-06-01"), 45000));

        assert_eq!(item.time_based_due_date(2), Some(date("2025-06-01")));
        assert!(item.is_due_at(date("2025-07-01"), 2));
        assert!(!item.is_due_at(date("2025-05-01"), 2));
        // Mileage status stays unknown for time-scheduled items
        assert_eq!(item.due_status(50000), DueStatus::Unknown);
    }

    #[test]
    fn test_total_cost_defaults_absent_to_zero() {
        let mut item = engine_oil();
        item.record(ServiceEvent::new(date("2024-01-10"), 100200).with_cost(950));
        item.record(ServiceEvent::new(date("2024-06-01"), 107000));

        assert_eq!(item.total_cost(), 950);
    }

    #[test]
    fn test_custom_definition() {
        let def = ItemDefinition::new("wiper_blades", "Wiper blades", Category::Uncategorized, None);
        let mut item = TrackedItem::new(def);
        item.record(ServiceEvent::new(date("2024-01-10"), 100200));

        assert_eq!(item.next_due_mileage, None);
    }
}
