use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{
    BATTERY_REVIEW_YEARS, Category, DueStatus, RECENT_WINDOW_MONTHS, ServiceEvent, Vehicle,
    is_upcoming,
};

/// Aggregate statistics for one vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleStats {
    /// Sum of event costs across all tracked items (absent costs count 0)
    pub total_cost: i64,
    /// Number of recorded service events
    pub service_count: usize,
    /// Tracked items whose gap to the due threshold is within the upcoming
    /// window (0, 2000] km
    pub upcoming_count: usize,
    /// Events within the trailing recent window, merged with item metadata
    pub recent_services: Vec<RecentService>,
}

/// A service event paired with the metadata of the item it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentService {
    pub item_code: String,
    pub display_name: String,
    pub category: Category,
    pub event: ServiceEvent,
}

/// Per-item due summary, the shape consumed by due listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueEntry {
    pub item_code: String,
    pub display_name: String,
    pub category: Category,
    pub next_due_mileage: Option<i64>,
    /// Distance left to the threshold; negative when past it
    pub remaining_km: Option<i64>,
    /// Next due date for time-scheduled items
    pub due_date: Option<NaiveDate>,
    pub status: DueStatus,
}

/// Compute the aggregate statistics for a vehicle as of `today`.
pub fn aggregate_stats(vehicle: &Vehicle, today: NaiveDate) -> VehicleStats {
    let recent_cutoff = today
        .checked_sub_months(Months::new(RECENT_WINDOW_MONTHS))
        .unwrap_or(NaiveDate::MIN);

    let mut stats = VehicleStats {
        total_cost: 0,
        service_count: 0,
        upcoming_count: 0,
        recent_services: Vec::new(),
    };

    for (code, item) in &vehicle.items {
        for event in &item.history {
            stats.total_cost += event.cost;
            stats.service_count += 1;

            if event.date > recent_cutoff {
                stats.recent_services.push(RecentService {
                    item_code: code.clone(),
                    display_name: item.definition.display_name.clone(),
                    category: item.definition.category,
                    event: event.clone(),
                });
            }
        }

        if is_upcoming(item.next_due_mileage, vehicle.current_mileage) {
            stats.upcoming_count += 1;
        }
    }

    // Newest first for display
    stats
        .recent_services
        .sort_by(|a, b| b.event.date.cmp(&a.event.date));

    stats
}

/// Due summary for every tracked item, most urgent first. Mileage-scheduled
/// items classify against the odometer; time-scheduled items against the
/// elapsed time since their last service.
pub fn due_report(vehicle: &Vehicle, today: NaiveDate) -> Vec<DueEntry> {
    let mut entries: Vec<DueEntry> = vehicle
        .items
        .iter()
        .map(|(code, item)| {
            if item.definition.is_mileage_scheduled() {
                DueEntry {
                    item_code: code.clone(),
                    display_name: item.definition.display_name.clone(),
                    category: item.definition.category,
                    next_due_mileage: item.next_due_mileage,
                    remaining_km: item
                        .next_due_mileage
                        .map(|due| due - vehicle.current_mileage),
                    due_date: None,
                    status: item.due_status(vehicle.current_mileage),
                }
            } else {
                let due_date = item.time_based_due_date(BATTERY_REVIEW_YEARS);
                let status = match due_date {
                    None => DueStatus::Unknown,
                    Some(due) if today >= due => DueStatus::Overdue,
                    Some(_) => DueStatus::Normal,
                };
                DueEntry {
                    item_code: code.clone(),
                    display_name: item.definition.display_name.clone(),
                    category: item.definition.category,
                    next_due_mileage: None,
                    remaining_km: None,
                    due_date,
                    status,
                }
            }
        })
        .collect();

    entries.sort_by_key(|entry| {
        let severity = match entry.status {
            DueStatus::Overdue => 0,
            DueStatus::DueSoon => 1,
            DueStatus::Normal => 2,
            DueStatus::Unknown => 3,
        };
        (severity, entry.remaining_km.unwrap_or(i64::MAX))
    });

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Catalog;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn serviced_vehicle() -> Vehicle {
        let catalog = Catalog::builtin();
        let mut v = Vehicle::new("ABC-1234", 100000);
        v.record_service(
            "engine_oil",
            Some(catalog.definition_for("engine_oil")),
            ServiceEvent::new(date("2024-05-10"), 100200).with_cost(950),
        )
        .unwrap();
        v.record_service(
            "battery",
            Some(catalog.definition_for("battery")),
            ServiceEvent::new(date("2023-06-01"), 95000).with_cost(2400),
        )
        .unwrap();
        v
    }

    #[test]
    fn test_total_cost_and_service_count() {
        let v = serviced_vehicle();
        let stats = aggregate_stats(&v, date("2024-06-01"));

        assert_eq!(stats.total_cost, 3350);
        assert_eq!(stats.service_count, 2);
    }

    #[test]
    fn test_recent_services_window() {
        let v = serviced_vehicle();
        let stats = aggregate_stats(&v, date("2024-06-01"));

        // Only the May 2024 oil change falls inside the trailing 3 months
        assert_eq!(stats.recent_services.len(), 1);
        assert_eq!(stats.recent_services[0].item_code, "engine_oil");
        assert_eq!(stats.recent_services[0].category, Category::Engine);
    }

    #[test]
    fn test_recent_services_excludes_cutoff_day() {
        let v = serviced_vehicle();
        // Exactly 3 months after the oil change: the event no longer counts
        let stats = aggregate_stats(&v, date("2024-08-10"));
        assert!(stats.recent_services.is_empty());
    }

    #[test]
    fn test_upcoming_count_boundaries() {
        let catalog = Catalog::builtin();
        let mut v = Vehicle::new("DEF-5678", 0);
        v.record_service(
            "engine_oil",
            Some(catalog.definition_for("engine_oil")),
            ServiceEvent::new(date("2024-01-01"), 1000),
        )
        .unwrap();
        // next due at 8500

        v.current_mileage = 6500; // gap exactly 2000
        assert_eq!(aggregate_stats(&v, date("2024-06-01")).upcoming_count, 1);

        v.current_mileage = 6499; // gap 2001
        assert_eq!(aggregate_stats(&v, date("2024-06-01")).upcoming_count, 0);

        v.current_mileage = 8500; // gap 0
        assert_eq!(aggregate_stats(&v, date("2024-06-01")).upcoming_count, 0);

        v.current_mileage = 9000; // past due
        assert_eq!(aggregate_stats(&v, date("2024-06-01")).upcoming_count, 0);
    }

    #[test]
    fn test_upcoming_is_wider_than_due_soon() {
        let catalog = Catalog::builtin();
        let mut v = Vehicle::new("DEF-5678", 0);
        v.record_service(
            "engine_oil",
            Some(catalog.definition_for("engine_oil")),
            ServiceEvent::new(date("2024-01-01"), 1000),
        )
        .unwrap();
        v.current_mileage = 7000; // 1500 km left: upcoming but not due_soon

        let stats = aggregate_stats(&v, date("2024-06-01"));
        assert_eq!(stats.upcoming_count, 1);
        assert_eq!(
            v.item("engine_oil").unwrap().due_status(v.current_mileage),
            DueStatus::Normal
        );
    }

    #[test]
    fn test_due_report_orders_most_urgent_first() {
        let catalog = Catalog::builtin();
        let mut v = Vehicle::new("DEF-5678", 0);
        v.record_service(
            "engine_oil",
            Some(catalog.definition_for("engine_oil")),
            ServiceEvent::new(date("2024-01-01"), 1000), // due 8500
        )
        .unwrap();
        v.record_service(
            "tires",
            Some(catalog.definition_for("tires")),
            ServiceEvent::new(date("2024-01-01"), 1000), // due 11000
        )
        .unwrap();
        v.current_mileage = 9000; // oil overdue, tires normal

        let report = due_report(&v, date("2024-06-01"));
        assert_eq!(report[0].item_code, "engine_oil");
        assert_eq!(report[0].status, DueStatus::Overdue);
        assert_eq!(report[0].remaining_km, Some(-500));
        assert_eq!(report.last().unwrap().item_code, "tires");
    }

    #[test]
    fn test_due_report_time_scheduled_item() {
        let v = serviced_vehicle();

        let report = due_report(&v, date("2025-07-01"));
        let battery = report
            .iter()
            .find(|entry| entry.item_code == "battery")
            .unwrap();
        assert_eq!(battery.next_due_mileage, None);
        assert_eq!(battery.due_date, Some(date("2025-06-01")));
        assert_eq!(battery.status, DueStatus::Overdue);

        let report = due_report(&v, date("2025-05-01"));
        let battery = report
            .iter()
            .find(|entry| entry.item_code == "battery")
            .unwrap();
        assert_eq!(battery.status, DueStatus::Normal);
    }

    #[test]
    fn test_due_report_unknown_without_history() {
        let catalog = Catalog::builtin();
        let mut v = Vehicle::new("DEF-5678", 50000);
        v.track_item(catalog.definition_for("battery"));
        v.track_item(catalog.definition_for("engine_oil"));

        let report = due_report(&v, date("2024-06-01"));
        assert!(report.iter().all(|entry| entry.status == DueStatus::Unknown));
    }
}
