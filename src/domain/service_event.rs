use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ServiceEventId = Uuid;

/// One recorded instance of servicing an item. Events are append-only and
/// never mutated after creation - corrections are made by removing the event
/// from the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEvent {
    pub id: ServiceEventId,
    /// When the service happened in the real world
    pub date: NaiveDate,
    /// Odometer reading at service time
    pub mileage: i64,
    /// Cost in whole currency units; absent costs are recorded as 0
    pub cost: i64,
    /// Workshop or garage where the service was done
    pub location: Option<String>,
    pub technician: Option<String>,
    pub note: Option<String>,
    /// When we recorded this event in the system
    pub recorded_at: DateTime<Utc>,
}

impl ServiceEvent {
    pub fn new(date: NaiveDate, mileage: i64) -> Self {
        assert!(mileage >= 0, "Service mileage cannot be negative");
        Self {
            id: Uuid::new_v4(),
            date,
            mileage,
            cost: 0,
            location: None,
            technician: None,
            note: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_cost(mut self, cost: i64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_technician(mut self, technician: impl Into<String>) -> Self {
        self.technician = Some(technician.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
