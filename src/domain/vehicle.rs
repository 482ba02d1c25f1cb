use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{HistoryError, ItemDefinition, ServiceEvent, ServiceEventId, TrackedItem};

pub type VehicleId = Uuid;

/// A vehicle and the maintenance items tracked on it. The vehicle owns its
/// items and their histories exclusively; `license_plate` is the unique
/// natural key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub license_plate: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub current_mileage: i64,
    pub last_updated: Option<NaiveDate>,
    /// Canonical mapping by item code. Wire shapes that carry a sequence
    /// instead are normalized into this map on ingest.
    pub items: BTreeMap<String, TrackedItem>,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn new(license_plate: impl Into<String>, current_mileage: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            license_plate: license_plate.into(),
            brand: None,
            model: None,
            current_mileage,
            last_updated: None,
            items: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn item(&self, code: &str) -> Option<&TrackedItem> {
        self.items.get(code)
    }

    /// Start tracking an item on this vehicle. Existing items keep their
    /// history and definition.
    pub fn track_item(&mut self, definition: ItemDefinition) -> &mut TrackedItem {
        self.items
            .entry(definition.code.clone())
            .or_insert_with(|| TrackedItem::new(definition))
    }

    /// Record a service event against an item. An untracked code is
    /// materialized from the supplied definition; without one the call
    /// fails. The odometer never moves backwards: `current_mileage` only
    /// advances when the event's mileage is greater.
    pub fn record_service(
        &mut self,
        code: &str,
        definition: Option<ItemDefinition>,
        event: ServiceEvent,
    ) -> Result<&TrackedItem, LedgerError> {
        if !self.items.contains_key(code) {
            let definition =
                definition.ok_or_else(|| LedgerError::ItemNotFound(code.to_string()))?;
            self.track_item(definition);
        }

        self.advance_mileage(event.mileage);
        self.last_updated = Some(event.date);

        let item = self
            .items
            .get_mut(code)
            .ok_or_else(|| LedgerError::ItemNotFound(code.to_string()))?;
        item.record(event);
        Ok(item)
    }

    /// Remove an event from an item's history. `next_due_mileage` is not
    /// recomputed unless `recompute` is set.
    pub fn delete_service_event(
        &mut self,
        code: &str,
        event_id: ServiceEventId,
        recompute: bool,
    ) -> Result<ServiceEvent, LedgerError> {
        let item = self
            .items
            .get_mut(code)
            .ok_or_else(|| LedgerError::ItemNotFound(code.to_string()))?;
        let removed = item.delete_event(event_id)?;
        if recompute {
            item.recompute_next_due();
        }
        Ok(removed)
    }

    /// Advance the odometer reading. Lower values are ignored: recorded
    /// mileage is monotonic.
    pub fn advance_mileage(&mut self, mileage: i64) {
        if mileage > self.current_mileage {
            self.current_mileage = mileage;
        }
    }

    pub fn service_count(&self) -> usize {
        self.items.values().map(|item| item.history.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Item code is not tracked on the vehicle and no definition was
    /// supplied to materialize it
    ItemNotFound(String),
    ServiceEventNotFound(ServiceEventId),
}

impl From<HistoryError> for LedgerError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::EventNotFound(id) => LedgerError::ServiceEventNotFound(id),
        }
    }
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::ItemNotFound(code) => {
                write!(f, "Maintenance item not tracked: {}", code)
            }
            LedgerError::ServiceEventNotFound(id) => {
                write!(f, "Service event not found: {}", id)
            }
        }
    }
}

impl std::error::Error for LedgerError {}
