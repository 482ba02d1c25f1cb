use chrono::NaiveDate;

use crate::domain::{
    Catalog, DueEntry, DueStatus, ItemDefinition, ServiceEvent, ServiceEventId, TrackedItem,
    Vehicle, VehicleStats, aggregate_stats, due_report,
};
use crate::storage::Repository;

use super::AppError;

/// Application service providing high-level operations for the maintenance
/// ledger. This is the primary interface for any client (CLI, API, TUI).
pub struct GarageService {
    repo: Repository,
    catalog: Catalog,
}

/// Input for recording a service event. Optional fields default at
/// construction (cost -> 0); a missing mileage is a validation error.
#[derive(Debug, Clone, Default)]
pub struct ServiceRequest {
    /// Service date; defaults to the caller-supplied "today"
    pub date: Option<NaiveDate>,
    pub mileage: Option<i64>,
    pub cost: Option<i64>,
    pub location: Option<String>,
    pub technician: Option<String>,
    pub note: Option<String>,
    /// Caller-supplied definition for a code the vehicle does not track
    /// yet. When absent, the static catalog resolves one.
    pub definition: Option<ItemDefinition>,
}

/// Result of recording a service event
pub struct ServiceOutcome {
    pub vehicle: Vehicle,
    pub item_code: String,
    pub event: ServiceEvent,
    pub next_due_mileage: Option<i64>,
    pub status: DueStatus,
    /// True when this was the first-ever service of the item code and a
    /// tracked item was materialized for it
    pub materialized: bool,
}

/// A service event paired with the item it was recorded against
pub struct HistoryEntry {
    pub item_code: String,
    pub display_name: String,
    pub event: ServiceEvent,
}

impl GarageService {
    /// Create a new service with the given repository and the built-in
    /// catalog.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            catalog: Catalog::builtin(),
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // ========================
    // Vehicle operations
    // ========================

    /// Register a new vehicle. The license plate is the unique natural key.
    pub async fn register_vehicle(
        &self,
        license_plate: String,
        current_mileage: i64,
        brand: Option<String>,
        model: Option<String>,
    ) -> Result<Vehicle, AppError> {
        if current_mileage < 0 {
            return Err(AppError::Validation(
                "Mileage cannot be negative".to_string(),
            ));
        }
        if self
            .repo
            .get_vehicle_by_plate(&license_plate)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Vehicle already registered: {}",
                license_plate
            )));
        }

        let mut vehicle = Vehicle::new(license_plate, current_mileage);
        if let Some(brand) = brand {
            vehicle = vehicle.with_brand(brand);
        }
        if let Some(model) = model {
            vehicle = vehicle.with_model(model);
        }

        self.repo.save_vehicle(&vehicle).await?;
        Ok(vehicle)
    }

    /// Get a vehicle by license plate.
    pub async fn get_vehicle(&self, plate: &str) -> Result<Vehicle, AppError> {
        self.repo
            .get_vehicle_by_plate(plate)
            .await?
            .ok_or_else(|| AppError::VehicleNotFound(plate.to_string()))
    }

    /// List all vehicles.
    pub async fn list_vehicles(&self) -> Result<Vec<Vehicle>, AppError> {
        Ok(self.repo.list_vehicles().await?)
    }

    /// Delete a vehicle and its entire maintenance history.
    pub async fn delete_vehicle(&self, plate: &str) -> Result<Vehicle, AppError> {
        let vehicle = self.get_vehicle(plate).await?;
        self.repo.delete_vehicle(vehicle.id).await?;
        Ok(vehicle)
    }

    /// Advance the odometer reading. Recorded mileage is monotonic: a lower
    /// reading leaves the stored value unchanged.
    pub async fn update_mileage(
        &self,
        plate: &str,
        mileage: i64,
        date: NaiveDate,
    ) -> Result<Vehicle, AppError> {
        if mileage < 0 {
            return Err(AppError::Validation(
                "Mileage cannot be negative".to_string(),
            ));
        }
        let mut vehicle = self.get_vehicle(plate).await?;
        vehicle.advance_mileage(mileage);
        vehicle.last_updated = Some(date);
        self.repo
            .update_vehicle_state(vehicle.id, vehicle.current_mileage, vehicle.last_updated)
            .await?;
        Ok(vehicle)
    }

    /// Persist a fully-assembled vehicle, e.g. from an import. Fails with
    /// a conflict when the plate is already registered.
    pub async fn import_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, AppError> {
        if self
            .repo
            .get_vehicle_by_plate(&vehicle.license_plate)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Vehicle already registered: {}",
                vehicle.license_plate
            )));
        }
        self.repo.save_vehicle(&vehicle).await?;
        Ok(vehicle)
    }

    // ========================
    // Service operations
    // ========================

    /// Record a service event against an item. First-ever service of a new
    /// code materializes a tracked item from the supplied definition or,
    /// failing that, from the static catalog (unknown codes default to
    /// "uncategorized" with no interval).
    pub async fn record_service(
        &self,
        plate: &str,
        code: &str,
        today: NaiveDate,
        request: ServiceRequest,
    ) -> Result<ServiceOutcome, AppError> {
        let mileage = request.mileage.ok_or_else(|| {
            AppError::Validation("Service mileage is required".to_string())
        })?;
        if mileage < 0 {
            return Err(AppError::Validation(
                "Service mileage cannot be negative".to_string(),
            ));
        }
        let cost = request.cost.unwrap_or(0);
        if cost < 0 {
            return Err(AppError::Validation("Cost cannot be negative".to_string()));
        }

        let mut vehicle = self.get_vehicle(plate).await?;

        let materialized = !vehicle.items.contains_key(code);
        let definition = if materialized {
            Some(
                request
                    .definition
                    .clone()
                    .unwrap_or_else(|| self.catalog.definition_for(code)),
            )
        } else {
            None
        };

        let mut event = ServiceEvent::new(request.date.unwrap_or(today), mileage).with_cost(cost);
        if let Some(location) = request.location {
            event = event.with_location(location);
        }
        if let Some(technician) = request.technician {
            event = event.with_technician(technician);
        }
        if let Some(note) = request.note {
            event = event.with_note(note);
        }

        vehicle
            .record_service(code, definition, event.clone())
            .map_err(|err| AppError::from_ledger(err, plate))?;

        let item = self.tracked_item(&vehicle, plate, code)?;
        let next_due_mileage = item.next_due_mileage;
        let status = item.due_status(vehicle.current_mileage);

        self.repo.save_tracked_item(vehicle.id, item).await?;
        self.repo
            .save_service_event(vehicle.id, code, &event)
            .await?;
        self.repo
            .update_vehicle_state(vehicle.id, vehicle.current_mileage, vehicle.last_updated)
            .await?;

        Ok(ServiceOutcome {
            item_code: code.to_string(),
            event,
            next_due_mileage,
            status,
            materialized,
            vehicle,
        })
    }

    /// Delete a service event. `next_due_mileage` is only rebuilt from the
    /// remaining history when `recompute` is set; otherwise a threshold
    /// produced by the deleted event stays as-is.
    pub async fn delete_service_event(
        &self,
        plate: &str,
        code: &str,
        event_id: ServiceEventId,
        recompute: bool,
    ) -> Result<ServiceEvent, AppError> {
        let mut vehicle = self.get_vehicle(plate).await?;
        let removed = vehicle
            .delete_service_event(code, event_id, recompute)
            .map_err(|err| AppError::from_ledger(err, plate))?;

        self.repo.delete_service_event(event_id).await?;
        if recompute {
            let item = self.tracked_item(&vehicle, plate, code)?;
            self.repo.save_tracked_item(vehicle.id, item).await?;
        }

        Ok(removed)
    }

    /// Service history across all items (or one item), newest first.
    pub async fn service_history(
        &self,
        plate: &str,
        item_code: Option<&str>,
    ) -> Result<Vec<HistoryEntry>, AppError> {
        let vehicle = self.get_vehicle(plate).await?;

        if let Some(code) = item_code {
            if !vehicle.items.contains_key(code) {
                return Err(AppError::ItemNotFound {
                    plate: plate.to_string(),
                    code: code.to_string(),
                });
            }
        }

        let mut entries: Vec<HistoryEntry> = vehicle
            .items
            .iter()
            .filter(|(code, _)| item_code.is_none_or(|wanted| wanted == code.as_str()))
            .flat_map(|(code, item)| {
                item.history.iter().map(|event| HistoryEntry {
                    item_code: code.clone(),
                    display_name: item.definition.display_name.clone(),
                    event: event.clone(),
                })
            })
            .collect();

        entries.sort_by(|a, b| b.event.date.cmp(&a.event.date));
        Ok(entries)
    }

    // ========================
    // Reporting operations
    // ========================

    /// Due summary for every tracked item, most urgent first.
    pub async fn due_report(&self, plate: &str, today: NaiveDate) -> Result<Vec<DueEntry>, AppError> {
        let vehicle = self.get_vehicle(plate).await?;
        Ok(due_report(&vehicle, today))
    }

    /// Aggregate statistics (total cost, service count, upcoming items,
    /// recent services) as of `today`.
    pub async fn vehicle_stats(
        &self,
        plate: &str,
        today: NaiveDate,
    ) -> Result<VehicleStats, AppError> {
        let vehicle = self.get_vehicle(plate).await?;
        Ok(aggregate_stats(&vehicle, today))
    }

    fn tracked_item<'a>(
        &self,
        vehicle: &'a Vehicle,
        plate: &str,
        code: &str,
    ) -> Result<&'a TrackedItem, AppError> {
        vehicle.item(code).ok_or_else(|| AppError::ItemNotFound {
            plate: plate.to_string(),
            code: code.to_string(),
        })
    }
}
