use std::collections::BTreeMap;
use std::io::Read;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::application::{AppError, GarageService};
use crate::domain::{
    Catalog, Category, ItemDefinition, ServiceEvent, ServiceKind, TrackedItem, Vehicle,
    last_service, next_due_mileage,
};
use crate::io::export::GarageSnapshot;

/// Result of an import operation
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    /// Zero-based index of the vehicle record in the input
    pub record: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub skip_duplicates: bool,
}

/// Importer for loading vehicle data into the ledger.
pub struct Importer<'a> {
    service: &'a GarageService,
}

// ========================
// Wire shapes
//
// The persisted JSON of the upstream data files comes in two variants:
// vehicle fields either nested under "vehicle_info" or flat on the record,
// and "maintenance_records" as either an ordered sequence or a mapping
// keyed by item code. All of them normalize to the canonical Vehicle here.
// ========================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireDocument {
    Wrapped { vehicles: Vec<WireVehicle> },
    Bare(Vec<WireVehicle>),
}

#[derive(Debug, Deserialize)]
struct WireVehicle {
    vehicle_info: Option<WireVehicleInfo>,
    license_plate: Option<String>,
    brand: Option<String>,
    model: Option<String>,
    current_mileage: Option<i64>,
    last_updated: Option<String>,
    maintenance_records: Option<WireRecords>,
}

#[derive(Debug, Deserialize)]
struct WireVehicleInfo {
    license_plate: Option<String>,
    brand: Option<String>,
    model: Option<String>,
    current_mileage: Option<i64>,
    last_updated: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireRecords {
    Seq(Vec<WireItem>),
    Map(BTreeMap<String, WireItem>),
}

#[derive(Debug, Deserialize)]
struct WireItem {
    item_en: Option<String>,
    category: Option<String>,
    interval_km: Option<i64>,
    next_due_mileage: Option<i64>,
    service_type: Option<WireServiceKinds>,
    service_history: Option<Vec<WireEvent>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireServiceKinds {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    service_date: Option<String>,
    service_mileage: Option<i64>,
    /// Sloppy upstream data carries numbers or strings here; non-numeric
    /// values count as 0
    cost: Option<serde_json::Value>,
    service_location: Option<String>,
    technician: Option<String>,
    note: Option<String>,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a GarageService) -> Self {
        Self { service }
    }

    /// Import vehicles from the upstream JSON shape, normalizing either
    /// record layout to the canonical mapping-by-code.
    pub async fn import_vehicles_json<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let document: WireDocument =
            serde_json::from_reader(reader).map_err(|e| anyhow::anyhow!("Invalid JSON: {}", e))?;

        let wire_vehicles = match document {
            WireDocument::Wrapped { vehicles } => vehicles,
            WireDocument::Bare(vehicles) => vehicles,
        };

        let mut result = ImportResult {
            imported: 0,
            skipped: 0,
            errors: Vec::new(),
        };

        for (index, wire) in wire_vehicles.into_iter().enumerate() {
            let vehicle = match normalize_vehicle(index, wire, self.service.catalog()) {
                Ok(vehicle) => vehicle,
                Err(error) => {
                    result.errors.push(error);
                    continue;
                }
            };

            self.store(index, vehicle, &options, &mut result).await;
        }

        Ok(result)
    }

    /// Import a previously exported snapshot (canonical shape).
    pub async fn import_snapshot_json<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let snapshot: GarageSnapshot = serde_json::from_reader(reader)
            .map_err(|e| anyhow::anyhow!("Invalid snapshot JSON: {}", e))?;

        let mut result = ImportResult {
            imported: 0,
            skipped: 0,
            errors: Vec::new(),
        };

        for (index, vehicle) in snapshot.vehicles.into_iter().enumerate() {
            self.store(index, vehicle, &options, &mut result).await;
        }

        Ok(result)
    }

    async fn store(
        &self,
        index: usize,
        vehicle: Vehicle,
        options: &ImportOptions,
        result: &mut ImportResult,
    ) {
        if options.dry_run {
            result.imported += 1;
            return;
        }

        match self.service.import_vehicle(vehicle).await {
            Ok(_) => result.imported += 1,
            Err(AppError::Conflict(_)) if options.skip_duplicates => result.skipped += 1,
            Err(err) => result.errors.push(ImportError {
                record: index,
                field: None,
                error: err.to_string(),
            }),
        }
    }
}

fn normalize_vehicle(
    index: usize,
    wire: WireVehicle,
    catalog: &Catalog,
) -> Result<Vehicle, ImportError> {
    let info = wire.vehicle_info.as_ref();

    let plate = info
        .and_then(|i| i.license_plate.clone())
        .or(wire.license_plate)
        .ok_or_else(|| ImportError {
            record: index,
            field: Some("license_plate".to_string()),
            error: "license_plate is required".to_string(),
        })?;

    let current_mileage = info
        .and_then(|i| i.current_mileage)
        .or(wire.current_mileage)
        .unwrap_or(0);

    let mut vehicle = Vehicle::new(plate, current_mileage.max(0));
    vehicle.brand = info.and_then(|i| i.brand.clone()).or(wire.brand);
    vehicle.model = info.and_then(|i| i.model.clone()).or(wire.model);
    vehicle.last_updated = info
        .and_then(|i| i.last_updated.clone())
        .or(wire.last_updated)
        .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok());

    let wire_items: Vec<(Option<String>, WireItem)> = match wire.maintenance_records {
        Some(WireRecords::Seq(items)) => items.into_iter().map(|item| (None, item)).collect(),
        Some(WireRecords::Map(items)) => items
            .into_iter()
            .map(|(code, item)| (Some(code), item))
            .collect(),
        None => Vec::new(),
    };

    for (map_key, wire_item) in wire_items {
        let code = wire_item
            .item_en
            .clone()
            .or(map_key)
            .ok_or_else(|| ImportError {
                record: index,
                field: Some("item_en".to_string()),
                error: "maintenance record without an item code".to_string(),
            })?;

        let item = normalize_item(index, &code, wire_item, catalog)?;
        for event in &item.history {
            vehicle.advance_mileage(event.mileage);
        }
        vehicle.items.insert(code, item);
    }

    Ok(vehicle)
}

fn normalize_item(
    index: usize,
    code: &str,
    wire: WireItem,
    catalog: &Catalog,
) -> Result<TrackedItem, ImportError> {
    let fallback = catalog.definition_for(code);

    let category = wire
        .category
        .as_deref()
        .and_then(Category::from_str)
        .unwrap_or(fallback.category);
    let interval_km = wire.interval_km.or(fallback.interval_km);
    let service_kinds = match wire.service_type {
        Some(WireServiceKinds::One(kind)) => ServiceKind::from_str(&kind)
            .map(|k| vec![k])
            .unwrap_or_else(|| fallback.default_service_kinds.clone()),
        Some(WireServiceKinds::Many(kinds)) => {
            let parsed: Vec<ServiceKind> = kinds
                .iter()
                .filter_map(|kind| ServiceKind::from_str(kind))
                .collect();
            if parsed.is_empty() {
                fallback.default_service_kinds.clone()
            } else {
                parsed
            }
        }
        None => fallback.default_service_kinds.clone(),
    };

    let definition = ItemDefinition::new(code, fallback.display_name, category, interval_km)
        .with_service_kinds(service_kinds);

    let mut item = TrackedItem::new(definition);

    for wire_event in wire.service_history.unwrap_or_default() {
        item.history.push(normalize_event(index, code, wire_event)?);
    }

    // Trust the persisted threshold when present; otherwise rebuild it from
    // the most recent event. Non-mileage items never carry one.
    item.next_due_mileage = match item.definition.mileage_interval() {
        Some(interval) => wire
            .next_due_mileage
            .filter(|due| *due > 0)
            .or_else(|| {
                last_service(&item.history)
                    .and_then(|event| next_due_mileage(event.mileage, Some(interval)))
            }),
        None => None,
    };

    Ok(item)
}

fn normalize_event(index: usize, code: &str, wire: WireEvent) -> Result<ServiceEvent, ImportError> {
    let date_str = wire.service_date.ok_or_else(|| ImportError {
        record: index,
        field: Some(format!("{}.service_date", code)),
        error: "service_date is required".to_string(),
    })?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|_| ImportError {
        record: index,
        field: Some(format!("{}.service_date", code)),
        error: format!("Invalid date: {}", date_str),
    })?;

    let mileage = wire.service_mileage.ok_or_else(|| ImportError {
        record: index,
        field: Some(format!("{}.service_mileage", code)),
        error: "service_mileage is required".to_string(),
    })?;
    if mileage < 0 {
        return Err(ImportError {
            record: index,
            field: Some(format!("{}.service_mileage", code)),
            error: "service_mileage cannot be negative".to_string(),
        });
    }

    let mut event = ServiceEvent::new(date, mileage).with_cost(coerce_cost(wire.cost.as_ref()));
    if let Some(location) = wire.service_location.filter(|s| !s.is_empty()) {
        event = event.with_location(location);
    }
    if let Some(technician) = wire.technician.filter(|s| !s.is_empty()) {
        event = event.with_technician(technician);
    }
    if let Some(note) = wire.note.filter(|s| !s.is_empty()) {
        event = event.with_note(note);
    }

    Ok(event)
}

/// Absent or non-numeric costs count as 0.
fn coerce_cost(value: Option<&serde_json::Value>) -> i64 {
    match value {
        Some(serde_json::Value::Number(n)) => {
            n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0)
        }
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
