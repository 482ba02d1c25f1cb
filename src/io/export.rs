use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::GarageService;
use crate::domain::Vehicle;

/// Database snapshot for full export/import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarageSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub vehicles: Vec<Vehicle>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a GarageService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a GarageService) -> Self {
        Self { service }
    }

    /// Export the complete service history of all vehicles to CSV.
    pub async fn export_history_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let vehicles = self.service.list_vehicles().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "license_plate",
            "item",
            "display_name",
            "category",
            "date",
            "mileage",
            "cost",
            "location",
            "technician",
            "note",
        ])?;

        let mut count = 0;
        for vehicle in &vehicles {
            for (code, item) in &vehicle.items {
                for event in &item.history {
                    csv_writer.write_record([
                        vehicle.license_plate.clone(),
                        code.clone(),
                        item.definition.display_name.clone(),
                        item.definition.category.to_string(),
                        event.date.to_string(),
                        event.mileage.to_string(),
                        event.cost.to_string(),
                        event.location.clone().unwrap_or_default(),
                        event.technician.clone().unwrap_or_default(),
                        event.note.clone().unwrap_or_default(),
                    ])?;
                    count += 1;
                }
            }
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the vehicle catalog to CSV.
    pub async fn export_vehicles_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let vehicles = self.service.list_vehicles().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "license_plate",
            "brand",
            "model",
            "current_mileage",
            "last_updated",
            "tracked_items",
            "service_events",
        ])?;

        let mut count = 0;
        for vehicle in &vehicles {
            csv_writer.write_record([
                vehicle.license_plate.clone(),
                vehicle.brand.clone().unwrap_or_default(),
                vehicle.model.clone().unwrap_or_default(),
                vehicle.current_mileage.to_string(),
                vehicle
                    .last_updated
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                vehicle.items.len().to_string(),
                vehicle.service_count().to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the full database as a JSON snapshot.
    pub async fn export_snapshot_json<W: Write>(&self, mut writer: W) -> Result<GarageSnapshot> {
        let vehicles = self.service.list_vehicles().await?;

        let snapshot = GarageSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            vehicles,
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writeln!(writer)?;
        Ok(snapshot)
    }
}
