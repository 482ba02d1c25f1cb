// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use garagelog::application::{GarageService, ServiceRequest};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(GarageService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = GarageService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Minimal service request: date + mileage, everything else defaulted
pub fn request(date: &str, mileage: i64) -> ServiceRequest {
    ServiceRequest {
        date: Some(parse_date(date)),
        mileage: Some(mileage),
        ..Default::default()
    }
}

/// Test fixture: standard garage setup
pub struct StandardGarage;

impl StandardGarage {
    pub const PLATE: &'static str = "NQX-5918";

    /// Register a single vehicle at 100,000 km
    pub async fn register(service: &GarageService) -> Result<()> {
        service
            .register_vehicle(
                Self::PLATE.to_string(),
                100_000,
                Some("Suzuki".to_string()),
                Some("Baleno".to_string()),
            )
            .await?;
        Ok(())
    }

    /// Register the vehicle and record an oil change at 100,200 km
    pub async fn register_with_oil_change(service: &GarageService) -> Result<()> {
        Self::register(service).await?;
        service
            .record_service(
                Self::PLATE,
                "engine_oil",
                parse_date("2024-01-10"),
                ServiceRequest {
                    date: Some(parse_date("2024-01-10")),
                    mileage: Some(100_200),
                    cost: Some(950),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }
}
