use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Category, ItemDefinition, ServiceEvent, ServiceEventId, TrackedItem, Vehicle, VehicleId,
};

use super::MIGRATION_001_INITIAL;

/// Repository for persisting and querying vehicles and their maintenance
/// histories. The persisted shape is the canonical one: tracked items keyed
/// by code, events in insertion order.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Vehicle operations
    // ========================

    /// Save a vehicle with all of its tracked items and events.
    pub async fn save_vehicle(&self, vehicle: &Vehicle) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO vehicles (id, license_plate, brand, model, current_mileage, last_updated, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(vehicle.id.to_string())
        .bind(&vehicle.license_plate)
        .bind(&vehicle.brand)
        .bind(&vehicle.model)
        .bind(vehicle.current_mileage)
        .bind(vehicle.last_updated.map(|d| d.to_string()))
        .bind(vehicle.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save vehicle")?;

        for item in vehicle.items.values() {
            self.save_tracked_item(vehicle.id, item).await?;
            for event in &item.history {
                self.save_service_event(vehicle.id, &item.definition.code, event)
                    .await?;
            }
        }

        Ok(())
    }

    /// Get a vehicle by ID, with its full maintenance history.
    pub async fn get_vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>> {
        let row = sqlx::query(
            r#"
            SELECT id, license_plate, brand, model, current_mileage, last_updated, created_at
            FROM vehicles
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch vehicle")?;

        match row {
            Some(row) => Ok(Some(self.assemble_vehicle(&row).await?)),
            None => Ok(None),
        }
    }

    /// Get a vehicle by license plate, with its full maintenance history.
    pub async fn get_vehicle_by_plate(&self, plate: &str) -> Result<Option<Vehicle>> {
        let row = sqlx::query(
            r#"
            SELECT id, license_plate, brand, model, current_mileage, last_updated, created_at
            FROM vehicles
            WHERE license_plate = ?
            "#,
        )
        .bind(plate)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch vehicle by plate")?;

        match row {
            Some(row) => Ok(Some(self.assemble_vehicle(&row).await?)),
            None => Ok(None),
        }
    }

    /// List all vehicles with their full maintenance histories.
    pub async fn list_vehicles(&self) -> Result<Vec<Vehicle>> {
        let rows = sqlx::query(
            r#"
            SELECT id, license_plate, brand, model, current_mileage, last_updated, created_at
            FROM vehicles
            ORDER BY license_plate
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list vehicles")?;

        let mut vehicles = Vec::with_capacity(rows.len());
        for row in &rows {
            vehicles.push(self.assemble_vehicle(row).await?);
        }
        Ok(vehicles)
    }

    /// Delete a vehicle, its tracked items and all service events.
    pub async fn delete_vehicle(&self, id: VehicleId) -> Result<()> {
        let id_str = id.to_string();
        sqlx::query("DELETE FROM service_events WHERE vehicle_id = ?")
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .context("Failed to delete service events")?;
        sqlx::query("DELETE FROM tracked_items WHERE vehicle_id = ?")
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .context("Failed to delete tracked items")?;
        sqlx::query("DELETE FROM vehicles WHERE id = ?")
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .context("Failed to delete vehicle")?;
        Ok(())
    }

    /// Update the odometer reading and last-updated date.
    pub async fn update_vehicle_state(
        &self,
        id: VehicleId,
        current_mileage: i64,
        last_updated: Option<NaiveDate>,
    ) -> Result<()> {
        sqlx::query("UPDATE vehicles SET current_mileage = ?, last_updated = ? WHERE id = ?")
            .bind(current_mileage)
            .bind(last_updated.map(|d| d.to_string()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update vehicle state")?;
        Ok(())
    }

    // ========================
    // Tracked item operations
    // ========================

    /// Insert or update a tracked item (definition + derived threshold).
    pub async fn save_tracked_item(&self, vehicle_id: VehicleId, item: &TrackedItem) -> Result<()> {
        let kinds_json = serde_json::to_string(&item.definition.default_service_kinds)?;

        sqlx::query(
            r#"
            INSERT INTO tracked_items (vehicle_id, code, display_name, category, interval_km, service_kinds, next_due_mileage)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (vehicle_id, code) DO UPDATE SET
                display_name = excluded.display_name,
                category = excluded.category,
                interval_km = excluded.interval_km,
                service_kinds = excluded.service_kinds,
                next_due_mileage = excluded.next_due_mileage
            "#,
        )
        .bind(vehicle_id.to_string())
        .bind(&item.definition.code)
        .bind(&item.definition.display_name)
        .bind(item.definition.category.as_str())
        .bind(item.definition.interval_km)
        .bind(&kinds_json)
        .bind(item.next_due_mileage)
        .execute(&self.pool)
        .await
        .context("Failed to save tracked item")?;

        Ok(())
    }

    // ========================
    // Service event operations
    // ========================

    /// Append a service event to an item's history.
    pub async fn save_service_event(
        &self,
        vehicle_id: VehicleId,
        item_code: &str,
        event: &ServiceEvent,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO service_events (id, vehicle_id, item_code, service_date, mileage, cost, location, technician, note, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.id.to_string())
        .bind(vehicle_id.to_string())
        .bind(item_code)
        .bind(event.date.to_string())
        .bind(event.mileage)
        .bind(event.cost)
        .bind(&event.location)
        .bind(&event.technician)
        .bind(&event.note)
        .bind(event.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save service event")?;

        Ok(())
    }

    /// Delete a service event by ID.
    pub async fn delete_service_event(&self, id: ServiceEventId) -> Result<()> {
        sqlx::query("DELETE FROM service_events WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete service event")?;
        Ok(())
    }

    // ========================
    // Row mapping
    // ========================

    /// Build the full vehicle aggregate from its row plus item and event
    /// rows. Events load in insertion order so that date ties resolve to the
    /// later-inserted record.
    async fn assemble_vehicle(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Vehicle> {
        let mut vehicle = Self::row_to_vehicle(row)?;
        let vehicle_id = vehicle.id.to_string();

        let item_rows = sqlx::query(
            r#"
            SELECT code, display_name, category, interval_km, service_kinds, next_due_mileage
            FROM tracked_items
            WHERE vehicle_id = ?
            ORDER BY code
            "#,
        )
        .bind(&vehicle_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load tracked items")?;

        for item_row in &item_rows {
            let item = Self::row_to_item(item_row)?;
            vehicle.items.insert(item.definition.code.clone(), item);
        }

        let event_rows = sqlx::query(
            r#"
            SELECT id, item_code, service_date, mileage, cost, location, technician, note, recorded_at
            FROM service_events
            WHERE vehicle_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(&vehicle_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load service events")?;

        for event_row in &event_rows {
            let item_code: String = event_row.get("item_code");
            let event = Self::row_to_event(event_row)?;
            if let Some(item) = vehicle.items.get_mut(&item_code) {
                item.history.push(event);
            }
        }

        Ok(vehicle)
    }

    fn row_to_vehicle(row: &sqlx::sqlite::SqliteRow) -> Result<Vehicle> {
        let id_str: String = row.get("id");
        let last_updated_str: Option<String> = row.get("last_updated");
        let created_at_str: String = row.get("created_at");

        Ok(Vehicle {
            id: Uuid::parse_str(&id_str).context("Invalid vehicle ID")?,
            license_plate: row.get("license_plate"),
            brand: row.get("brand"),
            model: row.get("model"),
            current_mileage: row.get("current_mileage"),
            last_updated: last_updated_str
                .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
                .transpose()
                .context("Invalid last_updated date")?,
            items: std::collections::BTreeMap::new(),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<TrackedItem> {
        let category_str: String = row.get("category");
        let kinds_json: String = row.get("service_kinds");

        let definition = ItemDefinition {
            code: row.get("code"),
            display_name: row.get("display_name"),
            category: Category::from_str(&category_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid category: {}", category_str))?,
            interval_km: row.get("interval_km"),
            default_service_kinds: serde_json::from_str(&kinds_json).unwrap_or_default(),
        };

        Ok(TrackedItem {
            definition,
            next_due_mileage: row.get("next_due_mileage"),
            history: Vec::new(),
        })
    }

    fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<ServiceEvent> {
        let id_str: String = row.get("id");
        let date_str: String = row.get("service_date");
        let recorded_at_str: String = row.get("recorded_at");

        Ok(ServiceEvent {
            id: Uuid::parse_str(&id_str).context("Invalid service event ID")?,
            date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                .context("Invalid service date")?,
            mileage: row.get("mileage"),
            cost: row.get("cost"),
            location: row.get("location"),
            technician: row.get("technician"),
            note: row.get("note"),
            recorded_at: DateTime::parse_from_rfc3339(&recorded_at_str)
                .context("Invalid recorded_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}
