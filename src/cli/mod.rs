use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{GarageService, ServiceRequest};
use crate::domain::{Catalog, Category, ItemDefinition};

/// Garagelog - Vehicle Maintenance Ledger
#[derive(Parser)]
#[command(name = "garagelog")]
#[command(about = "A local-first vehicle maintenance tracker built on a service-event ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "garagelog.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Vehicle management commands
    #[command(subcommand)]
    Vehicle(VehicleCommands),

    /// Record a service event for a maintenance item
    Service {
        /// Vehicle license plate
        plate: String,

        /// Maintenance item code (e.g. "engine_oil"; see `catalog`)
        item: String,

        /// Odometer reading at service time
        #[arg(short, long)]
        mileage: i64,

        /// Service date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Cost in whole currency units
        #[arg(short, long)]
        cost: Option<i64>,

        /// Workshop or garage
        #[arg(long)]
        location: Option<String>,

        /// Technician name
        #[arg(long)]
        technician: Option<String>,

        /// Free-form note
        #[arg(short, long)]
        note: Option<String>,

        /// Display name for an item code the catalog doesn't know
        #[arg(long)]
        name: Option<String>,

        /// Category for an item code the catalog doesn't know
        #[arg(long)]
        category: Option<String>,

        /// Mileage interval for an item code the catalog doesn't know
        #[arg(long)]
        interval_km: Option<i64>,
    },

    /// List recorded service events
    History {
        /// Vehicle license plate
        plate: String,

        /// Filter by maintenance item code
        #[arg(long)]
        item: Option<String>,

        /// Maximum number of events to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete a service event from an item's history
    #[command(name = "delete-service")]
    DeleteService {
        /// Vehicle license plate
        plate: String,

        /// Maintenance item code
        item: String,

        /// Service event ID
        id: String,

        /// Rebuild the next-due threshold from the remaining history
        #[arg(long)]
        recompute: bool,
    },

    /// Show the due status of every tracked item
    Due {
        /// Vehicle license plate
        plate: String,
    },

    /// Show aggregate maintenance statistics
    Stats {
        /// Vehicle license plate
        plate: String,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// List the built-in maintenance item catalog
    Catalog,

    /// Export data to CSV or JSON
    Export {
        /// What to export: history, vehicles, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import vehicle data from JSON
    Import {
        /// What to import: vehicles, full
        import_type: String,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,

        /// Skip vehicles whose plate is already registered
        #[arg(long)]
        skip_duplicates: bool,
    },
}

#[derive(Subcommand)]
pub enum VehicleCommands {
    /// Register a new vehicle
    Add {
        /// License plate (must be unique)
        plate: String,

        /// Current odometer reading
        #[arg(short, long, default_value = "0")]
        mileage: i64,

        /// Vehicle brand
        #[arg(long)]
        brand: Option<String>,

        /// Vehicle model
        #[arg(long)]
        model: Option<String>,
    },

    /// List all vehicles
    List,

    /// Show detailed vehicle information
    Show {
        /// License plate
        plate: String,
    },

    /// Delete a vehicle and its entire history
    Delete {
        /// License plate
        plate: String,
    },

    /// Update the odometer reading (never moves backwards)
    Mileage {
        /// License plate
        plate: String,

        /// New odometer reading
        mileage: i64,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                GarageService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Vehicle(vehicle_cmd) => {
                let service = GarageService::connect(&self.database).await?;
                run_vehicle_command(&service, vehicle_cmd).await?;
            }

            Commands::Service {
                plate,
                item,
                mileage,
                date,
                cost,
                location,
                technician,
                note,
                name,
                category,
                interval_km,
            } => {
                let service = GarageService::connect(&self.database).await?;

                let date_parsed = date
                    .as_deref()
                    .map(parse_date)
                    .transpose()
                    .context("Invalid service date")?;

                let definition =
                    build_definition_override(&item, name, category.as_deref(), interval_km)?;

                let request = ServiceRequest {
                    date: date_parsed,
                    mileage: Some(mileage),
                    cost,
                    location,
                    technician,
                    note,
                    definition,
                };

                let outcome = service
                    .record_service(&plate, &item, Utc::now().date_naive(), request)
                    .await?;

                if outcome.materialized {
                    println!("Started tracking item: {}", outcome.item_code);
                }
                println!(
                    "Recorded service: {} on {} at {} km",
                    outcome.item_code, plate, outcome.event.mileage
                );
                match outcome.next_due_mileage {
                    Some(due) => println!(
                        "Next due at {} km (status: {})",
                        due,
                        outcome.status.as_str()
                    ),
                    None => println!("Item is not mileage-scheduled"),
                }
                if self.verbose {
                    println!("Event ID: {}", outcome.event.id);
                }
            }

            Commands::History { plate, item, limit } => {
                let service = GarageService::connect(&self.database).await?;
                run_history_command(&service, &plate, item.as_deref(), limit).await?;
            }

            Commands::DeleteService {
                plate,
                item,
                id,
                recompute,
            } => {
                let service = GarageService::connect(&self.database).await?;
                let event_id =
                    Uuid::parse_str(&id).context("Invalid event ID format (expected UUID)")?;

                let removed = service
                    .delete_service_event(&plate, &item, event_id, recompute)
                    .await?;

                println!(
                    "Deleted service event: {} on {} ({} km, {})",
                    item, plate, removed.mileage, removed.date
                );
                if recompute {
                    let vehicle = service.get_vehicle(&plate).await?;
                    match vehicle.item(&item).and_then(|i| i.next_due_mileage) {
                        Some(due) => println!("Next due recomputed: {} km", due),
                        None => println!("Next due recomputed: none"),
                    }
                } else {
                    println!("Next due threshold left unchanged (use --recompute to rebuild)");
                }
            }

            Commands::Due { plate } => {
                let service = GarageService::connect(&self.database).await?;
                run_due_command(&service, &plate).await?;
            }

            Commands::Stats { plate, format } => {
                let service = GarageService::connect(&self.database).await?;
                run_stats_command(&service, &plate, &format).await?;
            }

            Commands::Catalog => {
                // Static data, no database needed
                run_catalog_command(&Catalog::builtin());
            }

            Commands::Export {
                export_type,
                output,
            } => {
                let service = GarageService::connect(&self.database).await?;
                run_export_command(&service, &export_type, output.as_deref()).await?;
            }

            Commands::Import {
                import_type,
                input,
                dry_run,
                skip_duplicates,
            } => {
                let service = GarageService::connect(&self.database).await?;
                run_import_command(
                    &service,
                    &import_type,
                    input.as_deref(),
                    dry_run,
                    skip_duplicates,
                )
                .await?;
            }
        }

        Ok(())
    }
}

fn build_definition_override(
    code: &str,
    name: Option<String>,
    category: Option<&str>,
    interval_km: Option<i64>,
) -> Result<Option<ItemDefinition>> {
    if name.is_none() && category.is_none() && interval_km.is_none() {
        return Ok(None);
    }

    let category = match category {
        Some(s) => Category::from_str(s).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid category '{}'. Valid: engine, transmission, climate, intake, cooling, electrical, chassis, brakes, exhaust, uncategorized",
                s
            )
        })?,
        None => Category::Uncategorized,
    };

    let display_name = name.unwrap_or_else(|| code.to_string());
    Ok(Some(ItemDefinition::new(
        code,
        display_name,
        category,
        interval_km,
    )))
}

async fn run_vehicle_command(service: &GarageService, cmd: VehicleCommands) -> Result<()> {
    match cmd {
        VehicleCommands::Add {
            plate,
            mileage,
            brand,
            model,
        } => {
            let vehicle = service
                .register_vehicle(plate, mileage, brand, model)
                .await?;
            println!(
                "Registered vehicle: {} at {} km",
                vehicle.license_plate, vehicle.current_mileage
            );
        }

        VehicleCommands::List => {
            let vehicles = service.list_vehicles().await?;
            if vehicles.is_empty() {
                println!("No vehicles found.");
            } else {
                println!(
                    "{:<12} {:<12} {:<12} {:>10} {:>6} {:>9}",
                    "PLATE", "BRAND", "MODEL", "MILEAGE", "ITEMS", "SERVICES"
                );
                println!("{}", "-".repeat(66));
                for vehicle in vehicles {
                    println!(
                        "{:<12} {:<12} {:<12} {:>10} {:>6} {:>9}",
                        truncate(&vehicle.license_plate, 12),
                        truncate(vehicle.brand.as_deref().unwrap_or("-"), 12),
                        truncate(vehicle.model.as_deref().unwrap_or("-"), 12),
                        vehicle.current_mileage,
                        vehicle.items.len(),
                        vehicle.service_count()
                    );
                }
            }
        }

        VehicleCommands::Show { plate } => {
            let vehicle = service.get_vehicle(&plate).await?;

            println!("Vehicle: {}", vehicle.license_plate);
            println!("  ID:          {}", vehicle.id);
            if let Some(brand) = &vehicle.brand {
                println!("  Brand:       {}", brand);
            }
            if let Some(model) = &vehicle.model {
                println!("  Model:       {}", model);
            }
            println!("  Mileage:     {} km", vehicle.current_mileage);
            if let Some(updated) = vehicle.last_updated {
                println!("  Updated:     {}", updated);
            }
            println!(
                "  Registered:  {}",
                vehicle.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            println!(
                "  Tracked items: {} ({} service events)",
                vehicle.items.len(),
                vehicle.service_count()
            );
        }

        VehicleCommands::Delete { plate } => {
            let vehicle = service.delete_vehicle(&plate).await?;
            println!(
                "Deleted vehicle {} with {} service event(s)",
                vehicle.license_plate,
                vehicle.service_count()
            );
        }

        VehicleCommands::Mileage { plate, mileage } => {
            let vehicle = service
                .update_mileage(&plate, mileage, Utc::now().date_naive())
                .await?;
            println!(
                "Odometer for {}: {} km",
                vehicle.license_plate, vehicle.current_mileage
            );
            if vehicle.current_mileage != mileage {
                println!("Reading {} km ignored: recorded mileage never decreases", mileage);
            }
        }
    }
    Ok(())
}

async fn run_history_command(
    service: &GarageService,
    plate: &str,
    item: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let entries = service.service_history(plate, item).await?;

    if entries.is_empty() {
        println!("No service events found.");
        return Ok(());
    }

    println!(
        "{:<12} {:<20} {:>10} {:>8} {:<15} NOTE",
        "DATE", "ITEM", "MILEAGE", "COST", "LOCATION"
    );
    println!("{}", "-".repeat(80));

    for entry in entries.iter().take(limit.unwrap_or(usize::MAX)) {
        println!(
            "{:<12} {:<20} {:>10} {:>8} {:<15} {}",
            entry.event.date,
            truncate(&entry.display_name, 20),
            entry.event.mileage,
            entry.event.cost,
            truncate(entry.event.location.as_deref().unwrap_or(""), 15),
            truncate(entry.event.note.as_deref().unwrap_or(""), 25)
        );
    }
    Ok(())
}

async fn run_due_command(service: &GarageService, plate: &str) -> Result<()> {
    let vehicle = service.get_vehicle(plate).await?;
    let report = service.due_report(plate, Utc::now().date_naive()).await?;

    if report.is_empty() {
        println!("No tracked items.");
        return Ok(());
    }

    println!(
        "Due status for {} at {} km",
        vehicle.license_plate, vehicle.current_mileage
    );
    println!();
    println!(
        "{:<20} {:<14} {:>10} {:>10} {:<10}",
        "ITEM", "CATEGORY", "NEXT DUE", "REMAINING", "STATUS"
    );
    println!("{}", "-".repeat(70));

    for entry in &report {
        let next_due = match (entry.next_due_mileage, entry.due_date) {
            (Some(due), _) => format!("{} km", due),
            (None, Some(date)) => date.to_string(),
            (None, None) => "-".to_string(),
        };
        let remaining = entry
            .remaining_km
            .map(|km| format!("{} km", km))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<20} {:<14} {:>10} {:>10} {:<10}",
            truncate(&entry.display_name, 20),
            entry.category.as_str(),
            next_due,
            remaining,
            entry.status.as_str()
        );
    }
    Ok(())
}

async fn run_stats_command(service: &GarageService, plate: &str, format: &str) -> Result<()> {
    let stats = service
        .vehicle_stats(plate, Utc::now().date_naive())
        .await?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        _ => {
            println!("Maintenance statistics for {}", plate);
            println!();
            println!("  Total cost:     {:>10}", stats.total_cost);
            println!("  Services:       {:>10}", stats.service_count);
            println!("  Upcoming items: {:>10}", stats.upcoming_count);

            if !stats.recent_services.is_empty() {
                println!();
                println!("Recent services (last 3 months):");
                for recent in &stats.recent_services {
                    println!(
                        "  {} {:<20} {:>10} km  {:>8}",
                        recent.event.date,
                        truncate(&recent.display_name, 20),
                        recent.event.mileage,
                        recent.event.cost
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_catalog_command(catalog: &Catalog) {
    println!(
        "{:<20} {:<22} {:<14} {:>10} {:<15}",
        "CODE", "NAME", "CATEGORY", "INTERVAL", "SERVICE"
    );
    println!("{}", "-".repeat(85));

    for def in catalog.items() {
        let interval = def
            .mileage_interval()
            .map(|km| format!("{} km", km))
            .unwrap_or_else(|| "time".to_string());
        let kinds: Vec<&str> = def
            .default_service_kinds
            .iter()
            .map(|k| k.as_str())
            .collect();

        println!(
            "{:<20} {:<22} {:<14} {:>10} {:<15}",
            def.code,
            truncate(&def.display_name, 22),
            def.category.as_str(),
            interval,
            kinds.join(", ")
        );
    }
}

async fn run_export_command(
    service: &GarageService,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "history" => {
            let count = exporter.export_history_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} service events", count);
            }
        }
        "vehicles" => {
            let count = exporter.export_vehicles_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} vehicles", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_snapshot_json(writer).await?;
            if output.is_some() {
                eprintln!("Exported full database: {} vehicles", snapshot.vehicles.len());
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: history, vehicles, full",
                export_type
            );
        }
    }

    Ok(())
}

async fn run_import_command(
    service: &GarageService,
    import_type: &str,
    input: Option<&str>,
    dry_run: bool,
    skip_duplicates: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{Read, stdin};

    let importer = Importer::new(service);

    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions {
        dry_run,
        skip_duplicates,
    };

    let result = match import_type {
        "vehicles" => importer.import_vehicles_json(reader, options).await?,
        "full" => importer.import_snapshot_json(reader, options).await?,
        _ => {
            anyhow::bail!(
                "Invalid import type '{}'. Valid types: vehicles, full",
                import_type
            );
        }
    };

    if dry_run {
        println!("Dry run - nothing was written");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Skipped:  {}", result.skipped);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!(
                "  Record {}: {}",
                error.record,
                error
                    .field
                    .as_ref()
                    .map(|f| format!("{}: ", f))
                    .unwrap_or_default()
                    + &error.error
            );
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").context("Date must be in YYYY-MM-DD format")
}
