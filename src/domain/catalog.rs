use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Inspection without replacing the part
    Check,
    /// Part or fluid is replaced
    Replace,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Check => "check",
            ServiceKind::Replace => "replace",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "check" => Some(ServiceKind::Check),
            "replace" => Some(ServiceKind::Replace),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Engine,
    Transmission,
    Climate,
    Intake,
    Cooling,
    Electrical,
    Chassis,
    Brakes,
    Exhaust,
    Uncategorized,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Engine => "engine",
            Category::Transmission => "transmission",
            Category::Climate => "climate",
            Category::Intake => "intake",
            Category::Cooling => "cooling",
            Category::Electrical => "electrical",
            Category::Chassis => "chassis",
            Category::Brakes => "brakes",
            Category::Exhaust => "exhaust",
            Category::Uncategorized => "uncategorized",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "engine" => Some(Category::Engine),
            "transmission" => Some(Category::Transmission),
            "climate" => Some(Category::Climate),
            "intake" => Some(Category::Intake),
            "cooling" => Some(Category::Cooling),
            "electrical" => Some(Category::Electrical),
            "chassis" => Some(Category::Chassis),
            "brakes" => Some(Category::Brakes),
            "exhaust" => Some(Category::Exhaust),
            "uncategorized" => Some(Category::Uncategorized),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static definition of a serviceable item. Loaded from the catalog,
/// immutable at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub code: String,
    pub display_name: String,
    pub category: Category,
    /// Distance after which the item is due again. None or 0 means the item
    /// is not mileage-scheduled (e.g. the battery, which is time-scheduled).
    pub interval_km: Option<i64>,
    pub default_service_kinds: Vec<ServiceKind>,
}

impl ItemDefinition {
    pub fn new(
        code: impl Into<String>,
        display_name: impl Into<String>,
        category: Category,
        interval_km: Option<i64>,
    ) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
            category,
            interval_km,
            default_service_kinds: vec![ServiceKind::Replace],
        }
    }

    pub fn with_service_kinds(mut self, kinds: Vec<ServiceKind>) -> Self {
        self.default_service_kinds = kinds;
        self
    }

    /// The mileage interval, with 0 normalized to None.
    pub fn mileage_interval(&self) -> Option<i64> {
        self.interval_km.filter(|km| *km > 0)
    }

    pub fn is_mileage_scheduled(&self) -> bool {
        self.mileage_interval().is_some()
    }
}

/// The built-in catalog of maintenance item definitions.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<ItemDefinition>,
}

impl Catalog {
    pub fn builtin() -> Self {
        let items = vec![
            ItemDefinition::new("engine_oil", "Engine oil", Category::Engine, Some(7500)),
            ItemDefinition::new(
                "transmission_fluid",
                "Transmission fluid",
                Category::Transmission,
                Some(40000),
            ),
            ItemDefinition::new(
                "cabin_air_filter",
                "Cabin air filter",
                Category::Climate,
                Some(10000),
            ),
            ItemDefinition::new(
                "engine_air_filter",
                "Engine air filter",
                Category::Intake,
                Some(40000),
            ),
            ItemDefinition::new("spark_plugs", "Spark plugs", Category::Engine, Some(40000)),
            ItemDefinition::new("coolant", "Coolant", Category::Cooling, Some(40000)),
            // Time-scheduled, not mileage-scheduled
            ItemDefinition::new("battery", "Battery", Category::Electrical, None)
                .with_service_kinds(vec![ServiceKind::Check]),
            ItemDefinition::new(
                "engine_mount",
                "Engine mounts",
                Category::Chassis,
                Some(80000),
            ),
            ItemDefinition::new(
                "shock_absorbers",
                "Shock absorbers",
                Category::Chassis,
                Some(80000),
            ),
            ItemDefinition::new("brake_fluid", "Brake fluid", Category::Brakes, Some(30000)),
            ItemDefinition::new(
                "fuel_injector",
                "Fuel injectors",
                Category::Intake,
                Some(40000),
            ),
            ItemDefinition::new(
                "turbocharger",
                "Turbocharger",
                Category::Engine,
                Some(40000),
            ),
            ItemDefinition::new(
                "exhaust_system",
                "Exhaust system",
                Category::Exhaust,
                Some(20000),
            ),
            ItemDefinition::new("light_bulb", "Light bulbs", Category::Electrical, Some(30000)),
            ItemDefinition::new("tires", "Tires", Category::Chassis, Some(10000))
                .with_service_kinds(vec![ServiceKind::Check, ServiceKind::Replace]),
            ItemDefinition::new(
                "air_flow_sensor",
                "Air flow sensor",
                Category::Intake,
                Some(30000),
            ),
        ];
        Self { items }
    }

    pub fn get(&self, code: &str) -> Option<&ItemDefinition> {
        self.items.iter().find(|item| item.code == code)
    }

    /// Resolve a definition for any code. Codes not present in the catalog
    /// default to category "uncategorized" with no mileage interval.
    pub fn definition_for(&self, code: &str) -> ItemDefinition {
        match self.get(code) {
            Some(def) => def.clone(),
            None => ItemDefinition::new(code, code, Category::Uncategorized, None)
                .with_service_kinds(vec![ServiceKind::Check]),
        }
    }

    pub fn items(&self) -> &[ItemDefinition] {
        &self.items
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
