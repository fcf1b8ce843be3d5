//! Layered configuration: built-in defaults, an optional `lotkeeper.toml`
//! next to the binary, and `LOTKEEPER_*` environment overrides, in that
//! order. Everything ends up in a typed [`Settings`] value that is
//! validated before use; nothing reads configuration at runtime.

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::construct::PersistenceMode;
use crate::error::{LotError, Result};
use crate::fare::FareSchedule;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub facility: FacilitySettings,
    pub fare: FareSettings,
    pub persistence: PersistenceSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacilitySettings {
    pub car_spots: u32,
    pub bike_spots: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FareSettings {
    pub car_rate_per_hour: f64,
    pub bike_rate_per_hour: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceSettings {
    /// "file" or "memory".
    pub mode: String,
    pub path: String,
}

impl Settings {
    pub fn load() -> Result<Settings> {
        let settings: Settings = Config::builder()
            .set_default("facility.car_spots", 3_i64)?
            .set_default("facility.bike_spots", 2_i64)?
            .set_default("fare.car_rate_per_hour", 1.5)?
            .set_default("fare.bike_rate_per_hour", 1.0)?
            .set_default("persistence.mode", "file")?
            .set_default("persistence.path", "lotkeeper.db")?
            .add_source(File::with_name("lotkeeper").required(false))
            .add_source(Environment::with_prefix("LOTKEEPER").separator("__"))
            .build()?
            .try_deserialize()?;
        settings.fare_schedule().validate()?;
        settings.persistence_mode()?;
        Ok(settings)
    }

    pub fn fare_schedule(&self) -> FareSchedule {
        FareSchedule {
            car_rate_per_hour: self.fare.car_rate_per_hour,
            bike_rate_per_hour: self.fare.bike_rate_per_hour,
        }
    }

    pub fn persistence_mode(&self) -> Result<PersistenceMode> {
        match self.persistence.mode.as_str() {
            "memory" => Ok(PersistenceMode::InMemory),
            "file" => Ok(PersistenceMode::File(self.persistence.path.clone())),
            other => Err(LotError::Config(format!(
                "unknown persistence mode '{other}' (expected 'file' or 'memory')"
            ))),
        }
    }
}
