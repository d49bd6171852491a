use log::info;
use serde::Deserialize;
use std::env;
use std::fs;

use crate::models::SensorDevice;

const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkEntry {
    pub ssid: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Networks {
    pub primary: NetworkEntry,
    #[serde(default)]
    pub secondary: Option<NetworkEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub latitude: f32,
    pub longitude: f32,
    pub tz_offset: f32,
    pub elevation: i32, // meters above sea level
}

/// Parsed configuration file: network credentials, geographic location and
/// the list of sensor tags to listen for. Loaded once at startup, read-only
/// afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub networks: Networks,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub location: Location,
    pub sensors: Vec<SensorDevice>,
}

fn default_timezone() -> String {
    "GMT".to_string()
}

impl Config {
    /// Load the configuration from the JSON file named by ENVMON_CONFIG
    /// (falling back to ./config.json).
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        let path = env::var("ENVMON_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        info!("Reading configuration from {}", path);

        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read config file {}: {}", path, e))?;
        let config = Self::from_json(&contents)?;

        info!("Configuration loaded, {} sensor(s)", config.sensors.len());
        for device in &config.sensors {
            info!(
                "Sensor: {} ({}) at {}",
                device.name, device.placement, device.address
            );
        }

        Ok(config)
    }

    /// Parse and validate a configuration document.
    pub fn from_json(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config: Config = serde_json::from_str(contents)?;

        if config.sensors.is_empty() {
            return Err("No sensor devices configured. Add at least one entry to the sensors list in the config file".into());
        }

        // Addresses are compared as uppercase strings everywhere.
        for device in &mut config.sensors {
            device.address = device.address.to_uppercase();
        }

        Ok(config)
    }
}
