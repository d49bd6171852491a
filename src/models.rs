use serde::Deserialize;

/// One decoded sensor reading, overwritten in place on every new
/// advertisement for the same device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub format: u8,
    pub temperature: f32, // °C
    pub humidity: f32,    // %RH
    pub pressure: u32,    // Pa
}

/// A sensor tag from the configuration file. The device list is fixed at
/// startup; a device's index in that list identifies it everywhere else.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorDevice {
    pub name: String,
    pub placement: String,
    pub address: String,
}

impl SensorDevice {
    /// Only outdoor sensors contribute to pressure-trend averaging.
    pub fn is_outdoor(&self) -> bool {
        self.placement.eq_ignore_ascii_case("outdoor")
    }
}
