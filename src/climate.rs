/// Pressure-trend tracking over outdoor sensor readings
use log::debug;
use time::OffsetDateTime;

use crate::models::SensorReading;
use crate::utils::seconds_since;

/// Normal interval between trend refreshes (3 hours).
pub const TREND_REFRESH_SECS: i64 = 10_800;

/// Shortened interval used until both trend slots hold data.
pub const BOOTSTRAP_REFRESH_SECS: i64 = 60;

/// Translate pressure in Pascals to pressure in mBar.
pub fn pa_to_mb(pressure_pa: u32) -> f32 {
    pressure_pa as f32 / 100.0
}

/// Translate local pressure in mBar to pressure at sea level in mBar.
///
/// Standard barometric formula with exponent -5.255. Single precision is
/// enough at sensor accuracy.
pub fn sea_level_pressure(pressure_mb: f32, elevation_m: i32, temperature_c: f32) -> f32 {
    let h = 0.0065 * elevation_m as f32;
    pressure_mb * (1.0 - h / (temperature_c + h + 273.15)).powf(-5.255)
}

/// Two-slot sea-level-pressure trend buffer with a time-gated refresh policy,
/// plus the outdoor averages the last refresh was computed from.
///
/// A slot holding 0.0 means "not yet populated"; the trend is defined as
/// zero until both slots are populated.
#[derive(Debug, Default)]
pub struct PressureTrend {
    // [older, newer]
    slots: [f32; 2],
    last_refresh: Option<OffsetDateTime>,
    average_pressure: u32,
    average_temperature: f32,
}

impl PressureTrend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate the outdoor readings and shift the trend buffer when the
    /// refresh policy says it is time: every 3 hours, or already after 60
    /// seconds while a slot is still unpopulated (bootstrap fast-fill).
    ///
    /// With no outdoor readings the divisor clamps to 1, so the "average" is
    /// the raw sum — zero here, which also skips the buffer shift. That
    /// degenerate case is intentional, not an error.
    pub fn refresh_if_due<'a, I>(&mut self, outdoor: I, elevation_m: i32, now: OffsetDateTime)
    where
        I: IntoIterator<Item = &'a SensorReading>,
    {
        if !self.refresh_due(now) {
            return;
        }

        let mut pressure_sum: u64 = 0;
        let mut temperature_sum: f32 = 0.0;
        let mut count: u32 = 0;
        for reading in outdoor {
            pressure_sum += reading.pressure as u64;
            temperature_sum += reading.temperature;
            count += 1;
        }

        let divisor = count.max(1);
        self.average_pressure = (pressure_sum / divisor as u64) as u32;
        self.average_temperature = temperature_sum / divisor as f32;

        if self.average_pressure == 0 {
            // Nothing to record; leave the refresh timer untouched so the
            // next readings are picked up as soon as they arrive.
            return;
        }

        let slp = sea_level_pressure(
            pa_to_mb(self.average_pressure),
            elevation_m,
            self.average_temperature,
        );
        self.slots[0] = self.slots[1];
        self.slots[1] = slp;
        self.last_refresh = Some(now);

        debug!("Oldest pressure data: {:.2}", self.slots[0]);
        debug!("Newest pressure data: {:.2}", self.slots[1]);
    }

    fn refresh_due(&self, now: OffsetDateTime) -> bool {
        let Some(last) = self.last_refresh else {
            return true;
        };
        let elapsed = seconds_since(last, now);
        elapsed >= TREND_REFRESH_SECS
            || (elapsed >= BOOTSTRAP_REFRESH_SECS && self.slots.contains(&0.0))
    }

    /// Sea-level-pressure change between the two buffer slots, in mBar over
    /// the refresh interval. Zero until both slots are populated.
    pub fn trend(&self) -> f32 {
        if self.slots.contains(&0.0) {
            0.0
        } else {
            self.slots[1] - self.slots[0]
        }
    }

    /// Average outdoor pressure from the last refresh, in Pa.
    pub fn average_pressure(&self) -> u32 {
        self.average_pressure
    }

    /// Average outdoor temperature from the last refresh, in °C.
    pub fn average_temperature(&self) -> f32 {
        self.average_temperature
    }
}
