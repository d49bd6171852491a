/// Read-only state snapshot consumed by the display component
use time::OffsetDateTime;

use crate::climate::PressureTrend;
use crate::forecast::{self, ZambrettiForecast};
use crate::models::SensorReading;
use crate::store::SampleStore;
use crate::wireless::{RadioArbiter, RadioState};

/// Latest state of one configured sensor, for the climate rows on the
/// display.
#[derive(Debug, Clone)]
pub struct SensorStatus {
    pub name: String,
    pub reading: Option<SensorReading>,
    pub last_seen: Option<OffsetDateTime>,
}

/// Everything the renderer needs in one value: climate figures, the current
/// forecast, per-sensor readings and the radio flags. The core never draws
/// anything itself.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub trend_mbar: f32,
    pub trend_indication: &'static str,
    pub average_pressure_pa: u32,
    pub average_temperature_c: f32,
    pub forecast: Option<ZambrettiForecast>,
    pub sensors: Vec<SensorStatus>,
    pub radio_state: RadioState,
    pub bluetooth_configured: bool,
    pub scanning: bool,
}

impl StatusSnapshot {
    pub fn collect(
        store: &SampleStore,
        trend: &PressureTrend,
        arbiter: &RadioArbiter,
        elevation_m: i32,
        summer: bool,
    ) -> Self {
        let change = trend.trend();
        let category = forecast::trend_category(change);
        // No forecast until outdoor pressure data exists.
        let forecast = (trend.average_pressure() > 0).then(|| {
            forecast::forecast(
                trend.average_pressure(),
                elevation_m,
                trend.average_temperature(),
                category.baro_trend,
                summer,
            )
        });

        let sensors = (0..store.len())
            .map(|index| SensorStatus {
                name: store.name(index).to_string(),
                reading: store.reading(index).copied(),
                last_seen: store.last_seen(index),
            })
            .collect();

        Self {
            trend_mbar: change,
            trend_indication: category.indication,
            average_pressure_pa: trend.average_pressure(),
            average_temperature_c: trend.average_temperature(),
            forecast,
            sensors,
            radio_state: arbiter.state(),
            bluetooth_configured: arbiter.bluetooth_configured(),
            scanning: arbiter.scanning(),
        }
    }
}
