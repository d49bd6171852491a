/// Latest-reading storage and advertisement payload decoding
use log::warn;
use time::OffsetDateTime;

use crate::models::{SensorDevice, SensorReading};
use crate::utils::seconds_since;

/// Sensor data format understood by the decoder (RuuviTag RAWv2).
const DATA_FORMAT: u8 = 5;

/// Minimum number of payload bytes holding format, temperature, humidity
/// and pressure.
const MIN_PAYLOAD_LEN: usize = 7;

/// Minimum seconds between two trend-eligible readings from one sensor.
pub const LOG_INTERVAL_SECS: i64 = 360;

/// Decode a manufacturer-data payload into a sensor reading
///
/// Fixed-offset extraction:
/// - Byte 0: data format tag (5)
/// - Bytes 1-2: temperature (signed 16-bit big-endian, 0.005 °C resolution)
/// - Bytes 3-4: humidity (unsigned 16-bit big-endian, 0.0025 % resolution)
/// - Bytes 5-6: pressure (unsigned 16-bit big-endian, +50000 Pa offset)
///
/// The caller is expected to have matched the manufacturer ID already; this
/// function only rejects short payloads and unknown format tags. There is no
/// checksum in the format.
pub fn decode_reading(data: &[u8]) -> Option<SensorReading> {
    if data.len() < MIN_PAYLOAD_LEN || data[0] != DATA_FORMAT {
        if !data.is_empty() {
            warn!(
                "Invalid advertisement payload: len={}, format={}",
                data.len(),
                data[0]
            );
        }
        return None;
    }

    let temperature = i16::from_be_bytes([data[1], data[2]]) as f32 * 0.005;
    let humidity = (u16::from_be_bytes([data[3], data[4]]) as f32 * 0.0025).min(100.0);
    let pressure = u16::from_be_bytes([data[5], data[6]]) as u32 + 50000;

    Some(SensorReading {
        format: data[0],
        temperature,
        humidity,
        pressure,
    })
}

/// Per-device storage: the latest live reading plus the timestamps backing
/// the display ("last seen") and the trend-eligibility gate ("last logged").
#[derive(Debug, Clone, Default)]
struct SensorSlot {
    reading: Option<SensorReading>,
    last_seen: Option<OffsetDateTime>,
    last_logged: Option<OffsetDateTime>,
    outdoor: bool,
    name: String,
}

/// Holds the latest reading per configured sensor. One slot per device,
/// indexed by the device's position in the configuration list; the count is
/// fixed after startup.
#[derive(Debug)]
pub struct SampleStore {
    slots: Vec<SensorSlot>,
}

impl SampleStore {
    pub fn new(devices: &[SensorDevice]) -> Self {
        let slots = devices
            .iter()
            .map(|device| SensorSlot {
                outdoor: device.is_outdoor(),
                name: device.name.clone(),
                ..SensorSlot::default()
            })
            .collect();
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Overwrite the live reading and last-seen timestamp for a device.
    /// Always applied, independent of the logging gate, so the display keeps
    /// showing the freshest values.
    pub fn update_live_reading(
        &mut self,
        index: usize,
        reading: SensorReading,
        now: OffsetDateTime,
    ) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.reading = Some(reading);
            slot.last_seen = Some(now);
        }
    }

    /// The 360-second trend-eligibility gate. Returns true, and stamps the
    /// log timestamp, when no reading from this device has been logged yet
    /// or the previous one is at least LOG_INTERVAL_SECS old.
    pub fn should_log_reading(&mut self, index: usize, now: OffsetDateTime) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        let due = match slot.last_logged {
            None => true,
            Some(last) => seconds_since(last, now) >= LOG_INTERVAL_SECS,
        };
        if due {
            slot.last_logged = Some(now);
        }
        due
    }

    pub fn reading(&self, index: usize) -> Option<&SensorReading> {
        self.slots.get(index).and_then(|slot| slot.reading.as_ref())
    }

    pub fn last_seen(&self, index: usize) -> Option<OffsetDateTime> {
        self.slots.get(index).and_then(|slot| slot.last_seen)
    }

    pub fn name(&self, index: usize) -> &str {
        self.slots.get(index).map(|slot| slot.name.as_str()).unwrap_or("unknown")
    }

    /// Readings from outdoor-placed sensors that have reported at least once.
    pub fn outdoor_readings(&self) -> impl Iterator<Item = &SensorReading> {
        self.slots
            .iter()
            .filter(|slot| slot.outdoor)
            .filter_map(|slot| slot.reading.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SensorDevice;

    fn devices() -> Vec<SensorDevice> {
        vec![
            SensorDevice {
                name: "Backyard".into(),
                placement: "outdoor".into(),
                address: "AA:BB:CC:DD:EE:01".into(),
            },
            SensorDevice {
                name: "Living room".into(),
                placement: "indoor".into(),
                address: "AA:BB:CC:DD:EE:02".into(),
            },
        ]
    }

    fn at(epoch: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(epoch).unwrap()
    }

    fn reading(pressure: u32, temperature: f32) -> SensorReading {
        SensorReading {
            format: 5,
            temperature,
            humidity: 50.0,
            pressure,
        }
    }

    #[test]
    fn decodes_known_payload() {
        // 24.3 °C, 53.49 %, 100044 Pa
        let payload = [5u8, 0x12, 0xFC, 0x53, 0x94, 0xC3, 0x7C];
        let decoded = decode_reading(&payload).unwrap();
        assert_eq!(decoded.format, 5);
        assert!((decoded.temperature - 24.3).abs() < 1e-3);
        assert!((decoded.humidity - 53.49).abs() < 1e-3);
        assert_eq!(decoded.pressure, 100_044);
    }

    #[test]
    fn decodes_negative_temperature() {
        // -10.0 °C is -2000 raw = 0xF830
        let payload = [5u8, 0xF8, 0x30, 0x00, 0x00, 0x00, 0x00];
        let decoded = decode_reading(&payload).unwrap();
        assert!((decoded.temperature + 10.0).abs() < 1e-3);
        assert_eq!(decoded.pressure, 50_000);
    }

    #[test]
    fn rejects_short_or_unknown_payloads() {
        assert!(decode_reading(&[]).is_none());
        assert!(decode_reading(&[5, 0, 0]).is_none());
        let wrong_format = [3u8, 0x12, 0xFC, 0x53, 0x94, 0xC3, 0x7C];
        assert!(decode_reading(&wrong_format).is_none());
    }

    #[test]
    fn live_reading_is_always_overwritten() {
        let mut store = SampleStore::new(&devices());
        store.update_live_reading(0, reading(100_000, 10.0), at(1000));
        store.update_live_reading(0, reading(100_100, 11.0), at(1001));
        let latest = store.reading(0).unwrap();
        assert_eq!(latest.pressure, 100_100);
        assert_eq!(store.last_seen(0), Some(at(1001)));
    }

    #[test]
    fn log_gate_opens_every_360_seconds() {
        let mut store = SampleStore::new(&devices());
        assert!(store.should_log_reading(0, at(1000)));
        assert!(!store.should_log_reading(0, at(1100)));
        assert!(!store.should_log_reading(0, at(1359)));
        assert!(store.should_log_reading(0, at(1360)));
        // Gate state is per-device.
        assert!(store.should_log_reading(1, at(1100)));
    }

    #[test]
    fn outdoor_readings_skip_indoor_and_silent_sensors() {
        let mut store = SampleStore::new(&devices());
        assert_eq!(store.outdoor_readings().count(), 0);
        store.update_live_reading(1, reading(100_000, 21.0), at(1000));
        assert_eq!(store.outdoor_readings().count(), 0);
        store.update_live_reading(0, reading(100_500, 4.0), at(1000));
        let outdoor: Vec<_> = store.outdoor_readings().collect();
        assert_eq!(outdoor.len(), 1);
        assert_eq!(outdoor[0].pressure, 100_500);
    }

    #[test]
    fn out_of_range_index_is_ignored() {
        let mut store = SampleStore::new(&devices());
        store.update_live_reading(7, reading(100_000, 10.0), at(1000));
        assert!(!store.should_log_reading(7, at(1000)));
        assert!(store.reading(7).is_none());
        assert_eq!(store.name(7), "unknown");
    }
}
