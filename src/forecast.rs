/// Zambretti forecaster: pressure-change bands and the forecast table
use time::Month;

use crate::climate::{pa_to_mb, sea_level_pressure};

/// One band of the pressure-change scale. Bands are ordered by descending
/// threshold; a change belongs to the first band whose threshold it exceeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureChange {
    pub threshold: f32,      // mBar over the refresh interval
    pub indication: &'static str,
    pub baro_trend: i8,      // Zambretti barometric trend
}

pub const CHANGE_BANDS: [PressureChange; 9] = [
    PressureChange { threshold: 6.0, indication: "Rising Very Rapidly", baro_trend: 4 },
    PressureChange { threshold: 3.6, indication: "Rising Quickly", baro_trend: 3 },
    PressureChange { threshold: 1.6, indication: "Rising", baro_trend: 2 },
    PressureChange { threshold: 0.1, indication: "Rising Slowly", baro_trend: 1 },
    PressureChange { threshold: -0.1, indication: "Steady", baro_trend: 0 },
    PressureChange { threshold: -1.6, indication: "Falling Slowly", baro_trend: -1 },
    PressureChange { threshold: -3.6, indication: "Falling", baro_trend: -2 },
    PressureChange { threshold: -6.0, indication: "Falling Quickly", baro_trend: -3 },
    PressureChange { threshold: -6.0, indication: "Falling Very Rapidly", baro_trend: -4 },
];

/// A Zambretti forecast: a letter code and its description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZambrettiForecast {
    pub letter: char,
    pub description: &'static str,
}

const fn entry(letter: char, description: &'static str) -> ZambrettiForecast {
    ZambrettiForecast { letter, description }
}

// Start of the steady and rising zones within the table; the falling zone
// occupies the entries before STEADY_ZONE.
const STEADY_ZONE: usize = 9;
const RISING_ZONE: usize = 19;

/// The forecast table, indexed by Z number - 1. Entries 1-9 are reached by
/// the falling formula, 10-19 by the steady formula and 20-32 by the rising
/// formula.
const FORECAST_TABLE: [ZambrettiForecast; 32] = [
    // Falling barometer
    entry('A', "Settled Fine"),
    entry('B', "Fine Weather"),
    entry('D', "Fine Becoming Less Settled"),
    entry('H', "Fairly Fine Showery Later"),
    entry('O', "Showery Becoming more unsettled"),
    entry('R', "Unsettled, Rain later"),
    entry('U', "Rain at times, worse later"),
    entry('V', "Rain at times, becoming very unsettled"),
    entry('X', "Very Unsettled, Rain"),
    // Steady barometer
    entry('A', "Settled Fine"),
    entry('B', "Fine Weather"),
    entry('E', "Fine, Possibly showers"),
    entry('K', "Fairly Fine, Showers likely"),
    entry('N', "Showery Bright Intervals"),
    entry('P', "Changeable some rain"),
    entry('S', "Unsettled, rain at times"),
    entry('W', "Rain at Frequent Intervals"),
    entry('X', "Very Unsettled, Rain"),
    entry('Z', "Stormy, much rain"),
    // Rising barometer
    entry('A', "Settled Fine"),
    entry('B', "Fine Weather"),
    entry('C', "Becoming Fine"),
    entry('F', "Fairly Fine, Improving"),
    entry('G', "Fairly Fine, Possibly showers, early"),
    entry('I', "Showery Early, Improving"),
    entry('J', "Changeable Mending"),
    entry('L', "Rather Unsettled Clearing Later"),
    entry('M', "Unsettled, Probably Improving"),
    entry('Q', "Unsettled, short fine Intervals"),
    entry('T', "Very Unsettled, Finer at times"),
    entry('Y', "Stormy, possibly improving"),
    entry('Z', "Stormy, much rain"),
];

/// Classify a pressure change into its band.
///
/// Scans the bands in descending threshold order with a strict
/// greater-than rule; anything at or below -6.0 lands in the catch-all
/// "Falling Very Rapidly" band. Steady is the fallback for inputs that
/// match no band at all (NaN).
pub fn trend_category(change: f32) -> PressureChange {
    for band in &CHANGE_BANDS[..8] {
        if change > band.threshold {
            return *band;
        }
    }
    if change <= CHANGE_BANDS[8].threshold {
        return CHANGE_BANDS[8];
    }
    CHANGE_BANDS[4]
}

/// May through October counts as summer. Northern-hemisphere convention,
/// not geography-aware.
pub fn is_summer(month: Month) -> bool {
    (5..=10).contains(&u8::from(month))
}

/// Get a forecast based on the Zambretti algorithm.
///
/// Recomputes the sea-level pressure from the raw averages so the lookup
/// reflects current conditions rather than the trend buffer. Pure numeric
/// function: every input yields a table entry, the Z number is clamped by
/// one step when it falls outside 1..=32.
pub fn forecast(
    avg_pressure_pa: u32,
    elevation_m: i32,
    avg_temperature_c: f32,
    trend_sign: i8,
    summer: bool,
) -> ZambrettiForecast {
    let pressure = sea_level_pressure(pa_to_mb(avg_pressure_pa), elevation_m, avg_temperature_c)
        as i32;

    let mut z: i32 = if trend_sign > 0 {
        // For a rising barometer Z = 179 - P * 0.16, one less in summer.
        179 - (20 * pressure) / 129 - i32::from(summer)
    } else if trend_sign < 0 {
        // For a falling barometer Z = 130 - P * 0.12, one less in winter.
        130 - (10 * pressure) / 81 - i32::from(!summer)
    } else {
        // For a steady barometer Z = 147 - P * 0.13.
        147 - (50 * pressure) / 376
    };

    // Make sure we're not out of bounds.
    let len = FORECAST_TABLE.len() as i32;
    if z >= len {
        z -= 1;
    } else if z < 1 {
        z += 1;
    }

    FORECAST_TABLE[(z - 1) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::{PressureTrend, TREND_REFRESH_SECS};
    use crate::models::SensorReading;
    use time::OffsetDateTime;

    #[test]
    fn trend_category_bands_are_table_driven() {
        let cases = [
            (7.0, 4, "Rising Very Rapidly"),
            (6.1, 4, "Rising Very Rapidly"),
            // Strict greater-than: exactly 6.0 drops into the next band.
            (6.0, 3, "Rising Quickly"),
            (3.7, 3, "Rising Quickly"),
            (3.6, 2, "Rising"),
            (1.6, 1, "Rising Slowly"),
            (0.2, 1, "Rising Slowly"),
            (0.1, 0, "Steady"),
            (0.0, 0, "Steady"),
            (-0.1, -1, "Falling Slowly"),
            (-1.6, -2, "Falling"),
            (-3.6, -3, "Falling Quickly"),
            (-6.0, -4, "Falling Very Rapidly"),
            (-7.0, -4, "Falling Very Rapidly"),
        ];
        for (change, baro_trend, indication) in cases {
            let band = trend_category(change);
            assert_eq!(band.baro_trend, baro_trend, "change {}", change);
            assert_eq!(band.indication, indication, "change {}", change);
        }
    }

    #[test]
    fn trend_category_falls_back_to_steady_for_nan() {
        assert_eq!(trend_category(f32::NAN).baro_trend, 0);
    }

    #[test]
    fn summer_is_may_through_october() {
        assert!(!is_summer(Month::April));
        assert!(is_summer(Month::May));
        assert!(is_summer(Month::October));
        assert!(!is_summer(Month::November));
        assert!(!is_summer(Month::January));
    }

    #[test]
    fn z_number_never_escapes_the_table() {
        // Sweep the plausible pressure range for all trend signs and both
        // seasons; the clamp must keep every lookup in bounds. An
        // out-of-bounds index would panic here.
        for mb in 950..=1050 {
            let pa = (mb * 100) as u32;
            for trend_sign in [-1i8, 0, 1] {
                for summer in [false, true] {
                    let f = forecast(pa, 0, 15.0, trend_sign, summer);
                    assert!(f.letter.is_ascii_uppercase());
                }
            }
        }
    }

    #[test]
    fn low_z_is_shifted_up_by_one_step() {
        // Falling barometer at 1050 mBar in winter: Z = 130 - 129 - 1 = 0,
        // clamped up to 1 = entry 'A'.
        let f = forecast(105_000, 0, 15.0, -1, false);
        assert_eq!(f.letter, 'A');
    }

    #[test]
    fn high_z_is_shifted_down_by_one_step() {
        // Rising barometer at 950 mBar in winter: Z = 179 - 147 = 32,
        // clamped down to 31 = entry 'Y'.
        let f = forecast(95_000, 0, 15.0, 1, false);
        assert_eq!(f.letter, 'Y');
    }

    #[test]
    fn trend_sign_selects_the_matching_zone() {
        // In the typical pressure range each trend sign lands in its own
        // zone of the table. At the extremes the Z formulas deliberately
        // spill into the neighbouring zones, so the sweep stays typical.
        for mb in 1000..=1025 {
            let pa = (mb * 100) as u32;
            for summer in [false, true] {
                let rising = forecast(pa, 0, 15.0, 1, summer);
                assert!(FORECAST_TABLE[RISING_ZONE..].contains(&rising));
                let falling = forecast(pa, 0, 15.0, -1, summer);
                assert!(FORECAST_TABLE[..STEADY_ZONE].contains(&falling));
                let steady = forecast(pa, 0, 15.0, 0, summer);
                assert!(FORECAST_TABLE[STEADY_ZONE..RISING_ZONE].contains(&steady));
            }
        }
    }

    #[test]
    fn rising_outdoor_pressure_yields_a_rising_zone_forecast() {
        // End to end: two outdoor readings 3+ hours apart at 11 m elevation.
        let mut trend = PressureTrend::new();
        let t0 = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let first = SensorReading {
            format: 5,
            temperature: 18.0,
            humidity: 60.0,
            pressure: 101_325,
        };
        let second = SensorReading {
            format: 5,
            temperature: 19.0,
            humidity: 60.0,
            pressure: 101_700,
        };
        trend.refresh_if_due([first].iter(), 11, t0);
        trend.refresh_if_due(
            [second].iter(),
            11,
            t0 + time::Duration::seconds(TREND_REFRESH_SECS),
        );

        let category = trend_category(trend.trend());
        assert!(category.baro_trend > 0, "expected a rising trend");

        let f = forecast(
            trend.average_pressure(),
            11,
            trend.average_temperature(),
            category.baro_trend,
            true,
        );
        assert!(
            FORECAST_TABLE[RISING_ZONE..].contains(&f),
            "forecast {:?} not in the rising zone",
            f
        );
    }
}
