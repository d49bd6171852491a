mod bluetooth;
mod climate;
mod config;
mod forecast;
mod models;
mod status;
mod store;
mod utils;
mod wireless;

use log::{debug, error, info, warn};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use bluetooth::{AdvertisementEvent, BleScanner};
use climate::PressureTrend;
use config::Config;
use status::StatusSnapshot;
use store::SampleStore;
use utils::format_datetime;
use wireless::{RadioArbiter, RadioCommand, ScanCommand};

const POLL_INTERVAL_MS: u64 = 250;
// Epoch seconds below this count as "clock never set".
const CLOCK_SANITY_EPOCH: i64 = 57_600;
const NTP_PROBE_HOST: &str = "pool.ntp.org:123";

/// The two facts driving the radio arbiter. Updated only by the command
/// handlers below, read once per poll iteration.
#[derive(Debug, Default)]
struct NetworkFacts {
    connected: bool,
    time_synced: bool,
}

/// Attempt to bring up the network. On a hosted system association is the
/// operating system's job; reachability of the NTP pool stands in for
/// "link up".
async fn connect_network(facts: &mut NetworkFacts) {
    match tokio::net::lookup_host(NTP_PROBE_HOST).await {
        Ok(mut addrs) => {
            facts.connected = addrs.next().is_some();
            if facts.connected {
                info!("Network connection established");
            }
        }
        Err(e) => {
            warn!("Network connection attempt failed: {}", e);
            facts.connected = false;
        }
    }
}

/// Check whether the wall clock is usable. The OS NTP daemon owns the
/// clock; accept it once it is past the sanity threshold, the same check
/// the device applies to a raw NTP response.
fn sync_time(facts: &mut NetworkFacts, now: OffsetDateTime) {
    if now.unix_timestamp() > CLOCK_SANITY_EPOCH {
        info!("Time set from network: {}", format_datetime(&now));
        facts.time_synced = true;
    } else {
        info!("No good time from network yet, will try again");
        facts.time_synced = false;
    }
}

/// Decode an advertisement into the sample store and, when the logging gate
/// opens, report the device's reading together with the current trend and
/// forecast.
fn handle_advertisement(
    event: AdvertisementEvent,
    store: &mut SampleStore,
    trend: &PressureTrend,
    config: &Config,
    now: OffsetDateTime,
) {
    let Some(reading) = store::decode_reading(&event.payload) else {
        return;
    };
    store.update_live_reading(event.device_index, reading, now);

    if !store.should_log_reading(event.device_index, now) {
        return;
    }

    info!(
        "Logging device {}: {:.2}°C, {:.2}%, {} Pa",
        store.name(event.device_index),
        reading.temperature,
        reading.humidity,
        reading.pressure
    );

    let change = trend.trend();
    let category = forecast::trend_category(change);
    info!("Current pressure trend: {:.2} mBar", change);
    info!(
        "Zambretti trend: {} ({})",
        category.baro_trend, category.indication
    );

    if trend.average_pressure() > 0 {
        let f = forecast::forecast(
            trend.average_pressure(),
            config.location.elevation,
            trend.average_temperature(),
            category.baro_trend,
            forecast::is_summer(now.month()),
        );
        info!("Forecast {}: {}", f.letter, f.description);
    }
}

/// The cooperative poll loop. One iteration advances the radio state
/// machine, runs the scan duty cycle, feeds received advertisements into
/// the sample store, refreshes the pressure trend and publishes a status
/// snapshot — in that fixed order, then sleeps.
async fn main_loop(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting home environment monitor");

    let mut store = SampleStore::new(&config.sensors);
    let mut trend = PressureTrend::new();
    let mut arbiter = RadioArbiter::new();
    let mut facts = NetworkFacts::default();

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut scanner = BleScanner::new(&config, events_tx);

    loop {
        let now = OffsetDateTime::now_utc();

        // 1. Radio state machine.
        match arbiter.tick(facts.connected, facts.time_synced) {
            Some(RadioCommand::ConnectNetwork) => {
                info!("No network connection, trying to connect");
                connect_network(&mut facts).await;
            }
            Some(RadioCommand::SyncTime) => sync_time(&mut facts, now),
            Some(RadioCommand::DisconnectNetwork) => {
                info!("No more need for network, disconnecting");
                facts.connected = false;
            }
            Some(RadioCommand::ConfigureBluetooth) => {
                info!("Time is set and network disconnected, setting up Bluetooth");
                match scanner.configure().await {
                    Ok(()) => arbiter.mark_bluetooth_configured(),
                    Err(e) => error!("Bluetooth configuration failed: {}", e),
                }
            }
            None => {}
        }

        // 2. Scan duty cycle.
        match arbiter.control_scanning(facts.connected, now) {
            Some(ScanCommand::Start) => {
                if let Err(e) = scanner.start().await {
                    error!("Failed to start BLE scan: {}", e);
                }
            }
            Some(ScanCommand::Stop) => scanner.stop(),
            None => {}
        }

        // 3. Advertisement events received since the last iteration.
        while let Ok(event) = events_rx.try_recv() {
            handle_advertisement(event, &mut store, &trend, &config, now);
        }

        // 4. Pressure trend refresh.
        trend.refresh_if_due(store.outdoor_readings(), config.location.elevation, now);

        // 5. Snapshot for the display component.
        let snapshot = StatusSnapshot::collect(
            &store,
            &trend,
            &arbiter,
            config.location.elevation,
            forecast::is_summer(now.month()),
        );
        debug!("Status: {:?}", snapshot);

        sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        let _ = tx.send(());
    });

    // Run main loop or wait for shutdown signal
    tokio::select! {
        result = main_loop(config) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
