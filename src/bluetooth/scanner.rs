/// Bluetooth Low Energy scanning and advertisement event delivery
use futures_util::StreamExt;
use log::{debug, error, warn};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;

// Ruuvi Innovations Ltd. manufacturer ID
pub const RUUVI_MANUFACTURER_ID: u16 = 0x0499;

/// One received advertisement from a configured sensor: the device's index
/// in the configuration list plus the raw manufacturer-data payload. The
/// sample store decodes it.
#[derive(Debug, Clone)]
pub struct AdvertisementEvent {
    pub device_index: usize,
    pub payload: Vec<u8>,
}

/// BLE scanner built on bluer. Configuration (session, adapter, discovery
/// filter) happens once; scanning is started and stopped by the radio
/// arbiter's duty cycle. Advertisements from configured addresses are
/// delivered as events on an mpsc channel.
pub struct BleScanner {
    addresses: HashMap<String, usize>,
    events: mpsc::UnboundedSender<AdvertisementEvent>,
    session: Option<bluer::Session>,
    adapter: Option<bluer::Adapter>,
    task: Option<JoinHandle<()>>,
}

impl BleScanner {
    pub fn new(config: &Config, events: mpsc::UnboundedSender<AdvertisementEvent>) -> Self {
        let addresses = config
            .sensors
            .iter()
            .enumerate()
            .map(|(index, device)| (device.address.to_uppercase(), index))
            .collect();
        Self {
            addresses,
            events,
            session: None,
            adapter: None,
            task: None,
        }
    }

    /// Set up the Bluetooth session and adapter. Safe to call again after a
    /// failure; does nothing once configured.
    pub async fn configure(&mut self) -> bluer::Result<()> {
        if self.adapter.is_some() {
            return Ok(());
        }

        let session = bluer::Session::new().await?;
        let adapter = session.default_adapter().await?;
        adapter.set_powered(true).await?;

        // Configure discovery filter for Low Energy devices only
        let filter = bluer::DiscoveryFilter {
            transport: bluer::DiscoveryTransport::Le,
            duplicate_data: false,
            ..Default::default()
        };
        if let Err(e) = adapter.set_discovery_filter(filter).await {
            warn!("Failed to set discovery filter: {}", e);
        }

        self.session = Some(session);
        self.adapter = Some(adapter);
        Ok(())
    }

    /// Start a discovery pass in the background. Discovered devices whose
    /// address matches a configured sensor have their manufacturer data
    /// forwarded as advertisement events.
    pub async fn start(&mut self) -> bluer::Result<()> {
        let Some(adapter) = self.adapter.clone() else {
            return Ok(());
        };
        if self.task.is_some() {
            return Ok(());
        }

        let discovery = adapter.discover_devices().await?;
        let addresses = self.addresses.clone();
        let events = self.events.clone();

        self.task = Some(tokio::spawn(async move {
            let mut stream = discovery;
            while let Some(event) = stream.next().await {
                let bluer::AdapterEvent::DeviceAdded(addr) = event else {
                    continue;
                };
                let addr_str = addr.to_string().to_uppercase();
                let Some(&device_index) = addresses.get(&addr_str) else {
                    continue;
                };
                let device = match adapter.device(addr) {
                    Ok(device) => device,
                    Err(_) => continue,
                };
                match device.manufacturer_data().await {
                    Ok(Some(manufacturer_data)) => {
                        if let Some(payload) = manufacturer_data.get(&RUUVI_MANUFACTURER_ID) {
                            debug!(
                                "Advertisement from {} ({} bytes)",
                                addr_str,
                                payload.len()
                            );
                            if events
                                .send(AdvertisementEvent {
                                    device_index,
                                    payload: payload.clone(),
                                })
                                .is_err()
                            {
                                // Receiver gone, the loop is shutting down.
                                return;
                            }
                        }
                    }
                    Ok(None) => {
                        debug!("No manufacturer data for {}", addr_str);
                    }
                    Err(e) => {
                        debug!("Failed to get manufacturer data for {}: {}", addr_str, e);
                    }
                }
            }
            error!("BLE discovery stream ended unexpectedly");
        }));
        Ok(())
    }

    /// Stop the current discovery pass, if any.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for BleScanner {
    fn drop(&mut self) {
        self.stop();
    }
}
