/// Radio mode arbitration: Wi-Fi for time sync first, then Bluetooth
use log::info;
use time::OffsetDateTime;

use crate::utils::seconds_since;

/// Half-period of the Bluetooth scan duty cycle: scan for 10 seconds, then
/// pause for 10 seconds.
pub const SCAN_TOGGLE_SECS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioState {
    Disconnected,
    SyncingTime,
    ConnectedIdle,
    BluetoothActive,
}

/// Commands the arbiter asks the main loop to execute against the network
/// and Bluetooth collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioCommand {
    ConnectNetwork,
    SyncTime,
    DisconnectNetwork,
    ConfigureBluetooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanCommand {
    Start,
    Stop,
}

/// State machine governing mutually exclusive use of the Wi-Fi and
/// Bluetooth radios. The network is only needed until the clock is set;
/// after that the radio belongs to Bluetooth scanning.
///
/// The mutual exclusion is a sequencing guarantee: DisconnectNetwork is
/// always commanded before ConfigureBluetooth can be, never a hardware
/// lockout.
#[derive(Debug, Default)]
pub struct RadioArbiter {
    state: RadioState,
    bluetooth_configured: bool,
    scanning: bool,
    scan_timer: Option<OffsetDateTime>,
}

impl Default for RadioState {
    fn default() -> Self {
        RadioState::Disconnected
    }
}

impl RadioArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RadioState {
        self.state
    }

    pub fn bluetooth_configured(&self) -> bool {
        self.bluetooth_configured
    }

    pub fn scanning(&self) -> bool {
        self.scanning
    }

    /// Evaluate the transition rules once, in priority order, against the
    /// current network facts. A failed command leaves the facts unchanged,
    /// so the same command is simply emitted again next tick; there is no
    /// backoff.
    pub fn tick(&mut self, connected: bool, time_synced: bool) -> Option<RadioCommand> {
        let command = if !connected && !time_synced {
            Some(RadioCommand::ConnectNetwork)
        } else if connected && !time_synced {
            Some(RadioCommand::SyncTime)
        } else if time_synced && connected {
            Some(RadioCommand::DisconnectNetwork)
        } else if !self.bluetooth_configured {
            // Not connected, time synced: the radio is free for Bluetooth.
            Some(RadioCommand::ConfigureBluetooth)
        } else {
            None
        };

        self.state = match (connected, time_synced, self.bluetooth_configured) {
            (_, false, _) => RadioState::SyncingTime,
            (true, true, _) => RadioState::ConnectedIdle,
            (false, true, true) => RadioState::BluetoothActive,
            // Waiting for Bluetooth configuration to be confirmed.
            (false, true, false) => RadioState::Disconnected,
        };

        command
    }

    /// Confirmation from the main loop that Bluetooth setup succeeded.
    /// Idempotent: once set, ConfigureBluetooth is never emitted again.
    pub fn mark_bluetooth_configured(&mut self) {
        if !self.bluetooth_configured {
            info!("Bluetooth configured");
            self.bluetooth_configured = true;
        }
    }

    /// Duty-cycle the Bluetooth scan once the network is down and Bluetooth
    /// is configured: a single elapsed-time timer toggles between scanning
    /// and pausing every SCAN_TOGGLE_SECS.
    pub fn control_scanning(&mut self, connected: bool, now: OffsetDateTime) -> Option<ScanCommand> {
        if connected || !self.bluetooth_configured {
            return None;
        }

        match self.scan_timer {
            None => {
                self.scan_timer = Some(now);
                self.scanning = true;
                Some(ScanCommand::Start)
            }
            Some(since) if seconds_since(since, now) >= SCAN_TOGGLE_SECS => {
                self.scan_timer = Some(now);
                self.scanning = !self.scanning;
                Some(if self.scanning {
                    ScanCommand::Start
                } else {
                    ScanCommand::Stop
                })
            }
            Some(_) => None,
        }
    }
}
