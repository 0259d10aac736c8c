//! Alert and session state.
//!
//! One `SessionState` exists for the life of the process.  It is owned by
//! the [`Dispatcher`](crate::app::service::Dispatcher) and mutated only from
//! the main loop, so none of it needs atomics or locks.

use crate::sensors::Reading;

/// Keys of the three persisted fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PsKey {
    /// Alerts cleared by the button (1 byte).
    AlertsCleared = 0x4001,
    /// Highest reading seen (4-byte little-endian f32).
    MaxReading = 0x4002,
    /// Authorised personnel present (1 byte, 0/1).
    AuthorizedPersonnel = 0x4003,
}

impl PsKey {
    pub const ALL: [PsKey; 3] = [
        PsKey::AlertsCleared,
        PsKey::MaxReading,
        PsKey::AuthorizedPersonnel,
    ];

    pub const fn id(self) -> u16 {
        self as u16
    }

    /// Stored size in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::AlertsCleared | Self::AuthorizedPersonnel => 1,
            Self::MaxReading => 4,
        }
    }

    /// NVS key string.
    pub fn nvs_key(self) -> &'static str {
        match self {
            Self::AlertsCleared => "alerts_clr",
            Self::MaxReading => "max_rd",
            Self::AuthorizedPersonnel => "auth_pers",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    // -- Connection --
    /// Handle of the open BLE connection, if any.
    pub connection: Option<u8>,
    pub active_connections: u8,
    /// A write to the OTA control characteristic was seen; the next
    /// connection close reboots into the update loader.
    pub dfu_pending: bool,

    // -- Alerting --
    pub authorized_personnel: bool,
    /// Wraps at 255 like its 1-byte persisted slot.
    pub alerts_cleared: u8,
    pub alert_active: bool,
    /// High-water mark of published readings.
    pub max_reading: Option<Reading>,

    // -- Mesh --
    pub provisioned_address: Option<u16>,
    pub friend_peers: u8,
    /// Provisioned and models running; stops the provisioning blink.
    pub init_done: bool,
    pub server_initialized: bool,
    pub models_registered: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection.  Returns the resulting count.
    pub fn open_connection(&mut self, handle: u8) -> u8 {
        self.connection = Some(handle);
        self.active_connections = self.active_connections.saturating_add(1);
        self.active_connections
    }

    /// Record a close.  Returns `true` when the count transitions to zero.
    pub fn close_connection(&mut self) -> bool {
        self.connection = None;
        if self.active_connections == 0 {
            return false;
        }
        self.active_connections -= 1;
        self.active_connections == 0
    }

    /// Raise the high-water mark.  Returns `true` if `reading` is a new
    /// maximum.
    pub fn observe_reading(&mut self, reading: Reading) -> bool {
        match self.max_reading {
            Some(max) if reading <= max => false,
            _ => {
                self.max_reading = Some(reading);
                true
            }
        }
    }

    pub fn record_alert_cleared(&mut self) -> u8 {
        self.alerts_cleared = self.alerts_cleared.wrapping_add(1);
        self.alerts_cleared
    }

    // -- Persistence encoding --

    pub fn encode(&self, key: PsKey, buf: &mut [u8; 4]) -> usize {
        match key {
            PsKey::AlertsCleared => buf[0] = self.alerts_cleared,
            PsKey::AuthorizedPersonnel => buf[0] = u8::from(self.authorized_personnel),
            PsKey::MaxReading => {
                *buf = self.max_reading.unwrap_or_default().0.to_le_bytes();
            }
        }
        key.size()
    }

    /// Apply a loaded value.  A short buffer leaves the field untouched.
    pub fn apply(&mut self, key: PsKey, bytes: &[u8]) -> bool {
        if bytes.len() < key.size() {
            return false;
        }
        match key {
            PsKey::AlertsCleared => self.alerts_cleared = bytes[0],
            PsKey::AuthorizedPersonnel => self.authorized_personnel = bytes[0] != 0,
            PsKey::MaxReading => {
                let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
                let value = f32::from_le_bytes(raw);
                self.max_reading = value.is_finite().then_some(Reading(value));
            }
        }
        true
    }
}
