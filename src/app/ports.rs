//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Dispatcher (domain)
//! ```
//!
//! Driven adapters (mesh stack, flash store, display, LEDs, buttons, I²C)
//! implement these traits.  The [`Dispatcher`](super::service::Dispatcher)
//! receives them at call sites via generics, so the domain core never
//! touches hardware directly.
//!
//! Every fallible operation reports the collaborator's result code through a
//! typed error.  The dispatcher logs failures and carries on.

use crate::config::NodeConfig;
use crate::error::{BusError, ConfigError, InterruptError, StackError, StorageError};
use crate::events::{ModelEvent, TimerId};
use crate::session::PsKey;

// ───────────────────────────────────────────────────────────────
// Mesh / BLE stack port
// ───────────────────────────────────────────────────────────────

/// How the stack should come back up after a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Plain reboot into the application.
    Normal,
    /// Reboot into the OTA firmware-update loader.
    Dfu,
}

/// Commands the dispatcher issues to the radio/mesh stack.  Each returns
/// immediately; results arrive later as [`StackEvent`](crate::events::StackEvent)s.
pub trait MeshStackPort {
    /// Start the mesh node; answered by `NodeInitialized`.
    fn node_init(&mut self) -> Result<(), StackError>;

    /// Initialise the generic server model class.
    fn generic_server_init(&mut self) -> Result<(), StackError>;

    /// Take on the friend role for low-power peers.
    fn friend_init(&mut self) -> Result<(), StackError>;

    /// Beacon as unprovisioned on the given bearers (bit 0 ADV, bit 1 GATT).
    fn start_unprov_beaconing(&mut self, bearers: u8) -> Result<(), StackError>;

    fn close_connection(&mut self, connection: u8) -> Result<(), StackError>;

    /// Drop provisioning data and keys held by the stack, through the
    /// stack itself.
    fn reset_network_state(&mut self) -> Result<(), StackError>;

    /// Reboot.  Does not return on hardware.
    fn system_reset(&mut self, mode: ResetMode);

    /// Write the GATT device-name attribute.
    fn write_device_name(&mut self, name: &str) -> Result<(), StackError>;

    /// Acknowledge a user write request on `characteristic`.
    fn send_user_write_response(
        &mut self,
        connection: u8,
        characteristic: u16,
        att_result: u8,
    ) -> Result<(), StackError>;

    /// The radio's public address, least-significant byte first.
    fn bt_address(&mut self) -> [u8; 6];

    /// Arm a software timer.  A `period_ms` of zero disarms it.
    fn set_soft_timer(
        &mut self,
        timer: TimerId,
        period_ms: u32,
        one_shot: bool,
    ) -> Result<(), StackError>;
}

// ───────────────────────────────────────────────────────────────
// Model port (opaque generic-server hand-off)
// ───────────────────────────────────────────────────────────────

pub trait ModelPort {
    /// Register the generic on/off and level request handlers.
    fn register_handlers(&mut self) -> Result<(), StackError>;

    /// Initialise model state and publish it.
    fn init_models(&mut self) -> Result<(), StackError>;

    /// Hand a server event to the model library, uninterpreted.
    fn handle_model_event(&mut self, event: &ModelEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for the three session fields.
pub trait StoragePort {
    /// Write a value atomically.
    fn save(&mut self, key: PsKey, data: &[u8]) -> Result<(), StorageError>;

    /// Read a value.  Returns the number of bytes written to `buf`.
    fn load(&mut self, key: PsKey, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Erase the node's own keys.  Network state belongs to the stack and
    /// is dropped by [`MeshStackPort::reset_network_state`].
    fn erase_all(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists node configuration.
///
/// Implementations MUST call [`NodeConfig::validate`] before persisting and
/// reject invalid values with [`ConfigError::ValidationFailed`].
pub trait ConfigPort {
    /// Load configuration, or [`NodeConfig::default()`] if none is stored.
    fn load_config(&self) -> Result<NodeConfig, ConfigError>;

    fn save_config(&mut self, config: &NodeConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Presentation
// ───────────────────────────────────────────────────────────────

/// Fixed rows of the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayRow {
    Name,
    Address,
    Connection,
    /// Provisioning / action status.
    Status,
    Humidity,
    Authority,
    Friend,
    AlertCaretaker,
    AlertPatient,
}

impl DisplayRow {
    pub const COUNT: usize = 9;

    pub const ALL: [DisplayRow; Self::COUNT] = [
        Self::Name,
        Self::Address,
        Self::Connection,
        Self::Status,
        Self::Humidity,
        Self::Authority,
        Self::Friend,
        Self::AlertCaretaker,
        Self::AlertPatient,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

pub trait DisplayPort {
    /// Replace the text of one row.
    fn print(&mut self, row: DisplayRow, text: &str);

    /// Periodic refresh, driven by the display timer.
    fn update(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Indicators and inputs
// ───────────────────────────────────────────────────────────────

/// The two alert LEDs.  LED0 doubles as the provisioning blink.
pub trait IndicatorPort {
    /// Both LEDs on until cleared.
    fn raise_alert(&mut self);

    /// Both LEDs off.
    fn clear_alert(&mut self);

    fn toggle_provisioning_led(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Pb0,
    Pb1,
}

pub trait InputPort {
    /// Live level of `button`; `true` while held (active-low pin reads 0).
    fn button_pressed(&mut self, button: Button) -> bool;

    fn enable_button_interrupts(&mut self) -> Result<(), InterruptError>;

    /// Arm the PIR interrupt.
    fn enable_motion_interrupt(&mut self) -> Result<(), InterruptError>;

    /// Start the periodic acquisition tick.
    fn start_acquisition_timer(&mut self, period_ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Sensor bus
// ───────────────────────────────────────────────────────────────

/// Non-blocking two-wire bus.  At most one transfer is outstanding;
/// completion arrives as a signal, never by polling.
pub trait BusPort {
    /// Arm a one-byte command write.  `Err(BusError::Busy)` if a transfer is
    /// already outstanding.
    fn start_write(&mut self, command: u8) -> Result<(), BusError>;

    /// Arm a read of `len` bytes.  `Err(BusError::Busy)` if a transfer is
    /// already outstanding.
    fn start_read(&mut self, len: usize) -> Result<(), BusError>;

    /// Copy out the bytes of the last completed read.
    fn read_result(&mut self, buf: &mut [u8]) -> Result<usize, BusError>;
}

// ───────────────────────────────────────────────────────────────
// Bundle
// ───────────────────────────────────────────────────────────────

/// Everything the dispatcher talks to, as one borrow.
pub trait NodePorts:
    MeshStackPort + ModelPort + StoragePort + DisplayPort + IndicatorPort + InputPort + BusPort
{
}

impl<T> NodePorts for T where
    T: MeshStackPort + ModelPort + StoragePort + DisplayPort + IndicatorPort + InputPort + BusPort
{
}
