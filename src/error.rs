//! Unified error types for the MeshNode firmware.
//!
//! Every collaborator the node talks to (radio stack, flash store, sensor
//! bus) reports failure through a small `Copy` error.  [`Error`] wraps them
//! so the binary's bootstrap path can funnel everything through one type.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A radio/mesh stack command returned a non-zero result code.
    Stack(StackError),
    /// The persistent key-value store rejected a load/save/erase.
    Storage(StorageError),
    /// The sensor bus refused or failed a transfer.
    Bus(BusError),
    /// Node configuration could not be loaded or failed validation.
    Config(ConfigError),
    /// A GPIO interrupt could not be armed.
    Interrupt(InterruptError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stack(e) => write!(f, "stack: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Interrupt(e) => write!(f, "interrupt: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Stack errors
// ---------------------------------------------------------------------------

/// Non-zero result code returned by a radio/mesh stack command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackError(pub u16);

impl StackError {
    pub const fn code(self) -> u16 {
        self.0
    }
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "result 0x{:04x}", self.0)
    }
}

impl From<StackError> for Error {
    fn from(e: StackError) -> Self {
        Self::Stack(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Stored value has a different size than the field expects.
    SizeMismatch,
    /// Storage partition is full.
    Full,
    /// Generic I/O error with the backend's result code.
    Io(i32),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::SizeMismatch => write!(f, "stored size mismatch"),
            Self::Full => write!(f, "storage full"),
            Self::Io(rc) => write!(f, "I/O error (rc={rc})"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// A transfer is already outstanding; only one may be in flight.
    Busy,
    /// The controller refused to arm the transfer.
    StartFailed(i32),
    /// No completed read is available to collect.
    NoData,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "transfer already outstanding"),
            Self::StartFailed(rc) => write!(f, "transfer start failed (rc={rc})"),
            Self::NoData => write!(f, "no completed read"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Interrupt errors
// ---------------------------------------------------------------------------

/// A GPIO interrupt setup call returned a non-zero result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptError {
    pub pin: i32,
    pub code: i32,
}

impl fmt::Display for InterruptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{} interrupt setup failed (rc={})", self.pin, self.code)
    }
}

impl From<InterruptError> for Error {
    fn from(e: InterruptError) -> Self {
        Self::Interrupt(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors from [`ConfigPort`](crate::app::ports::ConfigPort) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored blob failed deserialization.
    Corrupted,
    /// A field failed range validation.  The message names the field.
    ValidationFailed(&'static str),
    /// Underlying storage refused the write.
    Storage(StorageError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
