//! Non-blocking I²C transaction driver for the humidity sensor.
//!
//! ## Protocol
//!
//! One half-transaction (command write or result read) may be outstanding.
//! [`TransferTracker`] records which half is in flight; a second start while
//! it is set fails with [`BusError::Busy`] before touching the bus.  The
//! controller's transfer-done callback calls [`on_transfer_complete`], which
//! clears the tracker and raises exactly one signal:
//!
//! | In flight | Outcome | Signal          |
//! |-----------|---------|-----------------|
//! | write     | done    | `CommandAck`    |
//! | read      | done    | `ReadAck`       |
//! | either    | failed  | `TransferFault` |
//!
//! ## Dual-target design
//!
//! On ESP-IDF: the `i2c_master` driver in asynchronous mode
//! (`trans_queue_depth > 0`), completion reported by `on_trans_done`.
//! On host/test: transfers are recorded and completed explicitly with
//! [`I2cBus::sim_complete`].

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::ports::BusPort;
use crate::error::BusError;
use crate::sensors::humidity::RESULT_LEN;
use crate::signals::{Signal, SignalSet};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ───────────────────────────────────────────────────────────────
// Transfer tracking (shared with the completion callback)
// ───────────────────────────────────────────────────────────────

/// Which half of the transaction is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransferPhase {
    None = 0,
    Write = 1,
    Read = 2,
}

impl TransferPhase {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Write,
            2 => Self::Read,
            _ => Self::None,
        }
    }
}

/// Outcome reported by the controller for the just-finished transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    InProgress,
    Done,
    Failed,
}

/// Lock-free record of the outstanding transfer.
pub struct TransferTracker {
    phase: AtomicU8,
    /// A read finished successfully and its bytes have not been collected.
    read_ready: AtomicBool,
}

impl TransferTracker {
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(TransferPhase::None as u8),
            read_ready: AtomicBool::new(false),
        }
    }

    /// Claim the bus for `phase`.  Fails with `Busy` if anything is in flight.
    pub fn begin(&self, phase: TransferPhase) -> Result<(), BusError> {
        self.phase
            .compare_exchange(
                TransferPhase::None as u8,
                phase as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|_| BusError::Busy)
    }

    /// Release the claim after the controller refused to start.
    pub fn abort(&self) {
        self.phase.store(TransferPhase::None as u8, Ordering::Release);
    }

    /// Clear the in-flight phase and return what it was.  ISR-safe.
    pub fn finish(&self) -> TransferPhase {
        TransferPhase::from_raw(self.phase.swap(TransferPhase::None as u8, Ordering::AcqRel))
    }

    pub fn in_flight(&self) -> TransferPhase {
        TransferPhase::from_raw(self.phase.load(Ordering::Acquire))
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight() != TransferPhase::None
    }

    fn mark_read_ready(&self, ready: bool) {
        self.read_ready.store(ready, Ordering::Release);
    }

    fn take_read_ready(&self) -> bool {
        self.read_ready.swap(false, Ordering::AcqRel)
    }
}

impl Default for TransferTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Transfer-complete handler.  Call from the controller's completion
/// callback.  Raises at most one signal; returns it.
pub fn on_transfer_complete(
    tracker: &TransferTracker,
    signals: &SignalSet,
    outcome: TransferOutcome,
) -> Option<Signal> {
    if outcome == TransferOutcome::InProgress {
        return None;
    }
    let signal = match (tracker.finish(), outcome) {
        (TransferPhase::None, _) => return None,
        (_, TransferOutcome::Failed) => Signal::TransferFault,
        (TransferPhase::Write, _) => Signal::CommandAck,
        (TransferPhase::Read, _) => {
            tracker.mark_read_ready(true);
            Signal::ReadAck
        }
    };
    signals.raise(signal);
    Some(signal)
}

// ───────────────────────────────────────────────────────────────
// Sensor power
// ───────────────────────────────────────────────────────────────

/// Switch on the sensor supply rail and wait for it to settle.
/// The only blocking wait in the firmware; bounded by `settle_ms`.
pub fn power_on_sensor<P, D>(enable: &mut P, delay: &mut D, settle_ms: u32) -> Result<(), P::Error>
where
    P: OutputPin,
    D: DelayNs,
{
    enable.set_high()?;
    delay.delay_ms(settle_ms);
    info!("i2c: sensor rail on, settled {settle_ms} ms");
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Bus driver
// ───────────────────────────────────────────────────────────────

/// Tracker and signal set used by the hardware completion callback.
pub static TRANSFER: TransferTracker = TransferTracker::new();

#[cfg(target_os = "espidf")]
struct RxBuffer(core::cell::UnsafeCell<[u8; RESULT_LEN]>);

// SAFETY: the controller writes the buffer only while a read is in flight,
// and the main loop reads it only after `read_ready` is observed.
#[cfg(target_os = "espidf")]
unsafe impl Sync for RxBuffer {}

#[cfg(target_os = "espidf")]
static RX_BUFFER: RxBuffer = RxBuffer(core::cell::UnsafeCell::new([0; RESULT_LEN]));

#[cfg(target_os = "espidf")]
static TX_COMMAND: AtomicU8 = AtomicU8::new(0);

/// Asynchronous I²C master bound to one device address.
pub struct I2cBus {
    tracker: &'static TransferTracker,
    signals: &'static SignalSet,
    address: u8,

    #[cfg(target_os = "espidf")]
    device: i2c_master_dev_handle_t,

    #[cfg(not(target_os = "espidf"))]
    sim: SimBus,
}

/// Host-side record of bus activity.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimBus {
    pub writes: Vec<u8>,
    pub reads: Vec<usize>,
    /// Bytes the next completed read delivers.
    pub staged: [u8; RESULT_LEN],
    /// Make the next start fail at the controller.
    pub fail_next_start: bool,
}

impl I2cBus {
    #[cfg(target_os = "espidf")]
    pub fn new(
        tracker: &'static TransferTracker,
        signals: &'static SignalSet,
        address: u8,
    ) -> Result<Self, BusError> {
        let device = unsafe { platform_init(address) }?;
        info!("i2c: async master up, device 0x{address:02x}");
        Ok(Self {
            tracker,
            signals,
            address,
            device,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(
        tracker: &'static TransferTracker,
        signals: &'static SignalSet,
        address: u8,
    ) -> Result<Self, BusError> {
        info!("i2c(sim): device 0x{address:02x}");
        Ok(Self {
            tracker,
            signals,
            address,
            sim: SimBus::default(),
        })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn is_busy(&self) -> bool {
        self.tracker.is_busy()
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim(&self) -> &SimBus {
        &self.sim
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_mut(&mut self) -> &mut SimBus {
        &mut self.sim
    }

    /// Finish the outstanding simulated transfer as the hardware callback
    /// would.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_complete(&mut self, ok: bool) -> Option<Signal> {
        let outcome = if ok {
            TransferOutcome::Done
        } else {
            TransferOutcome::Failed
        };
        on_transfer_complete(self.tracker, self.signals, outcome)
    }

    fn start(&mut self, phase: TransferPhase, command: u8, len: usize) -> Result<(), BusError> {
        self.tracker.begin(phase)?;
        if phase == TransferPhase::Read {
            self.tracker.mark_read_ready(false);
        }
        if let Err(e) = self.platform_start(phase, command, len) {
            self.tracker.abort();
            warn!("i2c: {phase:?} start failed: {e}");
            return Err(e);
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self, phase: TransferPhase, command: u8, len: usize) -> Result<(), BusError> {
        // SAFETY: the device handle is valid for the life of the driver; the
        // tx/rx buffers are statics that outlive the transfer.
        let rc = unsafe {
            match phase {
                TransferPhase::Write => {
                    TX_COMMAND.store(command, Ordering::Release);
                    i2c_master_transmit(self.device, TX_COMMAND.as_ptr(), 1, -1)
                }
                TransferPhase::Read => i2c_master_receive(
                    self.device,
                    RX_BUFFER.0.get().cast::<u8>(),
                    len.min(RESULT_LEN),
                    -1,
                ),
                TransferPhase::None => ESP_OK as i32,
            }
        };
        if rc == ESP_OK as i32 {
            Ok(())
        } else {
            Err(BusError::StartFailed(rc))
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self, phase: TransferPhase, command: u8, len: usize) -> Result<(), BusError> {
        if core::mem::take(&mut self.sim.fail_next_start) {
            return Err(BusError::StartFailed(-1));
        }
        match phase {
            TransferPhase::Write => self.sim.writes.push(command),
            TransferPhase::Read => self.sim.reads.push(len),
            TransferPhase::None => {}
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn completed_bytes(&self) -> [u8; RESULT_LEN] {
        // SAFETY: no read is in flight once `read_ready` was observed.
        unsafe { *RX_BUFFER.0.get() }
    }

    #[cfg(not(target_os = "espidf"))]
    fn completed_bytes(&self) -> [u8; RESULT_LEN] {
        self.sim.staged
    }
}

impl BusPort for I2cBus {
    fn start_write(&mut self, command: u8) -> Result<(), BusError> {
        self.start(TransferPhase::Write, command, 1)
    }

    fn start_read(&mut self, len: usize) -> Result<(), BusError> {
        self.start(TransferPhase::Read, 0, len)
    }

    fn read_result(&mut self, buf: &mut [u8]) -> Result<usize, BusError> {
        if !self.tracker.take_read_ready() {
            return Err(BusError::NoData);
        }
        let bytes = self.completed_bytes();
        let n = buf.len().min(bytes.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }
}

// ── ESP-IDF controller setup ──────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn on_trans_done(
    _dev: i2c_master_dev_handle_t,
    evt: *const i2c_master_event_data_t,
    _arg: *mut core::ffi::c_void,
) -> bool {
    // SAFETY: the driver passes a valid event pointer for the callback's duration.
    let event = unsafe { (*evt).event };
    let outcome = if event == i2c_master_event_t_I2C_EVENT_DONE {
        TransferOutcome::Done
    } else if event == i2c_master_event_t_I2C_EVENT_ALIVE {
        TransferOutcome::InProgress
    } else {
        TransferOutcome::Failed
    };
    on_transfer_complete(&TRANSFER, &crate::signals::SIGNALS, outcome);
    false
}

#[cfg(target_os = "espidf")]
unsafe fn platform_init(address: u8) -> Result<i2c_master_dev_handle_t, BusError> {
    use crate::pins;

    let mut bus_cfg = i2c_master_bus_config_t {
        i2c_port: pins::I2C_PORT,
        sda_io_num: pins::I2C_SDA_GPIO,
        scl_io_num: pins::I2C_SCL_GPIO,
        clk_source: soc_periph_i2c_clk_src_t_I2C_CLK_SRC_DEFAULT,
        glitch_ignore_cnt: 7,
        trans_queue_depth: 2,
        ..Default::default()
    };
    bus_cfg.flags.set_enable_internal_pullup(1);

    let mut bus: i2c_master_bus_handle_t = core::ptr::null_mut();
    let rc = unsafe { i2c_new_master_bus(&bus_cfg, &mut bus) };
    if rc != ESP_OK as i32 {
        return Err(BusError::StartFailed(rc));
    }

    let dev_cfg = i2c_device_config_t {
        dev_addr_length: i2c_addr_bit_len_t_I2C_ADDR_BIT_LEN_7,
        device_address: u16::from(address),
        scl_speed_hz: pins::I2C_FREQ_HZ,
        ..Default::default()
    };
    let mut device: i2c_master_dev_handle_t = core::ptr::null_mut();
    let rc = unsafe { i2c_master_bus_add_device(bus, &dev_cfg, &mut device) };
    if rc != ESP_OK as i32 {
        return Err(BusError::StartFailed(rc));
    }

    let callbacks = i2c_master_event_callbacks_t {
        on_trans_done: Some(on_trans_done),
    };
    let rc = unsafe { i2c_master_register_event_callbacks(device, &callbacks, core::ptr::null_mut()) };
    if rc != ESP_OK as i32 {
        return Err(BusError::StartFailed(rc));
    }
    Ok(device)
}
