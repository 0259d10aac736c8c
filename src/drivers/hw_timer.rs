//! Hardware timers using ESP-IDF's esp_timer API.
//!
//! Two kinds of timer live here:
//!
//! - The periodic acquisition tick, which raises `AcquisitionTick` in the
//!   signal set.
//! - The four software timers named by [`TimerId`], which post
//!   `StackEvent::SoftTimer` to the event queue.  They can be periodic or
//!   one-shot; arming with a period of zero stops them.
//!
//! Callbacks run in the esp_timer task (not ISR), so posting to the
//! embassy channel is fine.  On simulation targets nothing fires and arming
//! only logs.

use crate::events::{StackEvent, TimerId, EVENTS};
use crate::signals::{Signal, SIGNALS};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const SOFT_TIMER_COUNT: usize = 4;

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const fn slot(timer: TimerId) -> usize {
    match timer {
        TimerId::DisplayRefresh => 0,
        TimerId::ProvisioningBlink => 1,
        TimerId::FactoryReset => 2,
        TimerId::Restart => 3,
    }
}

/// Body of the acquisition tick callback.
pub fn acquisition_tick() {
    SIGNALS.raise(Signal::AcquisitionTick);
}

/// Body of a soft timer callback.
pub fn soft_timer_fired(raw: u8) {
    if let Some(timer) = TimerId::from_raw(raw) {
        EVENTS.post(StackEvent::SoftTimer(timer));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerError(pub i32);

impl core::fmt::Display for TimerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "esp_timer error (rc={})", self.0)
    }
}

// ── ESP-IDF backend ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ACQ_TIMER: esp_timer_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
static mut SOFT_TIMERS: [esp_timer_handle_t; SOFT_TIMER_COUNT] =
    [core::ptr::null_mut(); SOFT_TIMER_COUNT];

#[cfg(target_os = "espidf")]
unsafe extern "C" fn acq_tick_cb(_arg: *mut core::ffi::c_void) {
    acquisition_tick();
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn soft_timer_cb(arg: *mut core::ffi::c_void) {
    soft_timer_fired(arg as usize as u8);
}

/// SAFETY: caller is the main task; handles are only written from there.
#[cfg(target_os = "espidf")]
unsafe fn create_timer(
    handle: *mut esp_timer_handle_t,
    callback: unsafe extern "C" fn(*mut core::ffi::c_void),
    arg: usize,
    name: &'static [u8],
) -> Result<esp_timer_handle_t, TimerError> {
    unsafe {
        if (*handle).is_null() {
            let args = esp_timer_create_args_t {
                callback: Some(callback),
                arg: arg as *mut core::ffi::c_void,
                dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
                name: name.as_ptr() as *const _,
                skip_unhandled_events: true,
            };
            let ret = esp_timer_create(&args, handle);
            if ret != ESP_OK as i32 {
                return Err(TimerError(ret));
            }
        }
        Ok(*handle)
    }
}

/// Start (or restart) the periodic acquisition tick.
#[cfg(target_os = "espidf")]
pub fn start_acquisition_timer(period_ms: u32) -> Result<(), TimerError> {
    // SAFETY: ACQ_TIMER is only touched from the main task.
    unsafe {
        let t = create_timer(&raw mut ACQ_TIMER, acq_tick_cb, 0, b"acq\0")?;
        esp_timer_stop(t);
        let ret = esp_timer_start_periodic(t, u64::from(period_ms) * 1_000);
        if ret != ESP_OK as i32 {
            return Err(TimerError(ret));
        }
    }
    info!("hw_timer: acquisition tick every {period_ms} ms");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_acquisition_timer(period_ms: u32) -> Result<(), TimerError> {
    log::info!("hw_timer(sim): acquisition tick every {period_ms} ms");
    Ok(())
}

/// Arm a software timer.  A zero period stops it.
#[cfg(target_os = "espidf")]
pub fn arm_soft_timer(timer: TimerId, period_ms: u32, one_shot: bool) -> Result<(), TimerError> {
    let idx = slot(timer);
    // SAFETY: SOFT_TIMERS is only touched from the main task.
    unsafe {
        let slot_ptr = (&raw mut SOFT_TIMERS).cast::<esp_timer_handle_t>().add(idx);
        let t = create_timer(slot_ptr, soft_timer_cb, timer as usize, b"soft\0")?;
        esp_timer_stop(t);
        if period_ms > 0 {
            let us = u64::from(period_ms) * 1_000;
            let ret = if one_shot {
                esp_timer_start_once(t, us)
            } else {
                esp_timer_start_periodic(t, us)
            };
            if ret != ESP_OK as i32 {
                return Err(TimerError(ret));
            }
        }
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn arm_soft_timer(timer: TimerId, period_ms: u32, one_shot: bool) -> Result<(), TimerError> {
    log::debug!("hw_timer(sim): {timer:?} period={period_ms} one_shot={one_shot}");
    Ok(())
}
