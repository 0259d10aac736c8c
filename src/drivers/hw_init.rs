//! One-shot GPIO initialization and raw pin access.
//!
//! Configures the button and motion inputs, the indicator and sensor-rail
//! outputs, and installs the per-pin ISR service.  Called once from
//! `main()` before the event loop starts.
//!
//! On host targets every pin is backed by a bit in [`SIM_LEVELS`]; inputs
//! idle HIGH (pull-ups) and tests drive them with [`sim_set_level`].

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::error::InterruptError;
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={rc})"),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={rc})"),
        }
    }
}

impl std::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: called once from main() before the event loop; single-threaded.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()?;
    }
    info!("hw_init: GPIO configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    // Buttons are active-low; interrupts are armed later by the dispatcher.
    for pin in [pins::PB0_GPIO, pins::PB1_GPIO] {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }

    let pir_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::MOTION_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&pir_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    info!("hw_init: inputs configured (PB0, PB1, PIR)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: read-only register access on a configured pin; ISR-safe.
    (unsafe { gpio_get_level(pin) }) != 0
}

/// Simulated pin levels, one bit per GPIO.  Inputs idle HIGH.
#[cfg(not(target_os = "espidf"))]
pub static SIM_LEVELS: core::sync::atomic::AtomicU64 = core::sync::atomic::AtomicU64::new(
    (1u64 << pins::PB0_GPIO) | (1u64 << pins::PB1_GPIO),
);

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> bool {
    SIM_LEVELS.load(core::sync::atomic::Ordering::Acquire) & (1u64 << pin) != 0
}

/// Drive a simulated pin level, e.g. to hold a button during boot.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_level(pin: i32, high: bool) {
    use core::sync::atomic::Ordering;
    if high {
        SIM_LEVELS.fetch_or(1u64 << pin, Ordering::AcqRel);
    } else {
        SIM_LEVELS.fetch_and(!(1u64 << pin), Ordering::AcqRel);
    }
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let output_pins = [pins::LED0_GPIO, pins::LED1_GPIO, pins::SENSOR_ENABLE_GPIO];

    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: outputs configured (LED0, LED1, sensor rail)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: register write to a pin configured in init_gpio_outputs().
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) {
    sim_set_level(pin, high);
}

/// A configured output pin as an `embedded-hal` [`OutputPin`].
///
/// [`OutputPin`]: embedded_hal::digital::OutputPin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioOut(pub i32);

impl embedded_hal::digital::ErrorType for GpioOut {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for GpioOut {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.0, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.0, true);
        Ok(())
    }
}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_gpio_isr(_arg: *mut core::ffi::c_void) {
    crate::drivers::button::button_isr_handler(&crate::signals::SIGNALS);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn motion_gpio_isr(_arg: *mut core::ffi::c_void) {
    let high = gpio_read(pins::MOTION_GPIO);
    crate::drivers::motion::motion_isr_handler(high, &crate::signals::SIGNALS);
}

/// Install the per-pin GPIO ISR service.  Idempotent.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: ESP_ERR_INVALID_STATE means the service is already installed.
    let ret = unsafe { gpio_install_isr_service(0) };
    if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
        return Err(HwInitError::IsrInstallFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}

/// Map one interrupt-setup result code, logging any failure.
pub fn check_interrupt_rc(pin: i32, rc: i32) -> Result<(), InterruptError> {
    if rc == 0 {
        return Ok(());
    }
    let e = InterruptError { pin, code: rc };
    log::error!("hw_init: {e}");
    Err(e)
}

/// Set the trigger, attach `handler` and unmask the pin.
#[cfg(target_os = "espidf")]
fn arm_pin_interrupt(
    pin: i32,
    handler: unsafe extern "C" fn(*mut core::ffi::c_void),
) -> Result<(), InterruptError> {
    // SAFETY: pin configured as an input in init_peripherals(); the handler
    // is a static fn that only touches the atomic signal set.
    unsafe {
        check_interrupt_rc(pin, gpio_set_intr_type(pin, gpio_int_type_t_GPIO_INTR_ANYEDGE))?;
        check_interrupt_rc(pin, gpio_isr_handler_add(pin, Some(handler), core::ptr::null_mut()))?;
        check_interrupt_rc(pin, gpio_intr_enable(pin))?;
    }
    Ok(())
}

/// PB0 interrupts on both edges.  The handler only raises the signal;
/// the dispatcher samples the level when it runs.
#[cfg(target_os = "espidf")]
pub fn enable_button_interrupt() -> Result<(), InterruptError> {
    arm_pin_interrupt(pins::PB0_GPIO, button_gpio_isr)?;
    info!("hw_init: PB0 interrupt armed");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn enable_button_interrupt() -> Result<(), InterruptError> {
    log::info!("hw_init(sim): PB0 interrupt armed");
    Ok(())
}

/// Motion input interrupts on both edges; the handler filters for HIGH.
#[cfg(target_os = "espidf")]
pub fn enable_motion_interrupt() -> Result<(), InterruptError> {
    arm_pin_interrupt(pins::MOTION_GPIO, motion_gpio_isr)?;
    info!("hw_init: PIR interrupt armed");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn enable_motion_interrupt() -> Result<(), InterruptError> {
    log::info!("hw_init(sim): PIR interrupt armed");
    Ok(())
}
