//! Push-button input.
//!
//! ## Hardware
//!
//! Two active-low momentary switches with internal pull-ups.  PB0 interrupts
//! on both edges; PB1 is only sampled during boot (factory-reset chord).
//!
//! The ISR does not debounce or classify: it raises `ButtonRelease` and
//! returns.  The dispatcher decides what the edge means by reading the live
//! level of PB0 when it handles the signal, so a press and its release
//! coalesce if both land before the main loop runs.

use crate::app::ports::Button;
use crate::drivers::hw_init;
use crate::error::InterruptError;
use crate::pins;
use crate::signals::{Signal, SignalSet};

/// PB0 edge handler.  ISR-safe: a single atomic OR.
pub fn button_isr_handler(signals: &SignalSet) {
    signals.raise(Signal::ButtonRelease);
}

pub const fn gpio_of(button: Button) -> i32 {
    match button {
        Button::Pb0 => pins::PB0_GPIO,
        Button::Pb1 => pins::PB1_GPIO,
    }
}

/// Live sample of an active-low button; `true` while held.
pub fn is_pressed(button: Button) -> bool {
    !hw_init::gpio_read(gpio_of(button))
}

/// Button inputs as seen by the node adapter.
pub struct ButtonDriver {
    interrupts_enabled: bool,
}

impl ButtonDriver {
    pub fn new() -> Self {
        Self {
            interrupts_enabled: false,
        }
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        is_pressed(button)
    }

    /// Arm the PB0 interrupt.  Repeat calls after success are no-ops; a
    /// failed attempt leaves the driver unarmed so it can be retried.
    pub fn enable_interrupts(&mut self) -> Result<(), InterruptError> {
        if self.interrupts_enabled {
            return Ok(());
        }
        hw_init::enable_button_interrupt()?;
        self.interrupts_enabled = true;
        Ok(())
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts_enabled
    }
}

impl Default for ButtonDriver {
    fn default() -> Self {
        Self::new()
    }
}
