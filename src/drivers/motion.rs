//! Passive-infrared motion input.
//!
//! The PIR output goes HIGH while motion is detected.  The pin interrupts on
//! both edges; only edges that leave the pin HIGH raise `Motion`.  The raise
//! is wrapped in a critical section so it cannot interleave with the main
//! loop's `take_all`.

use crate::drivers::hw_init;
use crate::error::InterruptError;
use crate::signals::{Signal, SignalSet};

/// PIR edge handler.  `level_high` is the pin level sampled in the ISR.
/// Returns whether `Motion` was raised.
pub fn motion_isr_handler(level_high: bool, signals: &SignalSet) -> bool {
    if !level_high {
        return false;
    }
    signals.raise_in_critical_section(Signal::Motion);
    true
}

/// Motion input as seen by the node adapter.
pub struct MotionSensor {
    armed: bool,
}

impl MotionSensor {
    pub fn new() -> Self {
        Self { armed: false }
    }

    /// Arm the PIR interrupt.  Repeat calls are no-ops.
    pub fn enable(&mut self) -> Result<(), InterruptError> {
        if self.armed {
            return Ok(());
        }
        hw_init::enable_motion_interrupt()?;
        self.armed = true;
        Ok(())
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl Default for MotionSensor {
    fn default() -> Self {
        Self::new()
    }
}
