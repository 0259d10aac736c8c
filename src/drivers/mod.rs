//! Peripheral drivers and one-shot hardware initialisation.

pub mod button;
pub mod hw_init;
pub mod hw_timer;
pub mod i2c;
pub mod indicators;
pub mod motion;
