//! Sensor definitions.
//!
//! Only the pure side lives here: bus constants and the transfer function.
//! Moving bytes is the job of [`drivers::i2c`](crate::drivers::i2c), and
//! sequencing is the job of the acquisition [`fsm`](crate::fsm).

pub mod humidity;

pub use humidity::Reading;
