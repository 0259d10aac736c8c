//! Si7021-class relative-humidity sensor on I²C.
//!
//! Measurement is "no hold master": the controller writes the measure
//! command, releases the bus while the sensor converts, then reads two
//! result bytes on a later transaction.  The split maps directly onto the
//! acquisition cycle in [`fsm`](crate::fsm).
//!
//! ## Transfer function
//!
//! ```text
//!   raw = (b0 << 8) | b1             (big-endian u16)
//!   %RH = 125 · raw / 65536 − 6
//! ```
//!
//! | raw      | %RH          |
//! |----------|--------------|
//! | `0x0000` | −6.0         |
//! | `0x8000` | 56.5         |
//! | `0xFFFF` | ≈118.998     |

/// 7-bit bus address.
pub const I2C_ADDRESS: u8 = 0x40;
/// Measure relative humidity, no hold master mode.
pub const CMD_MEASURE_RH_NO_HOLD: u8 = 0xE5;
/// Result length in bytes.
pub const RESULT_LEN: usize = 2;

const SCALE: f32 = 125.0;
const OFFSET: f32 = -6.0;
const FULL_SCALE: f32 = 65536.0;

/// A decoded sensor value in %RH.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Reading(pub f32);

impl Reading {
    /// Transfer-function output for raw `0x0000`.
    pub const MIN: Reading = Reading(OFFSET);
    /// Transfer-function output for raw `0xFFFF`.
    pub const MAX: Reading = Reading(SCALE * 65535.0 / FULL_SCALE + OFFSET);

    pub fn value(self) -> f32 {
        self.0
    }
}

/// Apply the transfer function.  Pure.
pub fn decode(raw: [u8; RESULT_LEN]) -> Reading {
    let code = u16::from_be_bytes(raw) as f32;
    Reading(SCALE * code / FULL_SCALE + OFFSET)
}
