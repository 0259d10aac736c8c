//! GPIO / peripheral pin assignments for the MeshNode sensor board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Push-buttons (active-low with internal pull-up)
// ---------------------------------------------------------------------------

/// PB0: alert acknowledge button.  Also the factory-reset chord at boot.
pub const PB0_GPIO: i32 = 0;
/// PB1: factory-reset chord at boot only.
pub const PB1_GPIO: i32 = 9;

// ---------------------------------------------------------------------------
// Passive-infrared motion sensor (HIGH = motion)
// ---------------------------------------------------------------------------

pub const MOTION_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Alert indicators (active HIGH)
// ---------------------------------------------------------------------------

/// LED0 doubles as the provisioning blink indicator.
pub const LED0_GPIO: i32 = 4;
pub const LED1_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// I²C bus to the humidity sensor
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
/// Load-switch enable for the sensor supply rail (active HIGH).
pub const SENSOR_ENABLE_GPIO: i32 = 15;
/// I²C controller port used for the sensor.
pub const I2C_PORT: i32 = 0;
/// Standard-mode bus clock.
pub const I2C_FREQ_HZ: u32 = 100_000;
