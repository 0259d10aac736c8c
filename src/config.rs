//! Node configuration parameters
//!
//! All tunable parameters for the MeshNode firmware.  The defaults match the
//! shipped board; a postcard-encoded override can be stored in NVS (see
//! [`NvsAdapter`](crate::adapters::nvs::NvsAdapter)).

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Capacity of the device-name prefix.
pub const NAME_PREFIX_CAP: usize = 16;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Identity ---
    /// Device name prefix; the final name is `"<prefix> xx:yy"`.
    pub name_prefix: String<NAME_PREFIX_CAP>,

    // --- Sensor ---
    /// 7-bit I²C address of the humidity sensor.
    pub sensor_address: u8,
    /// Measurement command byte.
    pub sensor_command: u8,
    /// Supply-rail settle time before the first transaction (ms).
    pub sensor_settle_ms: u32,

    // --- Timing ---
    /// Acquisition tick period (ms).  A full cycle spans two ticks.
    pub acquisition_period_ms: u32,
    /// Display refresh timer period (ms).
    pub display_refresh_ms: u32,
    /// Delay between factory-reset erase and reboot (ms).
    pub factory_reset_delay_ms: u32,
    /// Delay between provisioning failure and reboot (ms).
    pub restart_delay_ms: u32,
    /// Provisioning LED blink period (ms).
    pub provisioning_blink_ms: u32,

    // --- Mesh ---
    /// Bearers used for unprovisioned beaconing (bit 0 = ADV, bit 1 = GATT).
    pub beacon_bearers: u8,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let mut name_prefix = String::new();
        // Fits: the literal is shorter than NAME_PREFIX_CAP.
        let _ = name_prefix.push_str("5823Sub");

        Self {
            name_prefix,

            // Sensor
            sensor_address: crate::sensors::humidity::I2C_ADDRESS,
            sensor_command: crate::sensors::humidity::CMD_MEASURE_RH_NO_HOLD,
            sensor_settle_ms: 80,

            // Timing
            acquisition_period_ms: 1000,
            display_refresh_ms: 1000,
            factory_reset_delay_ms: 2000,
            restart_delay_ms: 2000,
            provisioning_blink_ms: 250,

            // Mesh
            beacon_bearers: 0x03,
        }
    }
}

impl NodeConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name_prefix.is_empty() {
            return Err(ConfigError::ValidationFailed("name_prefix must not be empty"));
        }
        if !(0x08..=0x77).contains(&self.sensor_address) {
            return Err(ConfigError::ValidationFailed(
                "sensor_address must be a non-reserved 7-bit address",
            ));
        }
        if self.sensor_settle_ms > 1000 {
            return Err(ConfigError::ValidationFailed(
                "sensor_settle_ms must be 0–1000",
            ));
        }
        if !(100..=60_000).contains(&self.acquisition_period_ms) {
            return Err(ConfigError::ValidationFailed(
                "acquisition_period_ms must be 100–60000",
            ));
        }
        if !(100..=60_000).contains(&self.display_refresh_ms) {
            return Err(ConfigError::ValidationFailed(
                "display_refresh_ms must be 100–60000",
            ));
        }
        if self.factory_reset_delay_ms == 0 || self.restart_delay_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "reboot delays must be non-zero",
            ));
        }
        if self.provisioning_blink_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "provisioning_blink_ms must be non-zero",
            ));
        }
        if self.beacon_bearers == 0 || self.beacon_bearers & !0x03 != 0 {
            return Err(ConfigError::ValidationFailed(
                "beacon_bearers must be a non-empty subset of 0x03",
            ));
        }
        Ok(())
    }
}
