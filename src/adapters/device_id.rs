//! Device identity derived from the Bluetooth public address.
//!
//! Produces a stable, human-readable device name in the form
//! `<prefix> xx:yy`, where `xx:yy` are the two least-significant address
//! bytes in lowercase hex.  The name is:
//! - Deterministic across reboots (factory-burned eFuse MAC)
//! - Written to the GATT device-name attribute
//! - Shown on the name row of the display

use core::fmt::Write;

/// Device name: prefix (≤16) + space + `xx:yy`.
pub type DeviceName = heapless::String<32>;

/// Bluetooth address, least-significant byte first (over-the-air order).
pub type BtAddress = [u8; 6];

/// Read the Bluetooth public address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_bt_address() -> BtAddress {
    let mut mac: BtAddress = [0u8; 6];
    // SAFETY: `mac` is a valid 6-byte buffer for the duration of the call.
    let rc = unsafe {
        esp_idf_svc::sys::esp_read_mac(mac.as_mut_ptr(), esp_idf_svc::sys::esp_mac_type_t_ESP_MAC_BT)
    };
    if rc != esp_idf_svc::sys::ESP_OK as i32 {
        log::warn!("esp_read_mac failed (rc={rc})");
    }
    // ESP-IDF returns the canonical (most-significant first) order.
    mac.reverse();
    mac
}

/// Simulation: returns a deterministic fake address.
#[cfg(not(target_os = "espidf"))]
pub fn read_bt_address() -> BtAddress {
    [0xFE, 0xCA, 0xEF, 0xBE, 0xAD, 0xDE]
}

/// Derive the device name from the two least-significant address bytes.
/// Format: `<prefix> xx:yy` with `xx = addr[1]`, `yy = addr[0]`.
pub fn device_name(prefix: &str, addr: &BtAddress) -> DeviceName {
    let mut name = DeviceName::new();
    let _ = write!(name, "{} {:02x}:{:02x}", prefix, addr[1], addr[0]);
    name
}

/// Canonical colon-separated form, most-significant byte first.
pub fn format_address(addr: &BtAddress) -> heapless::String<24> {
    let mut s = heapless::String::<24>::new();
    for (i, b) in addr.iter().rev().enumerate() {
        if i > 0 {
            let _ = s.push(':');
        }
        let _ = write!(s, "{b:02x}");
    }
    s
}
