//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                    |
//! |-------------|--------------------|--------------------------------|
//! | `mesh`      | MeshStackPort      | ESP-BLE-MESH / Bluedroid       |
//! | `models`    | ModelPort          | Generic OnOff + Level servers  |
//! | `nvs`       | StoragePort        | NVS / in-memory store          |
//! |             | ConfigPort         |                                |
//! | `display`   | DisplayPort        | Serial status rows             |
//! | `node`      | all of the above   | Drivers in `crate::drivers`    |
//! |             | + Indicator/Input/Bus ports |                       |
//! | `device_id` | (helpers)          | eFuse Bluetooth address        |

pub mod device_id;
pub mod display;
pub mod mesh;
pub mod models;
pub mod node;
pub mod nvs;
