//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`] for the node.
//!
//! - Session fields live under the `meshnode` namespace, one blob per
//!   [`PsKey`], keyed by [`PsKey::nvs_key`].
//! - Configuration is a single postcard blob under `meshcfg/nodecfg`,
//!   validated before every save.
//! - `erase_all` clears the node's own namespaces only.  The mesh stack's
//!   network state is dropped through `esp_ble_mesh_node_local_reset`.
//! - Writes are atomic per `nvs_commit()`.

use log::{info, warn};

use crate::app::ports::{ConfigPort, StoragePort};
use crate::config::NodeConfig;
use crate::error::{ConfigError, StorageError};
use crate::session::PsKey;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const SESSION_NAMESPACE: &str = "meshnode";
const CONFIG_NAMESPACE: &str = "meshcfg";
const CONFIG_KEY: &str = "nodecfg";

/// Upper bound for the postcard config blob.
const MAX_CONFIG_BLOB: usize = 128;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Initialise NVS flash.  A full or version-mismatched partition is
    /// erased and re-initialised.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called from the single main task before any NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as i32 || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as i32 {
                warn!("NVS: erasing and re-initialising flash partition");
                Self::reinit_partition()?;
            } else if ret != ESP_OK as i32 {
                return Err(StorageError::Io(ret));
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{namespace}::{key}")
    }

    #[cfg(target_os = "espidf")]
    fn reinit_partition() -> Result<(), StorageError> {
        // SAFETY: main task only; no NVS handles are open across this call.
        let ret = unsafe { nvs_flash_erase() };
        if ret != ESP_OK as i32 {
            return Err(StorageError::Io(ret));
        }
        let ret = unsafe { nvs_flash_init() };
        if ret != ESP_OK as i32 {
            return Err(StorageError::Io(ret));
        }
        Ok(())
    }

    /// NUL-terminate a namespace or key (NVS limit: 15 characters).
    #[cfg(target_os = "espidf")]
    fn c_name(name: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let bytes = name.as_bytes();
        let len = bytes.len().min(15);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = Self::c_name(namespace);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: `ns` is NUL-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK as i32 {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, i32> {
        Self::with_nvs_handle(namespace, false, |handle| {
            let key = Self::c_name(key);
            let mut size = buf.len();
            // SAFETY: `buf` is valid for `size` bytes.
            let ret = unsafe {
                nvs_get_blob(handle, key.as_ptr() as *const _, buf.as_mut_ptr() as *mut _, &mut size)
            };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            Ok(size)
        })
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(namespace: &str, key: &str, data: &[u8]) -> Result<(), i32> {
        Self::with_nvs_handle(namespace, true, |handle| {
            let key = Self::c_name(key);
            // SAFETY: `data` is valid for its length for the duration of the call.
            let ret = unsafe {
                nvs_set_blob(handle, key.as_ptr() as *const _, data.as_ptr() as *const _, data.len())
            };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            Ok(())
        })
    }

    #[cfg(target_os = "espidf")]
    fn map_esp_err(rc: i32) -> StorageError {
        if rc == ESP_ERR_NVS_NOT_FOUND as i32 {
            StorageError::NotFound
        } else if rc == ESP_ERR_NVS_NOT_ENOUGH_SPACE as i32 {
            StorageError::Full
        } else if rc == ESP_ERR_NVS_INVALID_LENGTH as i32 {
            StorageError::SizeMismatch
        } else {
            StorageError::Io(rc)
        }
    }

    fn read_raw(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            match self.store.borrow().get(&composite) {
                Some(data) if data.len() > buf.len() => Err(StorageError::SizeMismatch),
                Some(data) => {
                    buf[..data.len()].copy_from_slice(data);
                    Ok(data.len())
                }
                None => Err(StorageError::NotFound),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            Self::read_blob(namespace, key, buf).map_err(Self::map_esp_err)
        }
    }

    fn write_raw(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow_mut().insert(composite, data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            Self::write_blob(namespace, key, data).map_err(Self::map_esp_err)
        }
    }

    /// Erase every key in one namespace.  The mesh stack keeps its own
    /// namespaces open, so the partition itself is never reinitialised here.
    fn erase_namespace(&self, namespace: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let prefix = Self::composite_key(namespace, "");
            self.store.borrow_mut().retain(|k, _| !k.starts_with(&prefix));
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            Self::with_nvs_handle(namespace, true, |handle| {
                // SAFETY: the handle is open read-write for this closure.
                let ret = unsafe { nvs_erase_all(handle) };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                Ok(())
            })
            .map_err(Self::map_esp_err)
        }
    }
}

impl ConfigPort for NvsAdapter {
    fn load_config(&self) -> Result<NodeConfig, ConfigError> {
        let mut buf = [0u8; MAX_CONFIG_BLOB];
        match self.read_raw(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(len) => {
                let cfg: NodeConfig =
                    postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
                cfg.validate()?;
                info!("NvsAdapter: loaded config ({len} bytes)");
                Ok(cfg)
            }
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(NodeConfig::default())
            }
            Err(e) => Err(ConfigError::Storage(e)),
        }
    }

    fn save_config(&mut self, config: &NodeConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let mut buf = [0u8; MAX_CONFIG_BLOB];
        let bytes = postcard::to_slice(config, &mut buf)
            .map_err(|_| ConfigError::Storage(StorageError::SizeMismatch))?;
        self.write_raw(CONFIG_NAMESPACE, CONFIG_KEY, bytes)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

impl StoragePort for NvsAdapter {
    fn save(&mut self, key: PsKey, data: &[u8]) -> Result<(), StorageError> {
        if data.len() != key.size() {
            return Err(StorageError::SizeMismatch);
        }
        self.write_raw(SESSION_NAMESPACE, key.nvs_key(), data)
    }

    fn load(&mut self, key: PsKey, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.read_raw(SESSION_NAMESPACE, key.nvs_key(), buf)
    }

    fn erase_all(&mut self) -> Result<(), StorageError> {
        for namespace in [SESSION_NAMESPACE, CONFIG_NAMESPACE] {
            self.erase_namespace(namespace)?;
        }
        warn!("NvsAdapter: node keys erased");
        Ok(())
    }
}
