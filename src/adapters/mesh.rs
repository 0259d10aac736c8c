//! Mesh / BLE stack adapter.
//!
//! Implements [`MeshStackPort`] and translates stack callbacks into
//! [`StackEvent`]s on the event queue.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: ESP-BLE-MESH node on Bluedroid.  A second
//!   GATTS application carries the OTA control characteristic; a user write
//!   there surfaces as `GattUserWrite`.
//! - **all other targets**: records every command and answers `node_init`
//!   with a scripted `NodeInitialized`, so host builds run the full flow.
//!
//! ## Callback → event mapping
//!
//! | Stack callback                        | Event                   |
//! |---------------------------------------|-------------------------|
//! | `PROV_REGISTER_COMP`                  | `NodeInitialized`       |
//! | `NODE_PROV_LINK_OPEN`                 | `ProvisioningStarted`   |
//! | `NODE_PROV_COMPLETE`                  | `Provisioned`           |
//! | `NODE_PROV_LINK_CLOSE` (unprovisioned)| `ProvisioningFailed`    |
//! | `NODE_PROV_RESET`                     | `NodeReset`             |
//! | `FRIEND_FRIENDSHIP_ESTABLISH`         | `FriendshipEstablished` |
//! | `FRIEND_FRIENDSHIP_TERMINATE`         | `FriendshipTerminated`  |
//! | cfg server app/net key add            | `KeyAdded`              |
//! | cfg server bind / pub / sub           | `ModelConfigChanged`    |
//! | GATTS connect / disconnect / write    | `Connection*`, `GattUserWrite` |

use heapless::String;
use log::{info, warn};

use crate::adapters::device_id::{self, BtAddress};
use crate::app::ports::{MeshStackPort, ResetMode};
use crate::drivers::hw_timer;
use crate::error::StackError;
use crate::events::{EventQueue, StackEvent, TimerId, EVENT_QUEUE_CAP};

/// Result code for a command the radio rejected outright.
pub const ERR_REJECTED: u16 = 0x0181;

/// OTA service and control characteristic UUIDs.
pub const OTA_SERVICE_UUID: u128 = 0x1d14d6ee_fd63_4fa1_bfa4_8f47b42119f0;
pub const OTA_CONTROL_UUID: u128 = 0xf7bf3564_fb6d_4e53_88a4_5e37e0326063;

pub type Events = &'static EventQueue<EVENT_QUEUE_CAP>;

/// One command issued to the stack, as recorded on host targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshCall {
    NodeInit,
    GenericServerInit,
    FriendInit,
    Beacon(u8),
    Close(u8),
    LocalReset,
    Reset(ResetMode),
    DeviceName(String<32>),
    WriteResponse {
        connection: u8,
        characteristic: u16,
        att_result: u8,
    },
    SoftTimer {
        timer: TimerId,
        period_ms: u32,
        one_shot: bool,
    },
}

/// `ESP_GATT_IF_NONE`: no GATT interface registered yet.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const GATT_IF_NONE: u8 = 0xFF;

/// Whether a GATT server callback on `gatts_if` belongs to the OTA
/// application registered as `registered`.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn owns_interface(registered: u8, gatts_if: u8) -> bool {
    registered != GATT_IF_NONE && registered == gatts_if
}

pub struct MeshAdapter {
    #[cfg_attr(target_os = "espidf", allow(dead_code))]
    events: Events,
    address: BtAddress,
    reset_requested: Option<ResetMode>,

    #[cfg(not(target_os = "espidf"))]
    sim: SimStack,
}

/// Scripted host-side stack.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimStack {
    pub calls: Vec<MeshCall>,
    /// What `node_init` reports.
    pub provisioned: bool,
    pub unicast: u16,
    /// Make the next command fail with this result code.
    pub fail_next: Option<u16>,
}

impl MeshAdapter {
    pub fn new(events: Events) -> Self {
        Self {
            events,
            address: device_id::read_bt_address(),
            reset_requested: None,
            #[cfg(not(target_os = "espidf"))]
            sim: SimStack::default(),
        }
    }

    /// The reset the dispatcher asked for, if any.  Only observable on host
    /// targets; on hardware `system_reset` does not return.
    pub fn take_reset_request(&mut self) -> Option<ResetMode> {
        self.reset_requested.take()
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim(&self) -> &SimStack {
        &self.sim
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_mut(&mut self) -> &mut SimStack {
        &mut self.sim
    }

    /// Record a command and consume any scripted failure.
    #[cfg(not(target_os = "espidf"))]
    fn record(&mut self, call: MeshCall) -> Result<(), StackError> {
        self.sim.calls.push(call);
        match self.sim.fail_next.take() {
            Some(code) => Err(StackError(code)),
            None => Ok(()),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Host implementation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl MeshStackPort for MeshAdapter {
    fn node_init(&mut self) -> Result<(), StackError> {
        self.record(MeshCall::NodeInit)?;
        info!("mesh(sim): node up (provisioned={})", self.sim.provisioned);
        self.events.post(StackEvent::NodeInitialized {
            provisioned: self.sim.provisioned,
            address: self.sim.unicast,
            iv_index: 0,
        });
        Ok(())
    }

    fn generic_server_init(&mut self) -> Result<(), StackError> {
        self.record(MeshCall::GenericServerInit)
    }

    fn friend_init(&mut self) -> Result<(), StackError> {
        self.record(MeshCall::FriendInit)
    }

    fn start_unprov_beaconing(&mut self, bearers: u8) -> Result<(), StackError> {
        self.record(MeshCall::Beacon(bearers))
    }

    fn close_connection(&mut self, connection: u8) -> Result<(), StackError> {
        self.record(MeshCall::Close(connection))
    }

    fn reset_network_state(&mut self) -> Result<(), StackError> {
        self.record(MeshCall::LocalReset)?;
        self.sim.provisioned = false;
        Ok(())
    }

    fn system_reset(&mut self, mode: ResetMode) {
        self.sim.calls.push(MeshCall::Reset(mode));
        warn!("mesh(sim): system reset requested ({mode:?})");
        self.reset_requested = Some(mode);
    }

    fn write_device_name(&mut self, name: &str) -> Result<(), StackError> {
        let mut owned = String::new();
        let _ = owned.push_str(name);
        self.record(MeshCall::DeviceName(owned))
    }

    fn send_user_write_response(
        &mut self,
        connection: u8,
        characteristic: u16,
        att_result: u8,
    ) -> Result<(), StackError> {
        self.record(MeshCall::WriteResponse {
            connection,
            characteristic,
            att_result,
        })
    }

    fn bt_address(&mut self) -> [u8; 6] {
        self.address
    }

    fn set_soft_timer(&mut self, timer: TimerId, period_ms: u32, one_shot: bool) -> Result<(), StackError> {
        self.record(MeshCall::SoftTimer {
            timer,
            period_ms,
            one_shot,
        })?;
        hw_timer::arm_soft_timer(timer, period_ms, one_shot).map_err(|_| StackError(ERR_REJECTED))
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF implementation
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod platform {
    use core::sync::atomic::{AtomicU16, AtomicU32, AtomicU8, Ordering};

    use esp_idf_svc::sys::*;

    use crate::events::{KeyKind, StackEvent, EVENTS, OTA_CONTROL_CHARACTERISTIC};

    pub(super) const OTA_APP_ID: u16 = 0x55;

    pub(super) static GATTS_IF: AtomicU8 = AtomicU8::new(super::GATT_IF_NONE);
    pub(super) static SVC_HANDLE: AtomicU16 = AtomicU16::new(0);
    pub(super) static OTA_CHAR_HANDLE: AtomicU16 = AtomicU16::new(0);
    /// Transaction id of the last write that needs a response.
    pub(super) static PENDING_TRANS_ID: AtomicU32 = AtomicU32::new(0);
    pub(super) static PENDING_HANDLE: AtomicU16 = AtomicU16::new(0);

    pub(super) static mut DEV_UUID: [u8; 16] = [0; 16];
    // SAFETY (all below): written once in `node_init` before `esp_ble_mesh_init`,
    // then owned by the mesh stack.
    pub(super) static mut CONFIG_SERVER: esp_ble_mesh_cfg_srv_t = unsafe { core::mem::zeroed() };
    pub(super) static mut ROOT_MODELS: [esp_ble_mesh_model_t; 3] = unsafe { core::mem::zeroed() };
    pub(super) static mut ELEMENTS: [esp_ble_mesh_elem_t; 1] = unsafe { core::mem::zeroed() };
    pub(super) static mut COMPOSITION: esp_ble_mesh_comp_t = unsafe { core::mem::zeroed() };
    pub(super) static mut PROVISION: esp_ble_mesh_prov_t = unsafe { core::mem::zeroed() };

    pub(super) unsafe extern "C" fn prov_cb(
        event: esp_ble_mesh_prov_cb_event_t,
        param: *mut esp_ble_mesh_prov_cb_param_t,
    ) {
        // SAFETY: the stack passes a valid param block for the callback's duration.
        let p = unsafe { &*param };
        let ev = match event {
            esp_ble_mesh_prov_cb_event_t_ESP_BLE_MESH_PROV_REGISTER_COMP_EVT => {
                if unsafe { p.prov_register_comp.err_code } != ESP_OK as i32 {
                    log::error!("mesh: registration failed");
                    return;
                }
                StackEvent::NodeInitialized {
                    provisioned: unsafe { esp_ble_mesh_node_is_provisioned() },
                    address: unsafe { esp_ble_mesh_get_primary_element_address() },
                    iv_index: 0,
                }
            }
            esp_ble_mesh_prov_cb_event_t_ESP_BLE_MESH_NODE_PROV_LINK_OPEN_EVT => {
                StackEvent::ProvisioningStarted
            }
            esp_ble_mesh_prov_cb_event_t_ESP_BLE_MESH_NODE_PROV_COMPLETE_EVT => {
                StackEvent::Provisioned {
                    address: unsafe { p.node_prov_complete.addr },
                }
            }
            esp_ble_mesh_prov_cb_event_t_ESP_BLE_MESH_NODE_PROV_LINK_CLOSE_EVT => {
                if unsafe { esp_ble_mesh_node_is_provisioned() } {
                    return;
                }
                StackEvent::ProvisioningFailed {
                    result: u16::from(unsafe { p.node_prov_link_close.reason }),
                }
            }
            esp_ble_mesh_prov_cb_event_t_ESP_BLE_MESH_NODE_PROV_RESET_EVT => StackEvent::NodeReset,
            esp_ble_mesh_prov_cb_event_t_ESP_BLE_MESH_FRIEND_FRIENDSHIP_ESTABLISH_EVT => {
                StackEvent::FriendshipEstablished {
                    lpn_address: unsafe { p.frnd_friendship_establish.lpn_addr },
                }
            }
            esp_ble_mesh_prov_cb_event_t_ESP_BLE_MESH_FRIEND_FRIENDSHIP_TERMINATE_EVT => {
                StackEvent::FriendshipTerminated {
                    reason: unsafe { p.frnd_friendship_terminate.reason } as u16,
                }
            }
            other => StackEvent::Unknown(other as u32),
        };
        EVENTS.post(ev);
    }

    pub(super) unsafe extern "C" fn config_server_cb(
        event: esp_ble_mesh_cfg_server_cb_event_t,
        param: *mut esp_ble_mesh_cfg_server_cb_param_t,
    ) {
        if event != esp_ble_mesh_cfg_server_cb_event_t_ESP_BLE_MESH_CFG_SERVER_STATE_CHANGE_EVT {
            return;
        }
        // SAFETY: valid for the callback's duration.
        let p = unsafe { &*param };
        let ev = match p.ctx.recv_op {
            ESP_BLE_MESH_MODEL_OP_APP_KEY_ADD => StackEvent::KeyAdded {
                kind: KeyKind::Application,
                index: unsafe { p.value.state_change.appkey_add.app_idx },
            },
            ESP_BLE_MESH_MODEL_OP_NET_KEY_ADD => StackEvent::KeyAdded {
                kind: KeyKind::Network,
                index: unsafe { p.value.state_change.netkey_add.net_idx },
            },
            ESP_BLE_MESH_MODEL_OP_MODEL_APP_BIND
            | ESP_BLE_MESH_MODEL_OP_MODEL_PUB_SET
            | ESP_BLE_MESH_MODEL_OP_MODEL_SUB_ADD => StackEvent::ModelConfigChanged,
            _ => return,
        };
        EVENTS.post(ev);
    }

    fn uuid128_to_esp(uuid: u128) -> esp_bt_uuid_t {
        // SAFETY: plain C struct; zero is a valid bit pattern.
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = ESP_UUID_LEN_128 as u16;
        t.uuid.uuid128 = uuid.to_le_bytes();
        t
    }

    pub(super) unsafe extern "C" fn gatts_cb(
        event: esp_gatts_cb_event_t,
        gatts_if: esp_gatt_if_t,
        param: *mut esp_ble_gatts_cb_param_t,
    ) {
        // SAFETY: valid for the callback's duration.
        let p = unsafe { &*param };
        if event != esp_gatts_cb_event_t_ESP_GATTS_REG_EVT
            && !super::owns_interface(GATTS_IF.load(Ordering::Acquire), gatts_if)
        {
            return;
        }
        match event {
            esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                if unsafe { p.reg.app_id } != OTA_APP_ID {
                    return;
                }
                GATTS_IF.store(gatts_if, Ordering::Release);
                let mut svc_id = esp_gatt_srvc_id_t {
                    id: esp_gatt_id_t {
                        uuid: uuid128_to_esp(super::OTA_SERVICE_UUID),
                        inst_id: 0,
                    },
                    is_primary: true,
                };
                unsafe { esp_ble_gatts_create_service(gatts_if, &mut svc_id, 4) };
            }
            esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                let svc = unsafe { p.create.service_handle };
                SVC_HANDLE.store(svc, Ordering::Release);
                unsafe {
                    esp_ble_gatts_start_service(svc);
                    let mut uuid = uuid128_to_esp(super::OTA_CONTROL_UUID);
                    esp_ble_gatts_add_char(
                        svc,
                        &mut uuid,
                        ESP_GATT_PERM_WRITE as esp_gatt_perm_t,
                        ESP_GATT_CHAR_PROP_BIT_WRITE as esp_gatt_char_prop_t,
                        core::ptr::null_mut(),
                        core::ptr::null_mut(),
                    );
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
                OTA_CHAR_HANDLE.store(unsafe { p.add_char.attr_handle }, Ordering::Release);
            }
            esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                let conn = unsafe { p.connect.conn_id } as u8;
                EVENTS.post(StackEvent::ConnectionOpened { connection: conn });
            }
            esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                let reason = unsafe { p.disconnect.reason } as u16;
                EVENTS.post(StackEvent::ConnectionClosed { reason });
            }
            esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                let w = unsafe { &p.write };
                let characteristic = if w.handle == OTA_CHAR_HANDLE.load(Ordering::Acquire) {
                    OTA_CONTROL_CHARACTERISTIC
                } else {
                    w.handle
                };
                if w.need_rsp {
                    PENDING_TRANS_ID.store(w.trans_id, Ordering::Release);
                    PENDING_HANDLE.store(w.handle, Ordering::Release);
                }
                EVENTS.post(StackEvent::GattUserWrite {
                    connection: w.conn_id as u8,
                    characteristic,
                });
            }
            esp_gatts_cb_event_t_ESP_GATTS_CONF_EVT => {}
            _ => {}
        }
    }

    pub(super) unsafe extern "C" fn gap_cb(
        event: esp_gap_ble_cb_event_t,
        _param: *mut esp_ble_gap_cb_param_t,
    ) {
        if event == esp_gap_ble_cb_event_t_ESP_GAP_BLE_UPDATE_CONN_PARAMS_EVT {
            EVENTS.post(StackEvent::ConnectionParameters);
        }
    }

    pub(super) fn check(rc: i32) -> Result<(), crate::error::StackError> {
        if rc == ESP_OK as i32 {
            Ok(())
        } else {
            Err(crate::error::StackError(rc as u16))
        }
    }
}

#[cfg(target_os = "espidf")]
impl MeshAdapter {
    /// Bring up the controller and Bluedroid host.
    unsafe fn bluedroid_up() -> Result<(), StackError> {
        use esp_idf_svc::sys::*;
        use platform::check;
        unsafe {
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);
            let mut bt_cfg = esp_bt_controller_config_t::default();
            check(esp_bt_controller_init(&mut bt_cfg))?;
            check(esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE))?;
            check(esp_bluedroid_init())?;
            check(esp_bluedroid_enable())?;
            check(esp_ble_gap_register_callback(Some(platform::gap_cb)))?;
            check(esp_ble_gatts_register_callback(Some(platform::gatts_cb)))?;
            check(esp_ble_gatts_app_register(platform::OTA_APP_ID))?;
        }
        Ok(())
    }

    /// Fill the static composition: config server plus generic on/off and
    /// level servers on one element.
    unsafe fn build_composition(&self) {
        use esp_idf_svc::sys::*;
        use platform::*;
        unsafe {
            let uuid = &mut *(&raw mut DEV_UUID);
            uuid[..6].copy_from_slice(&self.address);

            let cfg = &mut *(&raw mut CONFIG_SERVER);
            cfg.relay = ESP_BLE_MESH_RELAY_DISABLED as u8;
            cfg.beacon = ESP_BLE_MESH_BEACON_ENABLED as u8;
            cfg.friend_state = ESP_BLE_MESH_FRIEND_NOT_SUPPORTED as u8;
            cfg.gatt_proxy = ESP_BLE_MESH_GATT_PROXY_ENABLED as u8;
            cfg.default_ttl = 7;

            let models = &mut *(&raw mut ROOT_MODELS);
            let ids = [
                ESP_BLE_MESH_MODEL_ID_CONFIG_SRV as u16,
                crate::events::MODEL_GENERIC_ON_OFF_SERVER,
                crate::events::MODEL_GENERIC_LEVEL_SERVER,
            ];
            for (model, id) in models.iter_mut().zip(ids) {
                model.__bindgen_anon_1.model_id = id;
                model.keys.fill(ESP_BLE_MESH_KEY_UNUSED as u16);
            }
            models[0].user_data = (&raw mut CONFIG_SERVER).cast();
            models[1].user_data = crate::adapters::models::onoff_server_ptr();
            models[2].user_data = crate::adapters::models::level_server_ptr();

            let elems = &mut *(&raw mut ELEMENTS);
            elems[0].sig_model_count = models.len() as u8;
            elems[0].sig_models = models.as_mut_ptr();

            let comp = &mut *(&raw mut COMPOSITION);
            comp.cid = 0x02E5;
            comp.element_count = 1;
            comp.elements = elems.as_mut_ptr();

            let prov = &mut *(&raw mut PROVISION);
            prov.uuid = uuid.as_ptr();
        }
    }
}

#[cfg(target_os = "espidf")]
impl MeshStackPort for MeshAdapter {
    fn node_init(&mut self) -> Result<(), StackError> {
        use esp_idf_svc::sys::*;
        use platform::*;
        // SAFETY: main task; statics are handed to the stack exactly once.
        unsafe {
            Self::bluedroid_up()?;
            self.build_composition();
            check(esp_ble_mesh_register_prov_callback(Some(prov_cb)))?;
            check(esp_ble_mesh_register_config_server_callback(Some(config_server_cb)))?;
            check(esp_ble_mesh_init(&raw mut PROVISION, &raw mut COMPOSITION))?;
        }
        info!("mesh: stack initialised");
        Ok(())
    }

    fn generic_server_init(&mut self) -> Result<(), StackError> {
        // Generic servers are part of the composition registered in node_init.
        info!("mesh: generic servers ready");
        Ok(())
    }

    fn friend_init(&mut self) -> Result<(), StackError> {
        use esp_idf_svc::sys::*;
        // SAFETY: the stack reads friend_state on the next config access.
        unsafe {
            (*(&raw mut platform::CONFIG_SERVER)).friend_state = ESP_BLE_MESH_FRIEND_ENABLED as u8;
        }
        info!("mesh: friend role enabled");
        Ok(())
    }

    fn start_unprov_beaconing(&mut self, bearers: u8) -> Result<(), StackError> {
        use esp_idf_svc::sys::*;
        // SAFETY: stack initialised in node_init.
        platform::check(unsafe { esp_ble_mesh_node_prov_enable(bearers as esp_ble_mesh_prov_bearer_t) })
    }

    fn close_connection(&mut self, connection: u8) -> Result<(), StackError> {
        use esp_idf_svc::sys::*;
        let gatts_if = platform::GATTS_IF.load(core::sync::atomic::Ordering::Acquire);
        // SAFETY: Bluedroid is up; an unknown conn id is reported as an error.
        platform::check(unsafe { esp_ble_gatts_close(gatts_if, u16::from(connection)) })
    }

    fn reset_network_state(&mut self) -> Result<(), StackError> {
        use esp_idf_svc::sys::*;
        // SAFETY: stack initialised in node_init; the reset is synchronous.
        platform::check(unsafe { esp_ble_mesh_node_local_reset() })?;
        warn!("mesh: local network state reset");
        Ok(())
    }

    fn system_reset(&mut self, mode: ResetMode) {
        use esp_idf_svc::sys::*;
        self.reset_requested = Some(mode);
        // SAFETY: esp_restart does not return; the partition table is static.
        unsafe {
            if mode == ResetMode::Dfu {
                let loader = esp_partition_find_first(
                    esp_partition_type_t_ESP_PARTITION_TYPE_APP,
                    esp_partition_subtype_t_ESP_PARTITION_SUBTYPE_APP_FACTORY,
                    core::ptr::null(),
                );
                if loader.is_null() || esp_ota_set_boot_partition(loader) != ESP_OK as i32 {
                    warn!("mesh: update loader not found, plain restart");
                }
            }
            esp_restart();
        }
    }

    fn write_device_name(&mut self, name: &str) -> Result<(), StackError> {
        use esp_idf_svc::sys::*;
        let mut buf = [0u8; 33];
        let len = name.len().min(32);
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);
        // SAFETY: NUL-terminated buffer valid for the call.
        platform::check(unsafe { esp_ble_gap_set_device_name(buf.as_ptr() as *const _) })
    }

    fn send_user_write_response(
        &mut self,
        connection: u8,
        _characteristic: u16,
        att_result: u8,
    ) -> Result<(), StackError> {
        use core::sync::atomic::Ordering;
        use esp_idf_svc::sys::*;
        let gatts_if = platform::GATTS_IF.load(Ordering::Acquire);
        let trans_id = platform::PENDING_TRANS_ID.load(Ordering::Acquire);
        // SAFETY: plain C struct; zero is a valid bit pattern.
        let mut rsp: esp_gatt_rsp_t = unsafe { core::mem::zeroed() };
        rsp.attr_value.handle = platform::PENDING_HANDLE.load(Ordering::Acquire);
        platform::check(unsafe {
            esp_ble_gatts_send_response(
                gatts_if,
                u16::from(connection),
                trans_id,
                att_result as esp_gatt_status_t,
                &mut rsp,
            )
        })
    }

    fn bt_address(&mut self) -> [u8; 6] {
        self.address
    }

    fn set_soft_timer(&mut self, timer: TimerId, period_ms: u32, one_shot: bool) -> Result<(), StackError> {
        hw_timer::arm_soft_timer(timer, period_ms, one_shot).map_err(|e| {
            warn!("mesh: {timer:?} {e}");
            StackError(ERR_REJECTED)
        })
    }
}
