//! Generic server models.
//!
//! Implements [`ModelPort`].  The node exposes a Generic OnOff server, whose
//! state is "authorised personnel present", and a Generic Level server.
//! The dispatcher hands server events over uninterpreted; this adapter
//! decodes them, keeps the model state, and posts `AuthorityChanged` when
//! the on/off state actually changes.
//!
//! Payload layout of a [`ModelMessage`]:
//!
//! | Model  | Bytes                  |
//! |--------|------------------------|
//! | OnOff  | `[onoff]`              |
//! | Level  | `[lo, hi]` (i16 LE)    |

use log::{debug, info, warn};

use crate::adapters::mesh::Events;
use crate::app::ports::ModelPort;
use crate::error::StackError;
use crate::events::{
    ModelEvent, ModelMessage, StackEvent, MODEL_GENERIC_LEVEL_SERVER, MODEL_GENERIC_ON_OFF_SERVER,
};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelState {
    pub onoff: bool,
    pub level: i16,
}

pub struct GenericModels {
    events: Events,
    state: ModelState,
    handlers_registered: bool,
    initialized: bool,
}

impl GenericModels {
    pub fn new(events: Events) -> Self {
        Self {
            events,
            state: ModelState::default(),
            handlers_registered: false,
            initialized: false,
        }
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn apply_onoff(&mut self, msg: &ModelMessage) {
        let Some(&raw) = msg.payload.first() else {
            warn!("models: empty on/off payload from 0x{:04x}", msg.client_address);
            return;
        };
        let onoff = raw != 0;
        if onoff == self.state.onoff {
            return;
        }
        self.state.onoff = onoff;
        info!("models: on/off -> {onoff} (from 0x{:04x})", msg.client_address);
        self.events.post(StackEvent::AuthorityChanged { present: onoff });
    }

    fn apply_level(&mut self, msg: &ModelMessage) {
        match msg.payload.as_slice() {
            [lo, hi, ..] => {
                self.state.level = i16::from_le_bytes([*lo, *hi]);
                debug!("models: level -> {}", self.state.level);
            }
            _ => warn!("models: short level payload ({} bytes)", msg.payload.len()),
        }
    }
}

impl ModelPort for GenericModels {
    fn register_handlers(&mut self) -> Result<(), StackError> {
        if self.handlers_registered {
            return Ok(());
        }
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: the callback is a static fn that only posts to the queue.
            let rc = unsafe { esp_ble_mesh_register_generic_server_callback(Some(generic_server_cb)) };
            if rc != ESP_OK as i32 {
                return Err(StackError(rc as u16));
            }
        }
        self.handlers_registered = true;
        info!("models: on/off and level handlers registered");
        Ok(())
    }

    fn init_models(&mut self) -> Result<(), StackError> {
        self.state = ModelState::default();
        self.initialized = true;
        info!("models: state initialised");
        Ok(())
    }

    fn handle_model_event(&mut self, event: &ModelEvent) {
        let msg = event.message();
        match (event, msg.model_id) {
            (ModelEvent::StateRecall(_), _) => {
                debug!("models: recall for 0x{:04x}", msg.model_id);
            }
            (_, MODEL_GENERIC_ON_OFF_SERVER) => self.apply_onoff(msg),
            (_, MODEL_GENERIC_LEVEL_SERVER) => self.apply_level(msg),
            (_, other) => debug!("models: ignoring model 0x{other:04x}"),
        }
    }
}

// ── ESP-IDF server state and callback ─────────────────────────

#[cfg(target_os = "espidf")]
static mut ONOFF_SERVER: esp_ble_mesh_gen_onoff_srv_t = unsafe { core::mem::zeroed() };
#[cfg(target_os = "espidf")]
static mut LEVEL_SERVER: esp_ble_mesh_gen_level_srv_t = unsafe { core::mem::zeroed() };

/// User data for the on/off server model, with stack auto-responses on.
#[cfg(target_os = "espidf")]
pub fn onoff_server_ptr() -> *mut core::ffi::c_void {
    // SAFETY: called once while building the composition.
    unsafe {
        let srv = &mut *(&raw mut ONOFF_SERVER);
        srv.rsp_ctrl.get_auto_rsp = ESP_BLE_MESH_SERVER_AUTO_RSP as u8;
        srv.rsp_ctrl.set_auto_rsp = ESP_BLE_MESH_SERVER_AUTO_RSP as u8;
        (&raw mut ONOFF_SERVER).cast()
    }
}

#[cfg(target_os = "espidf")]
pub fn level_server_ptr() -> *mut core::ffi::c_void {
    // SAFETY: as for onoff_server_ptr().
    unsafe {
        let srv = &mut *(&raw mut LEVEL_SERVER);
        srv.rsp_ctrl.get_auto_rsp = ESP_BLE_MESH_SERVER_AUTO_RSP as u8;
        srv.rsp_ctrl.set_auto_rsp = ESP_BLE_MESH_SERVER_AUTO_RSP as u8;
        (&raw mut LEVEL_SERVER).cast()
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn generic_server_cb(
    event: esp_ble_mesh_generic_server_cb_event_t,
    param: *mut esp_ble_mesh_generic_server_cb_param_t,
) {
    // SAFETY: valid for the callback's duration; model points into the composition.
    let p = unsafe { &*param };
    let model_id = unsafe { (*p.model).__bindgen_anon_1.model_id };
    let mut payload = heapless::Vec::new();
    match model_id {
        MODEL_GENERIC_ON_OFF_SERVER => {
            let _ = payload.push(unsafe { (*(&raw const ONOFF_SERVER)).state.onoff });
        }
        MODEL_GENERIC_LEVEL_SERVER => {
            let level = unsafe { (*(&raw const LEVEL_SERVER)).state.level };
            let _ = payload.extend_from_slice(&level.to_le_bytes());
        }
        _ => {}
    }
    let msg = ModelMessage {
        model_id,
        elem_index: unsafe { (*p.model).element_idx } as u16,
        client_address: p.ctx.addr,
        appkey_index: p.ctx.app_idx,
        payload,
    };
    let ev = match event {
        esp_ble_mesh_generic_server_cb_event_t_ESP_BLE_MESH_GENERIC_SERVER_STATE_CHANGE_EVT => {
            ModelEvent::StateChanged(msg)
        }
        esp_ble_mesh_generic_server_cb_event_t_ESP_BLE_MESH_GENERIC_SERVER_RECV_SET_MSG_EVT => {
            ModelEvent::ClientRequest(msg)
        }
        _ => return,
    };
    crate::events::EVENTS.post(StackEvent::ModelServer(ev));
}
