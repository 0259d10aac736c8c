//! Recording mock node for integration tests.
//!
//! Implements every port trait the dispatcher needs, records each call in
//! order, and lets tests script button levels, bus behaviour and
//! collaborator failures.

use std::collections::{HashMap, VecDeque};

use meshnode::app::ports::{
    BusPort, Button, DisplayPort, DisplayRow, IndicatorPort, InputPort, MeshStackPort, ModelPort,
    ResetMode, StoragePort,
};
use meshnode::error::{BusError, InterruptError, StackError, StorageError};
use meshnode::events::{ModelEvent, TimerId};
use meshnode::pins::{MOTION_GPIO, PB0_GPIO};
use meshnode::session::PsKey;

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    NodeInit,
    GenericServerInit,
    FriendInit,
    StartBeaconing { bearers: u8 },
    CloseConnection(u8),
    ResetNetworkState,
    SystemReset(ResetMode),
    WriteDeviceName(String),
    UserWriteResponse { connection: u8, characteristic: u16, att_result: u8 },
    SetSoftTimer { timer: TimerId, period_ms: u32, one_shot: bool },
    RegisterHandlers,
    InitModels,
    ModelEvent(ModelEvent),
    Save { key: PsKey, data: Vec<u8> },
    EraseAll,
    Print { row: DisplayRow, text: String },
    Update,
    RaiseAlert,
    ClearAlert,
    ToggleLed,
    EnableButtonInterrupts,
    EnableMotionInterrupt,
    StartAcquisitionTimer(u32),
    StartWrite(u8),
    StartRead(usize),
}

// ── MockNode ──────────────────────────────────────────────────

pub struct MockNode {
    pub calls: Vec<Call>,
    pub address: [u8; 6],
    pub store: HashMap<PsKey, Vec<u8>>,
    pub pb0_pressed: bool,
    pub pb1_pressed: bool,
    /// Bytes handed out by the next `read_result`.
    pub sensor_bytes: Option<[u8; 2]>,
    /// Bus requests refused with `Busy`, front first.
    pub bus_rejections: VecDeque<BusError>,
    /// Stack calls that fail with this code when set.
    pub stack_failure: Option<u16>,
    /// Interrupt arming fails with this driver code when set.
    pub interrupt_failure: Option<i32>,
}

impl MockNode {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            address: [0x11, 0x22, 0x33, 0x44, 0x55, 0x66],
            store: HashMap::new(),
            pb0_pressed: false,
            pb1_pressed: false,
            sensor_bytes: Some([0x80, 0x00]),
            bus_rejections: VecDeque::new(),
            stack_failure: None,
            interrupt_failure: None,
        }
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn has(&self, call: &Call) -> bool {
        self.calls.contains(call)
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }

    /// Last text printed to `row`, if any.
    pub fn row(&self, row: DisplayRow) -> Option<&str> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::Print { row: r, text } if *r == row => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn prints_to(&self, row: DisplayRow) -> usize {
        self.count(|c| matches!(c, Call::Print { row: r, .. } if *r == row))
    }

    pub fn timer(&self, timer: TimerId) -> Option<(u32, bool)> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::SetSoftTimer {
                timer: t,
                period_ms,
                one_shot,
            } if *t == timer => Some((*period_ms, *one_shot)),
            _ => None,
        })
    }

    pub fn resets(&self) -> Vec<ResetMode> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::SystemReset(mode) => Some(*mode),
                _ => None,
            })
            .collect()
    }

    pub fn stored(&self, key: PsKey) -> Option<&[u8]> {
        self.store.get(&key).map(Vec::as_slice)
    }

    fn stack_result(&self) -> Result<(), StackError> {
        match self.stack_failure {
            Some(code) => Err(StackError(code)),
            None => Ok(()),
        }
    }

    fn interrupt_result(&self, pin: i32) -> Result<(), InterruptError> {
        match self.interrupt_failure {
            Some(code) => Err(InterruptError { pin, code }),
            None => Ok(()),
        }
    }

    fn bus_result(&mut self) -> Result<(), BusError> {
        match self.bus_rejections.pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for MockNode {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshStackPort for MockNode {
    fn node_init(&mut self) -> Result<(), StackError> {
        self.calls.push(Call::NodeInit);
        self.stack_result()
    }

    fn generic_server_init(&mut self) -> Result<(), StackError> {
        self.calls.push(Call::GenericServerInit);
        self.stack_result()
    }

    fn friend_init(&mut self) -> Result<(), StackError> {
        self.calls.push(Call::FriendInit);
        self.stack_result()
    }

    fn start_unprov_beaconing(&mut self, bearers: u8) -> Result<(), StackError> {
        self.calls.push(Call::StartBeaconing { bearers });
        self.stack_result()
    }

    fn close_connection(&mut self, connection: u8) -> Result<(), StackError> {
        self.calls.push(Call::CloseConnection(connection));
        self.stack_result()
    }

    fn reset_network_state(&mut self) -> Result<(), StackError> {
        self.calls.push(Call::ResetNetworkState);
        self.stack_result()
    }

    fn system_reset(&mut self, mode: ResetMode) {
        self.calls.push(Call::SystemReset(mode));
    }

    fn write_device_name(&mut self, name: &str) -> Result<(), StackError> {
        self.calls.push(Call::WriteDeviceName(name.to_string()));
        self.stack_result()
    }

    fn send_user_write_response(
        &mut self,
        connection: u8,
        characteristic: u16,
        att_result: u8,
    ) -> Result<(), StackError> {
        self.calls.push(Call::UserWriteResponse {
            connection,
            characteristic,
            att_result,
        });
        self.stack_result()
    }

    fn bt_address(&mut self) -> [u8; 6] {
        self.address
    }

    fn set_soft_timer(
        &mut self,
        timer: TimerId,
        period_ms: u32,
        one_shot: bool,
    ) -> Result<(), StackError> {
        self.calls.push(Call::SetSoftTimer {
            timer,
            period_ms,
            one_shot,
        });
        self.stack_result()
    }
}

impl ModelPort for MockNode {
    fn register_handlers(&mut self) -> Result<(), StackError> {
        self.calls.push(Call::RegisterHandlers);
        self.stack_result()
    }

    fn init_models(&mut self) -> Result<(), StackError> {
        self.calls.push(Call::InitModels);
        self.stack_result()
    }

    fn handle_model_event(&mut self, event: &ModelEvent) {
        self.calls.push(Call::ModelEvent(event.clone()));
    }
}

impl StoragePort for MockNode {
    fn save(&mut self, key: PsKey, data: &[u8]) -> Result<(), StorageError> {
        self.calls.push(Call::Save {
            key,
            data: data.to_vec(),
        });
        self.store.insert(key, data.to_vec());
        Ok(())
    }

    fn load(&mut self, key: PsKey, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self.store.get(&key).ok_or(StorageError::NotFound)?;
        if data.len() > buf.len() {
            return Err(StorageError::SizeMismatch);
        }
        buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn erase_all(&mut self) -> Result<(), StorageError> {
        self.calls.push(Call::EraseAll);
        self.store.clear();
        Ok(())
    }
}

impl DisplayPort for MockNode {
    fn print(&mut self, row: DisplayRow, text: &str) {
        self.calls.push(Call::Print {
            row,
            text: text.to_string(),
        });
    }

    fn update(&mut self) {
        self.calls.push(Call::Update);
    }
}

impl IndicatorPort for MockNode {
    fn raise_alert(&mut self) {
        self.calls.push(Call::RaiseAlert);
    }

    fn clear_alert(&mut self) {
        self.calls.push(Call::ClearAlert);
    }

    fn toggle_provisioning_led(&mut self) {
        self.calls.push(Call::ToggleLed);
    }
}

impl InputPort for MockNode {
    fn button_pressed(&mut self, button: Button) -> bool {
        match button {
            Button::Pb0 => self.pb0_pressed,
            Button::Pb1 => self.pb1_pressed,
        }
    }

    fn enable_button_interrupts(&mut self) -> Result<(), InterruptError> {
        self.calls.push(Call::EnableButtonInterrupts);
        self.interrupt_result(PB0_GPIO)
    }

    fn enable_motion_interrupt(&mut self) -> Result<(), InterruptError> {
        self.calls.push(Call::EnableMotionInterrupt);
        self.interrupt_result(MOTION_GPIO)
    }

    fn start_acquisition_timer(&mut self, period_ms: u32) {
        self.calls.push(Call::StartAcquisitionTimer(period_ms));
    }
}

impl BusPort for MockNode {
    fn start_write(&mut self, command: u8) -> Result<(), BusError> {
        self.calls.push(Call::StartWrite(command));
        self.bus_result()
    }

    fn start_read(&mut self, len: usize) -> Result<(), BusError> {
        self.calls.push(Call::StartRead(len));
        self.bus_result()
    }

    fn read_result(&mut self, buf: &mut [u8]) -> Result<usize, BusError> {
        let bytes = self.sensor_bytes.ok_or(BusError::NoData)?;
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }
}
