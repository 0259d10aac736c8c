//! Node adapter: bundles every collaborator behind the port traits.
//!
//! Owns the mesh stack, model library, flash store, display, LEDs, inputs
//! and sensor bus, and exposes them as one [`NodePorts`] borrow for the
//! dispatcher.  Every method is a straight delegation; the only policy here
//! is logging failures of fire-and-forget hardware calls.
//!
//! [`NodePorts`]: crate::app::ports::NodePorts

use log::warn;

use crate::adapters::display::RowDisplay;
use crate::adapters::mesh::MeshAdapter;
use crate::adapters::models::GenericModels;
use crate::adapters::nvs::NvsAdapter;
use crate::app::ports::{
    BusPort, Button, DisplayPort, DisplayRow, IndicatorPort, InputPort, MeshStackPort, ModelPort,
    ResetMode, StoragePort,
};
use crate::drivers::button::ButtonDriver;
use crate::drivers::hw_init::GpioOut;
use crate::drivers::hw_timer;
use crate::drivers::i2c::I2cBus;
use crate::drivers::indicators::AlertLeds;
use crate::drivers::motion::MotionSensor;
use crate::error::{BusError, InterruptError, StackError, StorageError};
use crate::events::{ModelEvent, TimerId};
use crate::session::PsKey;

pub struct NodeAdapter {
    pub mesh: MeshAdapter,
    pub models: GenericModels,
    pub storage: NvsAdapter,
    pub display: RowDisplay,
    pub leds: AlertLeds<GpioOut, GpioOut>,
    pub buttons: ButtonDriver,
    pub motion: MotionSensor,
    pub bus: I2cBus,
}

impl NodeAdapter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mesh: MeshAdapter,
        models: GenericModels,
        storage: NvsAdapter,
        display: RowDisplay,
        leds: AlertLeds<GpioOut, GpioOut>,
        buttons: ButtonDriver,
        motion: MotionSensor,
        bus: I2cBus,
    ) -> Self {
        Self {
            mesh,
            models,
            storage,
            display,
            leds,
            buttons,
            motion,
            bus,
        }
    }
}

// ── MeshStackPort ─────────────────────────────────────────────

impl MeshStackPort for NodeAdapter {
    fn node_init(&mut self) -> Result<(), StackError> {
        self.mesh.node_init()
    }

    fn generic_server_init(&mut self) -> Result<(), StackError> {
        self.mesh.generic_server_init()
    }

    fn friend_init(&mut self) -> Result<(), StackError> {
        self.mesh.friend_init()
    }

    fn start_unprov_beaconing(&mut self, bearers: u8) -> Result<(), StackError> {
        self.mesh.start_unprov_beaconing(bearers)
    }

    fn close_connection(&mut self, connection: u8) -> Result<(), StackError> {
        self.mesh.close_connection(connection)
    }

    fn reset_network_state(&mut self) -> Result<(), StackError> {
        self.mesh.reset_network_state()
    }

    fn system_reset(&mut self, mode: ResetMode) {
        self.mesh.system_reset(mode)
    }

    fn write_device_name(&mut self, name: &str) -> Result<(), StackError> {
        self.mesh.write_device_name(name)
    }

    fn send_user_write_response(
        &mut self,
        connection: u8,
        characteristic: u16,
        att_result: u8,
    ) -> Result<(), StackError> {
        self.mesh
            .send_user_write_response(connection, characteristic, att_result)
    }

    fn bt_address(&mut self) -> [u8; 6] {
        self.mesh.bt_address()
    }

    fn set_soft_timer(&mut self, timer: TimerId, period_ms: u32, one_shot: bool) -> Result<(), StackError> {
        self.mesh.set_soft_timer(timer, period_ms, one_shot)
    }
}

// ── ModelPort ─────────────────────────────────────────────────

impl ModelPort for NodeAdapter {
    fn register_handlers(&mut self) -> Result<(), StackError> {
        self.models.register_handlers()
    }

    fn init_models(&mut self) -> Result<(), StackError> {
        self.models.init_models()
    }

    fn handle_model_event(&mut self, event: &ModelEvent) {
        self.models.handle_model_event(event)
    }
}

// ── StoragePort ───────────────────────────────────────────────

impl StoragePort for NodeAdapter {
    fn save(&mut self, key: PsKey, data: &[u8]) -> Result<(), StorageError> {
        self.storage.save(key, data)
    }

    fn load(&mut self, key: PsKey, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.storage.load(key, buf)
    }

    fn erase_all(&mut self) -> Result<(), StorageError> {
        self.storage.erase_all()
    }
}

// ── Presentation ──────────────────────────────────────────────

impl DisplayPort for NodeAdapter {
    fn print(&mut self, row: DisplayRow, text: &str) {
        self.display.print(row, text)
    }

    fn update(&mut self) {
        self.display.update()
    }
}

impl IndicatorPort for NodeAdapter {
    fn raise_alert(&mut self) {
        self.leds.raise()
    }

    fn clear_alert(&mut self) {
        self.leds.clear()
    }

    fn toggle_provisioning_led(&mut self) {
        self.leds.toggle()
    }
}

// ── Inputs ────────────────────────────────────────────────────

impl InputPort for NodeAdapter {
    fn button_pressed(&mut self, button: Button) -> bool {
        self.buttons.is_pressed(button)
    }

    fn enable_button_interrupts(&mut self) -> Result<(), InterruptError> {
        self.buttons.enable_interrupts()
    }

    fn enable_motion_interrupt(&mut self) -> Result<(), InterruptError> {
        self.motion.enable()
    }

    fn start_acquisition_timer(&mut self, period_ms: u32) {
        if let Err(e) = hw_timer::start_acquisition_timer(period_ms) {
            warn!("node: acquisition timer not started: {e}");
        }
    }
}

// ── Sensor bus ────────────────────────────────────────────────

impl BusPort for NodeAdapter {
    fn start_write(&mut self, command: u8) -> Result<(), BusError> {
        self.bus.start_write(command)
    }

    fn start_read(&mut self, len: usize) -> Result<(), BusError> {
        self.bus.start_read(len)
    }

    fn read_result(&mut self, buf: &mut [u8]) -> Result<usize, BusError> {
        self.bus.read_result(buf)
    }
}
