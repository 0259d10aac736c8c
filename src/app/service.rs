//! Event dispatcher: the hexagonal core.
//!
//! [`Dispatcher`] owns the session state, the acquisition FSM and its
//! context.  Every stack event, timer expiry and drained signal enters
//! through [`Dispatcher::on_event`]; each variant has its own handler.  All
//! I/O flows through the port bundle passed in at the call site, making the
//! whole core testable with a mock node.
//!
//! ```text
//!  StackEvent ──▶ ┌──────────────────────────┐ ──▶ MeshStackPort / ModelPort
//!                 │        Dispatcher         │ ──▶ DisplayPort / IndicatorPort
//!  SignalSet  ──▶ │  Session · Acquisition FSM│ ──▶ StoragePort
//!                 └──────────────────────────┘ ◀─▶ BusPort / InputPort
//! ```
//!
//! Collaborator failures are logged with their result code and never
//! escalated.  The dispatcher is never re-entered.

use core::fmt::Write;

use heapless::String;
use log::{debug, info, warn};

use crate::adapters::device_id;
use crate::config::NodeConfig;
use crate::events::{
    self, KeyKind, ModelEvent, StackEvent, TimerId, OTA_CONTROL_CHARACTERISTIC,
};
use crate::fsm::context::{AcqContext, BusRequest};
use crate::fsm::{Fsm, StateId};
use crate::sensors::humidity::{self, Reading};
use crate::session::{PsKey, SessionState};
use crate::signals::{Signal, SignalSet};

use super::ports::{Button, DisplayRow, NodePorts, ResetMode};

/// ATT "success" result for user write responses.
const ATT_SUCCESS: u8 = 0;

/// Short text for a display row.
type RowText = String<32>;

// ───────────────────────────────────────────────────────────────
// Dispatcher
// ───────────────────────────────────────────────────────────────

pub struct Dispatcher {
    config: NodeConfig,
    session: SessionState,
    fsm: Fsm,
    acq: AcqContext,
}

impl Dispatcher {
    /// Construct the dispatcher with a fresh session and the acquisition
    /// machine resting in `Idle`.
    pub fn new(config: NodeConfig) -> Self {
        let mut acq = AcqContext::new(config.sensor_command);
        let mut fsm = Fsm::acquisition();
        fsm.start(&mut acq);
        Self {
            config,
            session: SessionState::new(),
            fsm,
            acq,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn acquisition_state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn last_reading(&self) -> Option<Reading> {
        self.acq.reading
    }

    pub fn decode_count(&self) -> u32 {
        self.acq.decode_count
    }

    /// Cycles abandoned because of a bus fault or a rejected request.
    pub fn acquisition_faults(&self) -> u32 {
        self.acq.faults
    }

    // ── Entry points ──────────────────────────────────────────

    /// Route one event.  Called once per occurrence, from the main loop only.
    pub fn on_event(&mut self, event: StackEvent, node: &mut impl NodePorts) {
        match event {
            StackEvent::Boot => self.on_boot(node),
            StackEvent::SoftTimer(timer) => self.on_soft_timer(timer, node),
            StackEvent::NodeInitialized {
                provisioned,
                address,
                iv_index,
            } => self.on_node_initialized(provisioned, address, iv_index, node),
            StackEvent::ProvisioningStarted => self.on_provisioning_started(node),
            StackEvent::Provisioned { address } => self.on_provisioned(address, node),
            StackEvent::ProvisioningFailed { result } => self.on_provisioning_failed(result, node),
            StackEvent::KeyAdded { kind, index } => self.on_key_added(kind, index),
            StackEvent::ModelConfigChanged => info!("model config changed"),
            StackEvent::ModelServer(model_event) => self.on_model_event(&model_event, node),
            StackEvent::NodeReset => {
                info!("node reset requested by provisioner");
                self.factory_reset(node);
            }
            StackEvent::FriendshipEstablished { lpn_address } => {
                self.on_friendship_established(lpn_address, node);
            }
            StackEvent::FriendshipTerminated { reason } => {
                self.on_friendship_terminated(reason, node);
            }
            // Advertising timeouts are expected and carry nothing to act on.
            StackEvent::AdvertisingTimeout => {}
            StackEvent::ConnectionOpened { connection } => {
                self.on_connection_opened(connection, node);
            }
            StackEvent::ConnectionParameters => debug!("connection parameters updated"),
            StackEvent::ConnectionClosed { reason } => self.on_connection_closed(reason, node),
            StackEvent::GattUserWrite {
                connection,
                characteristic,
            } => self.on_gatt_user_write(connection, characteristic, node),
            StackEvent::AuthorityChanged { present } => self.on_authority_changed(present, node),
            StackEvent::Signal(signal) => self.on_signal(signal, node),
            StackEvent::Unknown(id) => debug!("ignoring unhandled event 0x{id:08x}"),
        }
    }

    /// Take every pending signal and route each one, bus completions before
    /// the acquisition tick.
    pub fn drain_signals(&mut self, signals: &SignalSet, node: &mut impl NodePorts) {
        for event in events::signal_events(signals.take_all()) {
            self.on_event(event, node);
        }
    }

    // ── System ────────────────────────────────────────────────

    fn on_boot(&mut self, node: &mut impl NodePorts) {
        if let Err(e) = node.set_soft_timer(
            TimerId::DisplayRefresh,
            self.config.display_refresh_ms,
            false,
        ) {
            warn!("display refresh timer failed: {e}");
        }

        if node.button_pressed(Button::Pb0) || node.button_pressed(Button::Pb1) {
            self.factory_reset(node);
            return;
        }

        let addr = node.bt_address();
        let name = device_id::device_name(&self.config.name_prefix, &addr);
        info!("device name: '{}'", name);
        if let Err(e) = node.write_device_name(&name) {
            warn!("write device name failed: {e}");
        }
        node.print(DisplayRow::Name, &name);
        node.print(DisplayRow::Address, &device_id::format_address(&addr));

        if let Err(e) = node.node_init() {
            warn!("mesh node init failed: {e}");
            let mut text = RowText::new();
            let _ = write!(text, "init failed (0x{:x})", e.code());
            node.print(DisplayRow::Status, &text);
        }
    }

    /// Close any connection, erase persisted and network state, reboot after
    /// a delay.
    /// Safe to repeat: each call issues the same sequence.
    fn factory_reset(&mut self, node: &mut impl NodePorts) {
        info!("factory reset");
        node.print(DisplayRow::Status, "***FACTORY RESET***");

        if let Some(connection) = self.session.connection {
            if let Err(e) = node.close_connection(connection) {
                warn!("close connection {connection} failed: {e}");
            }
        }
        if let Err(e) = node.erase_all() {
            warn!("persistent store erase failed: {e}");
        }
        if let Err(e) = node.reset_network_state() {
            warn!("mesh network reset failed: {e}");
        }
        if let Err(e) = node.set_soft_timer(
            TimerId::FactoryReset,
            self.config.factory_reset_delay_ms,
            true,
        ) {
            warn!("factory reset timer failed: {e}");
        }
    }

    fn on_soft_timer(&mut self, timer: TimerId, node: &mut impl NodePorts) {
        match timer {
            TimerId::DisplayRefresh => node.update(),
            TimerId::FactoryReset | TimerId::Restart => node.system_reset(ResetMode::Normal),
            TimerId::ProvisioningBlink => {
                if !self.session.init_done {
                    node.toggle_provisioning_led();
                }
            }
        }
    }

    // ── Mesh lifecycle ────────────────────────────────────────

    fn on_node_initialized(
        &mut self,
        provisioned: bool,
        address: u16,
        iv_index: u32,
        node: &mut impl NodePorts,
    ) {
        info!("node initialized");

        if !self.session.server_initialized {
            match node.generic_server_init() {
                Ok(()) => self.session.server_initialized = true,
                Err(e) => warn!("generic server init failed: {e}"),
            }
        }
        if !self.session.models_registered {
            match node.register_handlers() {
                Ok(()) => self.session.models_registered = true,
                Err(e) => warn!("model handler registration failed: {e}"),
            }
        }

        self.load_persisted(node);
        self.show_authority(node);

        if provisioned {
            info!("node is provisioned, address 0x{address:04x}, iv index {iv_index}");
            self.session.provisioned_address = Some(address);
            self.bring_up(node);
            node.print(DisplayRow::Status, "Provisioned");
        } else {
            info!("node is unprovisioned, starting beaconing");
            node.print(DisplayRow::Status, "Un-provisioned");
            if let Err(e) = node.start_unprov_beaconing(self.config.beacon_bearers) {
                warn!("unprovisioned beaconing failed: {e}");
            }
        }
    }

    fn on_provisioning_started(&mut self, node: &mut impl NodePorts) {
        info!("provisioning started");
        node.print(DisplayRow::Status, "Provisioning");
        if let Err(e) = node.set_soft_timer(
            TimerId::ProvisioningBlink,
            self.config.provisioning_blink_ms,
            false,
        ) {
            warn!("provisioning blink timer failed: {e}");
        }
    }

    fn on_provisioned(&mut self, address: u16, node: &mut impl NodePorts) {
        info!("node provisioned, address 0x{address:04x}");
        self.session.provisioned_address = Some(address);
        if let Err(e) = node.set_soft_timer(TimerId::ProvisioningBlink, 0, false) {
            warn!("stopping provisioning blink failed: {e}");
        }
        self.clear_alert(node);
        self.bring_up(node);
        node.print(DisplayRow::Status, "Provisioned");
    }

    fn on_provisioning_failed(&mut self, result: u16, node: &mut impl NodePorts) {
        warn!("provisioning failed, code 0x{result:x}");
        node.print(DisplayRow::Status, "Provisioning failed");
        if let Err(e) =
            node.set_soft_timer(TimerId::Restart, self.config.restart_delay_ms, true)
        {
            warn!("restart timer failed: {e}");
        }
    }

    fn on_key_added(&mut self, kind: KeyKind, index: u16) {
        info!("got new {} key with index 0x{index:x}", kind.as_str());
    }

    fn on_model_event(&mut self, event: &ModelEvent, node: &mut impl NodePorts) {
        node.handle_model_event(event);
    }

    /// Shared by both provisioned paths.
    fn bring_up(&mut self, node: &mut impl NodePorts) {
        if let Err(e) = node.enable_button_interrupts() {
            warn!("button interrupt not armed: {e}");
        }
        if let Err(e) = node.friend_init() {
            warn!("friend init failed: {e}");
        }
        if let Err(e) = node.init_models() {
            warn!("model init failed: {e}");
        }
        self.session.init_done = true;
    }

    // ── Friend role ───────────────────────────────────────────

    fn on_friendship_established(&mut self, lpn_address: u16, node: &mut impl NodePorts) {
        self.session.friend_peers = self.session.friend_peers.saturating_add(1);
        info!(
            "friendship established with 0x{lpn_address:04x}, {} LPNs",
            self.session.friend_peers
        );
        self.show_friends(node);
        node.start_acquisition_timer(self.config.acquisition_period_ms);
        if let Err(e) = node.enable_motion_interrupt() {
            warn!("motion interrupt not armed: {e}");
        }
    }

    fn on_friendship_terminated(&mut self, reason: u16, node: &mut impl NodePorts) {
        self.session.friend_peers = self.session.friend_peers.saturating_sub(1);
        info!(
            "friendship terminated, reason 0x{reason:x}, {} LPNs",
            self.session.friend_peers
        );
        self.show_friends(node);
    }

    // ── Connections ───────────────────────────────────────────

    fn on_connection_opened(&mut self, connection: u8, node: &mut impl NodePorts) {
        let count = self.session.open_connection(connection);
        info!("connection {connection} opened ({count} active)");
        node.print(DisplayRow::Connection, "Connected");
    }

    fn on_connection_closed(&mut self, reason: u16, node: &mut impl NodePorts) {
        if self.session.dfu_pending {
            info!("rebooting into firmware update mode");
            node.system_reset(ResetMode::Dfu);
        }

        info!("connection closed, reason 0x{reason:x}");
        if self.session.close_connection() {
            node.print(DisplayRow::Connection, "");
        }
    }

    fn on_gatt_user_write(
        &mut self,
        connection: u8,
        characteristic: u16,
        node: &mut impl NodePorts,
    ) {
        if characteristic != OTA_CONTROL_CHARACTERISTIC {
            debug!("user write on 0x{characteristic:04x} ignored");
            return;
        }

        self.session.dfu_pending = true;
        if let Err(e) = node.send_user_write_response(connection, characteristic, ATT_SUCCESS) {
            warn!("OTA control write response failed: {e}");
        }
        if let Err(e) = node.close_connection(connection) {
            warn!("close connection {connection} failed: {e}");
        }
    }

    // ── Alerting ──────────────────────────────────────────────

    fn on_authority_changed(&mut self, present: bool, node: &mut impl NodePorts) {
        self.session.authorized_personnel = present;
        self.persist(PsKey::AuthorizedPersonnel, node);
        self.show_authority(node);
    }

    fn on_signal(&mut self, signal: Signal, node: &mut impl NodePorts) {
        match signal {
            Signal::ButtonRelease => self.on_button_release(node),
            Signal::Motion => self.on_motion(node),
            acquisition => self.on_acquisition_signal(acquisition, node),
        }
    }

    fn on_button_release(&mut self, node: &mut impl NodePorts) {
        self.clear_alert(node);

        // Live level, not the level at the edge: a fast release-then-press
        // between the interrupt and now still counts.
        if node.button_pressed(Button::Pb0) {
            node.print(DisplayRow::AlertCaretaker, "Alert Cleared");
            node.print(DisplayRow::AlertPatient, "Alert Cleared");
            let count = self.session.record_alert_cleared();
            self.persist(PsKey::AlertsCleared, node);
            info!("alert cleared ({count} total)");
        }
    }

    fn on_motion(&mut self, node: &mut impl NodePorts) {
        info!("motion detected");
        if self.session.authorized_personnel {
            self.clear_alert(node);
        } else {
            node.raise_alert();
            self.session.alert_active = true;
            node.print(DisplayRow::AlertCaretaker, "Unauthorized person");
        }
    }

    fn clear_alert(&mut self, node: &mut impl NodePorts) {
        node.clear_alert();
        self.session.alert_active = false;
    }

    // ── Acquisition ───────────────────────────────────────────

    fn on_acquisition_signal(&mut self, signal: Signal, node: &mut impl NodePorts) {
        if signal == Signal::ReadAck && self.fsm.current_state() == StateId::ReadIssued {
            let mut buf = [0u8; humidity::RESULT_LEN];
            match node.read_result(&mut buf) {
                Ok(n) if n == buf.len() => self.acq.rx = Some(buf),
                Ok(n) => warn!("short sensor read ({n} bytes)"),
                Err(e) => warn!("sensor read collect failed: {e}"),
            }
        }

        self.fsm.deliver(signal, &mut self.acq);
        self.apply_bus_request(node);

        if let Some(reading) = self.acq.take_fresh_reading() {
            self.publish(reading, node);
        }
        if signal == Signal::AcquisitionTick {
            if let Some(reading) = self.acq.reading {
                self.show_reading(reading, node);
            }
        }
    }

    fn apply_bus_request(&mut self, node: &mut impl NodePorts) {
        let Some(request) = self.acq.take_request() else {
            return;
        };
        let result = match request {
            BusRequest::Write { command } => node.start_write(command),
            BusRequest::Read { len } => node.start_read(len),
        };
        if let Err(e) = result {
            warn!("bus request {request:?} rejected: {e}");
            self.acq.faults = self.acq.faults.wrapping_add(1);
            self.fsm.force_transition(StateId::Idle, &mut self.acq);
        }
    }

    fn publish(&mut self, reading: Reading, node: &mut impl NodePorts) {
        info!("humidity {:.2}", reading.value());
        if self.session.observe_reading(reading) {
            info!("new high-water mark {:.2}", reading.value());
            self.persist(PsKey::MaxReading, node);
        }
    }

    // ── Persistence ───────────────────────────────────────────

    fn load_persisted(&mut self, node: &mut impl NodePorts) {
        for key in PsKey::ALL {
            let mut buf = [0u8; 4];
            match node.load(key, &mut buf[..key.size()]) {
                Ok(n) => {
                    if !self.session.apply(key, &buf[..n]) {
                        warn!("stored {key:?} has {n} bytes, keeping default");
                    }
                }
                Err(e) => warn!("load {key:?} failed: {e}, keeping default"),
            }
        }
        info!(
            "alerts cleared {}, max reading {:?}, authorised {}",
            self.session.alerts_cleared,
            self.session.max_reading.map(Reading::value),
            self.session.authorized_personnel
        );
    }

    fn persist(&self, key: PsKey, node: &mut impl NodePorts) {
        let mut buf = [0u8; 4];
        let n = self.session.encode(key, &mut buf);
        if let Err(e) = node.save(key, &buf[..n]) {
            warn!("save {key:?} failed: {e}");
        }
    }

    // ── Presentation ──────────────────────────────────────────

    fn show_authority(&self, node: &mut impl NodePorts) {
        let text = if self.session.authorized_personnel {
            "Authority Present"
        } else {
            "Authority Not Present"
        };
        node.print(DisplayRow::Authority, text);
    }

    fn show_friends(&self, node: &mut impl NodePorts) {
        let mut text = RowText::new();
        let _ = write!(text, "FRIEND -- {} LPNs", self.session.friend_peers);
        node.print(DisplayRow::Friend, &text);
    }

    fn show_reading(&self, reading: Reading, node: &mut impl NodePorts) {
        let mut text = RowText::new();
        let _ = write!(text, "{:.2}", reading.value());
        node.print(DisplayRow::Humidity, &text);
    }
}
