//! Dispatcher integration tests: boot, connections, firmware-update hand-off,
//! alerting and timers, driven against the recording mock node.

use meshnode::app::ports::{DisplayRow, ResetMode};
use meshnode::app::service::Dispatcher;
use meshnode::config::NodeConfig;
use meshnode::events::{
    ModelEvent, ModelMessage, StackEvent, TimerId, MODEL_GENERIC_ON_OFF_SERVER,
    OTA_CONTROL_CHARACTERISTIC,
};
use meshnode::session::PsKey;
use meshnode::signals::{Signal, SignalSet};

use crate::mock_node::{Call, MockNode};

fn make() -> (Dispatcher, MockNode) {
    (Dispatcher::new(NodeConfig::default()), MockNode::new())
}

fn signal(d: &mut Dispatcher, node: &mut MockNode, s: Signal) {
    d.on_event(StackEvent::Signal(s), node);
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_names_device_and_starts_node() {
    let (mut d, mut node) = make();
    d.on_event(StackEvent::Boot, &mut node);

    assert_eq!(
        node.timer(TimerId::DisplayRefresh),
        Some((NodeConfig::default().display_refresh_ms, false))
    );
    assert!(node.has(&Call::WriteDeviceName("5823Sub 22:11".into())));
    assert_eq!(node.row(DisplayRow::Name), Some("5823Sub 22:11"));
    assert_eq!(node.row(DisplayRow::Address), Some("66:55:44:33:22:11"));
    assert!(node.has(&Call::NodeInit));
    assert!(!node.has(&Call::EraseAll));
}

#[test]
fn boot_with_button_held_factory_resets_instead() {
    for (pb0, pb1) in [(true, false), (false, true), (true, true)] {
        let (mut d, mut node) = make();
        node.pb0_pressed = pb0;
        node.pb1_pressed = pb1;
        d.on_event(StackEvent::Boot, &mut node);

        assert!(node.has(&Call::EraseAll));
        assert_eq!(node.row(DisplayRow::Status), Some("***FACTORY RESET***"));
        assert_eq!(
            node.timer(TimerId::FactoryReset),
            Some((NodeConfig::default().factory_reset_delay_ms, true))
        );
        assert!(!node.has(&Call::NodeInit), "no mesh start after reset request");
        assert!(node.resets().is_empty(), "reboot waits for the timer");
    }
}

#[test]
fn node_init_failure_is_shown_not_escalated() {
    let (mut d, mut node) = make();
    node.stack_failure = Some(0x0181);
    d.on_event(StackEvent::Boot, &mut node);
    assert_eq!(node.row(DisplayRow::Status), Some("init failed (0x181)"));
}

// ── Factory reset ─────────────────────────────────────────────

#[test]
fn node_reset_closes_open_connection_and_erases() {
    let (mut d, mut node) = make();
    d.on_event(StackEvent::ConnectionOpened { connection: 4 }, &mut node);
    d.on_event(StackEvent::NodeReset, &mut node);

    let close = node.position(&Call::CloseConnection(4)).expect("close");
    let erase = node.position(&Call::EraseAll).expect("erase");
    assert!(close < erase);
    assert!(node.timer(TimerId::FactoryReset).is_some());
}

#[test]
fn factory_reset_drops_network_state_before_arming_reboot() {
    let (mut d, mut node) = make();
    d.on_event(StackEvent::NodeReset, &mut node);

    let erase = node.position(&Call::EraseAll).expect("erase");
    let network = node.position(&Call::ResetNetworkState).expect("network reset");
    let timer = node
        .calls
        .iter()
        .position(|c| matches!(c, Call::SetSoftTimer { timer: TimerId::FactoryReset, .. }))
        .expect("reboot timer");
    assert!(erase < network);
    assert!(network < timer);
}

#[test]
fn failed_network_reset_still_schedules_reboot() {
    let (mut d, mut node) = make();
    node.stack_failure = Some(0x0103);
    d.on_event(StackEvent::NodeReset, &mut node);
    assert!(node.has(&Call::ResetNetworkState));
    assert_eq!(
        node.timer(TimerId::FactoryReset),
        Some((NodeConfig::default().factory_reset_delay_ms, true))
    );
}

#[test]
fn repeated_factory_reset_issues_same_sequence() {
    let (mut d, mut node) = make();
    d.on_event(StackEvent::NodeReset, &mut node);
    let first = node.calls.clone();
    node.clear();
    d.on_event(StackEvent::NodeReset, &mut node);
    assert_eq!(node.calls, first);
}

#[test]
fn reset_timers_reboot_normally() {
    let (mut d, mut node) = make();
    d.on_event(StackEvent::SoftTimer(TimerId::FactoryReset), &mut node);
    d.on_event(StackEvent::SoftTimer(TimerId::Restart), &mut node);
    assert_eq!(node.resets(), vec![ResetMode::Normal, ResetMode::Normal]);
}

// ── Connections ───────────────────────────────────────────────

#[test]
fn connection_row_cleared_once_on_last_close() {
    let (mut d, mut node) = make();
    d.on_event(StackEvent::ConnectionOpened { connection: 1 }, &mut node);
    assert_eq!(node.row(DisplayRow::Connection), Some("Connected"));
    assert_eq!(d.session().active_connections, 1);

    d.on_event(StackEvent::ConnectionClosed { reason: 0x13 }, &mut node);
    assert_eq!(node.row(DisplayRow::Connection), Some(""));
    assert_eq!(d.session().active_connections, 0);

    node.clear();
    d.on_event(StackEvent::ConnectionClosed { reason: 0x13 }, &mut node);
    assert_eq!(node.prints_to(DisplayRow::Connection), 0);
    assert_eq!(d.session().active_connections, 0);
}

#[test]
fn close_without_dfu_never_resets() {
    let (mut d, mut node) = make();
    d.on_event(StackEvent::ConnectionOpened { connection: 1 }, &mut node);
    d.on_event(StackEvent::ConnectionClosed { reason: 0x13 }, &mut node);
    assert!(node.resets().is_empty());
}

// ── Firmware update hand-off ──────────────────────────────────

#[test]
fn ota_control_write_acks_closes_then_reboots_into_dfu() {
    let (mut d, mut node) = make();
    d.on_event(StackEvent::ConnectionOpened { connection: 2 }, &mut node);
    d.on_event(
        StackEvent::GattUserWrite {
            connection: 2,
            characteristic: OTA_CONTROL_CHARACTERISTIC,
        },
        &mut node,
    );

    assert!(node.has(&Call::UserWriteResponse {
        connection: 2,
        characteristic: OTA_CONTROL_CHARACTERISTIC,
        att_result: 0,
    }));
    assert!(node.has(&Call::CloseConnection(2)));
    assert!(node.resets().is_empty(), "reset waits for the close event");

    d.on_event(StackEvent::ConnectionClosed { reason: 0x16 }, &mut node);
    assert_eq!(node.resets(), vec![ResetMode::Dfu]);
}

#[test]
fn writes_to_other_characteristics_are_ignored() {
    let (mut d, mut node) = make();
    d.on_event(
        StackEvent::GattUserWrite {
            connection: 2,
            characteristic: 0x0021,
        },
        &mut node,
    );
    assert!(node.calls.is_empty());
    d.on_event(StackEvent::ConnectionClosed { reason: 0 }, &mut node);
    assert!(node.resets().is_empty());
}

// ── Alerting ──────────────────────────────────────────────────

#[test]
fn motion_without_authority_raises_alert() {
    let (mut d, mut node) = make();
    signal(&mut d, &mut node, Signal::Motion);
    assert!(node.has(&Call::RaiseAlert));
    assert!(d.session().alert_active);
    assert_eq!(node.row(DisplayRow::AlertCaretaker), Some("Unauthorized person"));
}

#[test]
fn motion_with_authority_clears_alert() {
    let (mut d, mut node) = make();
    d.on_event(StackEvent::AuthorityChanged { present: true }, &mut node);
    assert_eq!(node.stored(PsKey::AuthorizedPersonnel), Some(&[1u8][..]));
    assert_eq!(node.row(DisplayRow::Authority), Some("Authority Present"));

    node.clear();
    signal(&mut d, &mut node, Signal::Motion);
    assert!(node.has(&Call::ClearAlert));
    assert!(!node.has(&Call::RaiseAlert));
    assert!(!d.session().alert_active);
}

#[test]
fn button_release_while_pb0_held_counts_a_clear() {
    let (mut d, mut node) = make();
    signal(&mut d, &mut node, Signal::Motion);
    node.pb0_pressed = true;
    signal(&mut d, &mut node, Signal::ButtonRelease);

    assert!(!d.session().alert_active);
    assert_eq!(d.session().alerts_cleared, 1);
    assert_eq!(node.stored(PsKey::AlertsCleared), Some(&[1u8][..]));
    assert_eq!(node.row(DisplayRow::AlertCaretaker), Some("Alert Cleared"));
    assert_eq!(node.row(DisplayRow::AlertPatient), Some("Alert Cleared"));
}

#[test]
fn button_release_with_pb0_up_only_clears_leds() {
    let (mut d, mut node) = make();
    signal(&mut d, &mut node, Signal::ButtonRelease);
    assert!(node.has(&Call::ClearAlert));
    assert_eq!(d.session().alerts_cleared, 0);
    assert!(node.stored(PsKey::AlertsCleared).is_none());
}

#[test]
fn drained_signals_route_button_before_motion() {
    let (mut d, mut node) = make();
    let set = SignalSet::new();
    set.raise(Signal::Motion);
    set.raise(Signal::ButtonRelease);
    d.drain_signals(&set, &mut node);

    let clear = node.position(&Call::ClearAlert).expect("button handled");
    let raise = node.position(&Call::RaiseAlert).expect("motion handled");
    assert!(clear < raise);
    assert!(set.is_empty());
}

#[test]
fn model_events_are_forwarded_uninterpreted() {
    let (mut d, mut node) = make();
    let event = ModelEvent::ClientRequest(ModelMessage {
        model_id: MODEL_GENERIC_ON_OFF_SERVER,
        elem_index: 0,
        client_address: 0x0005,
        appkey_index: 0,
        payload: heapless::Vec::from_slice(&[1]).unwrap(),
    });
    d.on_event(StackEvent::ModelServer(event.clone()), &mut node);
    assert_eq!(node.calls, vec![Call::ModelEvent(event)]);
    assert!(!d.session().authorized_personnel);
}

// ── Timers and friend role ────────────────────────────────────

#[test]
fn motion_interrupt_failure_keeps_acquisition_running() {
    let (mut d, mut node) = make();
    node.interrupt_failure = Some(0x103);
    d.on_event(StackEvent::FriendshipEstablished { lpn_address: 0x0100 }, &mut node);
    assert!(node.has(&Call::EnableMotionInterrupt));
    assert!(node.has(&Call::StartAcquisitionTimer(
        NodeConfig::default().acquisition_period_ms
    )));
    assert_eq!(d.session().friend_peers, 1);
}

#[test]
fn display_timer_refreshes() {
    let (mut d, mut node) = make();
    d.on_event(StackEvent::SoftTimer(TimerId::DisplayRefresh), &mut node);
    assert_eq!(node.calls, vec![Call::Update]);
}

#[test]
fn friendship_starts_acquisition_and_motion() {
    let (mut d, mut node) = make();
    d.on_event(StackEvent::FriendshipEstablished { lpn_address: 0x0100 }, &mut node);
    assert_eq!(node.row(DisplayRow::Friend), Some("FRIEND -- 1 LPNs"));
    assert!(node.has(&Call::StartAcquisitionTimer(
        NodeConfig::default().acquisition_period_ms
    )));
    assert!(node.has(&Call::EnableMotionInterrupt));

    d.on_event(StackEvent::FriendshipTerminated { reason: 1 }, &mut node);
    d.on_event(StackEvent::FriendshipTerminated { reason: 1 }, &mut node);
    assert_eq!(d.session().friend_peers, 0);
    assert_eq!(node.row(DisplayRow::Friend), Some("FRIEND -- 0 LPNs"));
}

#[test]
fn quiet_events_touch_nothing() {
    let (mut d, mut node) = make();
    for event in [
        StackEvent::AdvertisingTimeout,
        StackEvent::ConnectionParameters,
        StackEvent::ModelConfigChanged,
        StackEvent::Unknown(0xDEAD_BEEF),
    ] {
        d.on_event(event, &mut node);
    }
    assert!(node.calls.is_empty());
}
