//! Acquisition pipeline: signals → FSM → bus requests → decode → session.

use meshnode::app::ports::DisplayRow;
use meshnode::app::service::Dispatcher;
use meshnode::config::NodeConfig;
use meshnode::error::BusError;
use meshnode::events::StackEvent;
use meshnode::fsm::StateId;
use meshnode::sensors::humidity::{self, Reading};
use meshnode::session::PsKey;
use meshnode::signals::{Signal, SignalSet};

use crate::mock_node::{Call, MockNode};

fn make() -> (Dispatcher, MockNode) {
    (Dispatcher::new(NodeConfig::default()), MockNode::new())
}

fn deliver(d: &mut Dispatcher, node: &mut MockNode, signals: &[Signal]) {
    for &s in signals {
        d.on_event(StackEvent::Signal(s), node);
    }
}

const CYCLE: [Signal; 4] = [
    Signal::AcquisitionTick,
    Signal::CommandAck,
    Signal::AcquisitionTick,
    Signal::ReadAck,
];

#[test]
fn full_cycle_decodes_once_and_rests_in_idle() {
    let (mut d, mut node) = make();
    assert_eq!(d.acquisition_state(), StateId::Idle);

    deliver(&mut d, &mut node, &CYCLE);

    assert_eq!(d.acquisition_state(), StateId::Idle);
    assert_eq!(d.decode_count(), 1);
    assert_eq!(d.last_reading(), Some(humidity::decode([0x80, 0x00])));
    assert_eq!(
        node.calls
            .iter()
            .filter(|c| matches!(c, Call::StartWrite(_) | Call::StartRead(_)))
            .cloned()
            .collect::<Vec<_>>(),
        vec![
            Call::StartWrite(humidity::CMD_MEASURE_RH_NO_HOLD),
            Call::StartRead(humidity::RESULT_LEN),
        ]
    );
}

#[test]
fn each_step_lands_in_expected_state() {
    let (mut d, mut node) = make();
    let expected = [
        StateId::CommandSent,
        StateId::CommandAcked,
        StateId::ReadIssued,
        StateId::Idle,
    ];
    for (s, want) in CYCLE.iter().zip(expected) {
        deliver(&mut d, &mut node, &[*s]);
        assert_eq!(d.acquisition_state(), want, "after {s:?}");
    }
}

#[test]
fn acks_in_idle_do_nothing() {
    let (mut d, mut node) = make();
    deliver(
        &mut d,
        &mut node,
        &[Signal::CommandAck, Signal::ReadAck, Signal::TransferFault],
    );
    assert_eq!(d.acquisition_state(), StateId::Idle);
    assert_eq!(d.decode_count(), 0);
    assert_eq!(d.acquisition_faults(), 0);
    assert!(node.calls.is_empty());
}

#[test]
fn transfer_fault_abandons_cycle() {
    let (mut d, mut node) = make();
    deliver(
        &mut d,
        &mut node,
        &[Signal::AcquisitionTick, Signal::TransferFault],
    );
    assert_eq!(d.acquisition_state(), StateId::Idle);
    assert_eq!(d.acquisition_faults(), 1);

    node.clear();
    deliver(&mut d, &mut node, &CYCLE);
    assert_eq!(d.decode_count(), 1, "next cycle runs normally");
}

#[test]
fn tick_coalesced_with_command_ack_issues_the_read() {
    let (mut d, mut node) = make();
    deliver(&mut d, &mut node, &[Signal::AcquisitionTick]);
    assert_eq!(d.acquisition_state(), StateId::CommandSent);

    let set = SignalSet::new();
    set.raise(Signal::AcquisitionTick);
    set.raise(Signal::CommandAck);
    d.drain_signals(&set, &mut node);

    assert_eq!(d.acquisition_state(), StateId::ReadIssued);
    assert!(node.has(&Call::StartRead(humidity::RESULT_LEN)));
    assert_eq!(d.acquisition_faults(), 0);
}

#[test]
fn fault_coalesced_with_tick_restarts_the_cycle() {
    let (mut d, mut node) = make();
    deliver(&mut d, &mut node, &[Signal::AcquisitionTick]);
    node.clear();

    let set = SignalSet::new();
    set.raise(Signal::AcquisitionTick);
    set.raise(Signal::TransferFault);
    d.drain_signals(&set, &mut node);

    assert_eq!(d.acquisition_faults(), 1);
    assert_eq!(d.acquisition_state(), StateId::CommandSent);
    assert_eq!(node.count(|c| matches!(c, Call::StartWrite(_))), 1);
}

#[test]
fn busy_bus_returns_machine_to_idle() {
    let (mut d, mut node) = make();
    node.bus_rejections.push_back(BusError::Busy);
    deliver(&mut d, &mut node, &[Signal::AcquisitionTick]);

    assert_eq!(d.acquisition_state(), StateId::Idle);
    assert_eq!(d.acquisition_faults(), 1);
    assert_eq!(node.count(|c| matches!(c, Call::StartWrite(_))), 1);
}

#[test]
fn rejected_read_returns_machine_to_idle() {
    let (mut d, mut node) = make();
    deliver(
        &mut d,
        &mut node,
        &[Signal::AcquisitionTick, Signal::CommandAck],
    );
    node.bus_rejections.push_back(BusError::StartFailed(-1));
    deliver(&mut d, &mut node, &[Signal::AcquisitionTick]);
    assert_eq!(d.acquisition_state(), StateId::Idle);
    assert_eq!(d.acquisition_faults(), 1);
}

#[test]
fn read_ack_without_data_counts_a_fault() {
    let (mut d, mut node) = make();
    node.sensor_bytes = None;
    deliver(&mut d, &mut node, &CYCLE);
    assert_eq!(d.acquisition_state(), StateId::Idle);
    assert_eq!(d.decode_count(), 0);
    assert_eq!(d.acquisition_faults(), 1);
}

#[test]
fn max_reading_persisted_only_when_exceeded() {
    let (mut d, mut node) = make();
    deliver(&mut d, &mut node, &CYCLE);
    let first = humidity::decode([0x80, 0x00]);
    assert_eq!(d.session().max_reading, Some(first));
    assert_eq!(
        node.stored(PsKey::MaxReading),
        Some(&first.0.to_le_bytes()[..])
    );

    node.clear();
    node.sensor_bytes = Some([0x40, 0x00]);
    deliver(&mut d, &mut node, &CYCLE);
    assert_eq!(node.count(|c| matches!(c, Call::Save { .. })), 0);
    assert_eq!(d.session().max_reading, Some(first));

    node.sensor_bytes = Some([0xC0, 0x00]);
    deliver(&mut d, &mut node, &CYCLE);
    assert_eq!(node.count(|c| matches!(c, Call::Save { .. })), 1);
    assert!(d.session().max_reading > Some(first));
}

#[test]
fn tick_shows_last_reading() {
    let (mut d, mut node) = make();
    deliver(&mut d, &mut node, &CYCLE);
    assert_eq!(node.prints_to(DisplayRow::Humidity), 0);

    deliver(&mut d, &mut node, &[Signal::AcquisitionTick]);
    assert_eq!(node.row(DisplayRow::Humidity), Some("56.50"));
}

#[test]
fn stored_max_reading_survives_reboot() {
    let (mut d, mut node) = make();
    node.store
        .insert(PsKey::MaxReading, Reading(70.0).0.to_le_bytes().to_vec());
    d.on_event(
        StackEvent::NodeInitialized {
            provisioned: false,
            address: 0,
            iv_index: 0,
        },
        &mut node,
    );
    assert_eq!(d.session().max_reading, Some(Reading(70.0)));

    deliver(&mut d, &mut node, &CYCLE);
    assert!(node.stored(PsKey::MaxReading).is_some());
    assert_eq!(d.session().max_reading, Some(Reading(70.0)));
}
