//! Provisioning flow: unprovisioned beaconing, provisioning, bring-up and
//! failure recovery.

use meshnode::app::ports::DisplayRow;
use meshnode::app::service::Dispatcher;
use meshnode::config::NodeConfig;
use meshnode::events::{StackEvent, TimerId};
use meshnode::session::PsKey;

use crate::mock_node::{Call, MockNode};

fn make() -> (Dispatcher, MockNode) {
    (Dispatcher::new(NodeConfig::default()), MockNode::new())
}

fn initialized(provisioned: bool) -> StackEvent {
    StackEvent::NodeInitialized {
        provisioned,
        address: 0x0042,
        iv_index: 7,
    }
}

#[test]
fn unprovisioned_node_beacons() {
    let (mut d, mut node) = make();
    d.on_event(initialized(false), &mut node);

    assert!(node.has(&Call::GenericServerInit));
    assert!(node.has(&Call::RegisterHandlers));
    assert!(node.has(&Call::StartBeaconing {
        bearers: NodeConfig::default().beacon_bearers
    }));
    assert_eq!(node.row(DisplayRow::Status), Some("Un-provisioned"));
    assert_eq!(node.row(DisplayRow::Authority), Some("Authority Not Present"));
    assert!(!node.has(&Call::FriendInit));
    assert!(!d.session().init_done);
}

#[test]
fn button_interrupt_failure_does_not_stop_bring_up() {
    let (mut d, mut node) = make();
    node.interrupt_failure = Some(-1);
    d.on_event(initialized(true), &mut node);

    assert!(node.has(&Call::EnableButtonInterrupts));
    assert!(node.has(&Call::FriendInit));
    assert!(node.has(&Call::InitModels));
    assert!(d.session().init_done);
}

#[test]
fn provisioned_node_brings_up_friend_and_models() {
    let (mut d, mut node) = make();
    node.store.insert(PsKey::AuthorizedPersonnel, vec![1]);
    node.store.insert(PsKey::AlertsCleared, vec![9]);
    d.on_event(initialized(true), &mut node);

    assert!(node.has(&Call::EnableButtonInterrupts));
    assert!(node.has(&Call::FriendInit));
    assert!(node.has(&Call::InitModels));
    assert!(!node.calls.iter().any(|c| matches!(c, Call::StartBeaconing { .. })));
    assert_eq!(node.row(DisplayRow::Status), Some("Provisioned"));
    assert_eq!(node.row(DisplayRow::Authority), Some("Authority Present"));

    let s = d.session();
    assert!(s.init_done);
    assert!(s.authorized_personnel);
    assert_eq!(s.alerts_cleared, 9);
    assert_eq!(s.provisioned_address, Some(0x0042));
}

#[test]
fn server_init_happens_once() {
    let (mut d, mut node) = make();
    d.on_event(initialized(false), &mut node);
    d.on_event(initialized(false), &mut node);
    assert_eq!(node.count(|c| *c == Call::GenericServerInit), 1);
    assert_eq!(node.count(|c| *c == Call::RegisterHandlers), 1);
}

#[test]
fn provisioning_blinks_until_provisioned() {
    let (mut d, mut node) = make();
    d.on_event(initialized(false), &mut node);
    d.on_event(StackEvent::ProvisioningStarted, &mut node);
    assert_eq!(node.row(DisplayRow::Status), Some("Provisioning"));
    assert_eq!(
        node.timer(TimerId::ProvisioningBlink),
        Some((NodeConfig::default().provisioning_blink_ms, false))
    );

    d.on_event(StackEvent::SoftTimer(TimerId::ProvisioningBlink), &mut node);
    assert!(node.has(&Call::ToggleLed));

    d.on_event(StackEvent::Provisioned { address: 0x0042 }, &mut node);
    assert_eq!(node.timer(TimerId::ProvisioningBlink), Some((0, false)));
    assert!(node.has(&Call::ClearAlert));
    assert!(node.has(&Call::FriendInit));
    assert_eq!(node.row(DisplayRow::Status), Some("Provisioned"));

    node.clear();
    d.on_event(StackEvent::SoftTimer(TimerId::ProvisioningBlink), &mut node);
    assert!(!node.has(&Call::ToggleLed), "late expiry must not blink");
}

#[test]
fn provisioning_failure_arms_restart() {
    let (mut d, mut node) = make();
    d.on_event(StackEvent::ProvisioningFailed { result: 0x02 }, &mut node);
    assert_eq!(node.row(DisplayRow::Status), Some("Provisioning failed"));
    assert_eq!(
        node.timer(TimerId::Restart),
        Some((NodeConfig::default().restart_delay_ms, true))
    );
    assert!(node.resets().is_empty());

    d.on_event(StackEvent::SoftTimer(TimerId::Restart), &mut node);
    assert_eq!(node.resets().len(), 1);
}

#[test]
fn collaborator_failures_do_not_stop_bring_up() {
    let (mut d, mut node) = make();
    node.stack_failure = Some(0x0105);
    d.on_event(initialized(true), &mut node);

    assert!(node.has(&Call::FriendInit));
    assert!(node.has(&Call::InitModels));
    assert!(d.session().init_done);
    assert!(!d.session().server_initialized);
}
