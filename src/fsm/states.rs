//! Concrete state handler functions and table builder.
//!
//! Each state is a row of plain `fn` pointers: no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!  IDLE ──[tick]──▶ COMMAND_SENT ──[cmd ack]──▶ COMMAND_ACKED
//!    ▲                   │                           │
//!    │                [fault]                     [tick]
//!    │◀──────────────────┘                           ▼
//!    │◀──────────[fault / no data]────────────── READ_ISSUED
//!    │                                               │
//!    │                                          [read ack]
//!    │                                               ▼
//!    └──────────────[immediate]──────────────── READ_COMPLETE
//! ```
//!
//! Any signal not drawn above is discarded in that state.

use super::context::{AcqContext, BusRequest};
use super::{StateDescriptor, StateId};
use crate::sensors::humidity;
use crate::signals::Signal;
use log::{debug, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: None,
            on_exit: None,
            on_signal: idle_signal,
            then: None,
        },
        // Index 1: CommandSent
        StateDescriptor {
            id: StateId::CommandSent,
            name: "CommandSent",
            on_enter: Some(command_sent_enter),
            on_exit: None,
            on_signal: command_sent_signal,
            then: None,
        },
        // Index 2: CommandAcked
        StateDescriptor {
            id: StateId::CommandAcked,
            name: "CommandAcked",
            on_enter: None,
            on_exit: None,
            on_signal: command_acked_signal,
            then: None,
        },
        // Index 3: ReadIssued
        StateDescriptor {
            id: StateId::ReadIssued,
            name: "ReadIssued",
            on_enter: Some(read_issued_enter),
            on_exit: Some(read_issued_exit),
            on_signal: read_issued_signal,
            then: None,
        },
        // Index 4: ReadComplete
        StateDescriptor {
            id: StateId::ReadComplete,
            name: "ReadComplete",
            on_enter: Some(read_complete_enter),
            on_exit: None,
            on_signal: ignore,
            then: Some(StateId::Idle),
        },
    ]
}

fn ignore(_ctx: &mut AcqContext) -> Option<StateId> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_signal(ctx: &mut AcqContext) -> Option<StateId> {
    ctx.is(Signal::AcquisitionTick).then_some(StateId::CommandSent)
}

// ═══════════════════════════════════════════════════════════════════════════
//  COMMAND_SENT: measurement command in flight
// ═══════════════════════════════════════════════════════════════════════════

fn command_sent_enter(ctx: &mut AcqContext) {
    ctx.request = Some(BusRequest::Write {
        command: ctx.command,
    });
}

fn command_sent_signal(ctx: &mut AcqContext) -> Option<StateId> {
    match ctx.signal {
        Some(Signal::CommandAck) => Some(StateId::CommandAcked),
        Some(Signal::TransferFault) => {
            ctx.faults = ctx.faults.wrapping_add(1);
            warn!("acquisition: command write failed, abandoning cycle");
            Some(StateId::Idle)
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  COMMAND_ACKED: sensor converting; wait one tick before reading
// ═══════════════════════════════════════════════════════════════════════════

fn command_acked_signal(ctx: &mut AcqContext) -> Option<StateId> {
    ctx.is(Signal::AcquisitionTick).then_some(StateId::ReadIssued)
}

// ═══════════════════════════════════════════════════════════════════════════
//  READ_ISSUED: result read in flight
// ═══════════════════════════════════════════════════════════════════════════

fn read_issued_enter(ctx: &mut AcqContext) {
    ctx.rx = None;
    ctx.request = Some(BusRequest::Read {
        len: humidity::RESULT_LEN,
    });
}

fn read_issued_exit(ctx: &mut AcqContext) {
    ctx.rx = None;
}

fn read_issued_signal(ctx: &mut AcqContext) -> Option<StateId> {
    match ctx.signal {
        Some(Signal::ReadAck) => {
            let Some(raw) = ctx.rx else {
                ctx.faults = ctx.faults.wrapping_add(1);
                warn!("acquisition: read acknowledged without data");
                return Some(StateId::Idle);
            };
            ctx.reading = Some(humidity::decode(raw));
            ctx.decode_count = ctx.decode_count.wrapping_add(1);
            ctx.fresh = true;
            Some(StateId::ReadComplete)
        }
        Some(Signal::TransferFault) => {
            ctx.faults = ctx.faults.wrapping_add(1);
            warn!("acquisition: result read failed, abandoning cycle");
            Some(StateId::Idle)
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  READ_COMPLETE: transient; the engine moves straight on to Idle
// ═══════════════════════════════════════════════════════════════════════════

fn read_complete_enter(ctx: &mut AcqContext) {
    if let Some(r) = ctx.reading {
        debug!("acquisition: reading {:.2} (cycle {})", r.0, ctx.decode_count);
    }
}
