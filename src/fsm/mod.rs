//! Function-pointer finite state machine engine for sensor acquisition.
//!
//! Classic embedded FSM pattern, driven by delivered signals rather than a
//! free-running tick:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                        │
//! │  ┌──────────────┬──────────┬──────────────────────┬──────────────┐ │
//! │  │ StateId      │ on_enter │ on_signal            │ then         │ │
//! │  ├──────────────┼──────────┼──────────────────────┼──────────────┤ │
//! │  │ Idle         │ fn(ctx)  │ fn(ctx)->Option<>    │ -            │ │
//! │  │ CommandSent  │ fn(ctx)  │ fn(ctx)->Option<>    │ -            │ │
//! │  │ CommandAcked │ -        │ fn(ctx)->Option<>    │ -            │ │
//! │  │ ReadIssued   │ fn(ctx)  │ fn(ctx)->Option<>    │ -            │ │
//! │  │ ReadComplete │ fn(ctx)  │ fn(ctx)->Option<>    │ Idle         │ │
//! │  └──────────────┴──────────┴──────────────────────┴──────────────┘ │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! For every delivered signal the engine stores it in the context and calls
//! `on_signal` for the **current** state.  If it returns `Some(next_id)`,
//! the engine runs `on_exit` for the current state, then `on_enter` for the
//! next.  A state with a `then` successor is left again immediately, so it
//! is never observed as the resting state between two signals.
//!
//! Handlers never touch the bus.  They leave a
//! [`BusRequest`](context::BusRequest) in the context for the
//! [`Dispatcher`](crate::app::service::Dispatcher) to apply.

pub mod context;
pub mod states;

use context::AcqContext;
use log::debug;

use crate::signals::Signal;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// The five phases of one acquisition cycle.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    CommandSent = 1,
    CommandAcked = 2,
    ReadIssued = 3,
    ReadComplete = 4,
}

impl StateId {
    /// Total number of states: used to size the table array.
    pub const COUNT: usize = 5;

    pub const ALL: [StateId; Self::COUNT] = [
        Self::Idle,
        Self::CommandSent,
        Self::CommandAcked,
        Self::ReadIssued,
        Self::ReadComplete,
    ];

    /// Convert an index back to `StateId`.  Out-of-range falls back to
    /// `Idle`, the only state from which a fresh cycle can start.
    pub fn from_index(idx: usize) -> Self {
        Self::ALL.get(idx).copied().unwrap_or_else(|| {
            debug_assert!(false, "invalid state index: {idx}");
            Self::Idle
        })
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut AcqContext);

/// Signature for the per-signal handler.  The delivered signal is in
/// [`AcqContext::signal`].  Returns `Some(next)` to transition.
pub type StateSignalFn = fn(&mut AcqContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array: no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_signal: StateSignalFn,
    /// Immediate successor, taken right after `on_enter`.
    pub then: Option<StateId>,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The acquisition state machine engine.
///
/// Owns the state table and the index of the current state.  The mutable
/// [`AcqContext`] is owned by the caller and threaded through every call.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Signals delivered since construction.
    delivered: u64,
    /// Value of `delivered` when the current state was entered.
    state_entry: u64,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            delivered: 0,
            state_entry: 0,
        }
    }

    /// Build the acquisition machine resting in `Idle`.
    pub fn acquisition() -> Self {
        Self::new(states::build_state_table(), StateId::Idle)
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `deliver()`.
    pub fn start(&mut self, ctx: &mut AcqContext) {
        debug!("acquisition FSM starting in {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
        self.follow_successors(ctx);
    }

    /// Deliver one signal.
    ///
    /// 1. Store `signal` in the context and call `on_signal` for the
    ///    current state.
    /// 2. If it returns `Some(next)`, run the transition and any immediate
    ///    successors.
    ///
    /// Returns `true` if the state changed.  A signal the current state does
    /// not expect is discarded without side effects.
    pub fn deliver(&mut self, signal: Signal, ctx: &mut AcqContext) -> bool {
        self.delivered += 1;
        ctx.signal = Some(signal);

        let next = (self.table[self.current].on_signal)(ctx);
        ctx.signal = None;

        match next {
            Some(next_id) => {
                self.transition(next_id, ctx);
                self.follow_successors(ctx);
                true
            }
            None => false,
        }
    }

    /// Force an immediate transition, bypassing the signal handler.  Used
    /// by the dispatcher when a bus request is rejected.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut AcqContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
            self.follow_successors(ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    pub fn state_name(&self) -> &'static str {
        self.table[self.current].name
    }

    /// How many signals have been delivered while in the current state.
    pub fn signals_in_current_state(&self) -> u64 {
        self.delivered - self.state_entry
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut AcqContext) {
        let next_idx = next_id as usize;

        debug!(
            "acquisition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry = self.delivered;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    fn follow_successors(&mut self, ctx: &mut AcqContext) {
        // Bounded by the table size so a misbuilt table cannot spin forever.
        for _ in 0..StateId::COUNT {
            match self.table[self.current].then {
                Some(next) if next as usize != self.current => self.transition(next, ctx),
                _ => return,
            }
        }
    }
}
