//! Shared mutable context threaded through every acquisition handler.
//!
//! `AcqContext` is the blackboard the state handlers read from and write to:
//! the signal being delivered, the bus request a handler wants issued, the
//! raw bytes of the last completed read, and the decoded result.

use crate::sensors::humidity::{self, Reading};
use crate::signals::Signal;

// ---------------------------------------------------------------------------
// Bus requests (written by state handlers; applied by the dispatcher)
// ---------------------------------------------------------------------------

/// A non-blocking bus half-transaction a handler wants started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusRequest {
    /// Write one command byte to the sensor.
    Write { command: u8 },
    /// Read `len` result bytes from the sensor.
    Read { len: usize },
}

// ---------------------------------------------------------------------------
// AcqContext
// ---------------------------------------------------------------------------

pub struct AcqContext {
    // -- Input --
    /// Signal currently being delivered.  Set by the engine around
    /// `on_signal`; `None` outside a delivery.
    pub signal: Option<Signal>,
    /// Bytes of the last completed read, loaded by the dispatcher before a
    /// `ReadAck` is delivered.
    pub rx: Option<[u8; humidity::RESULT_LEN]>,

    // -- Output --
    /// Bus request left by the last transition, if any.
    pub request: Option<BusRequest>,
    /// Latest decoded reading.  Overwritten each cycle.
    pub reading: Option<Reading>,
    /// Set when a decode completes; cleared by [`take_fresh_reading`](Self::take_fresh_reading).
    pub fresh: bool,

    // -- Counters --
    /// Completed decodes since boot.
    pub decode_count: u32,
    /// Cycles aborted by a transfer fault or a missing read.
    pub faults: u32,

    // -- Configuration --
    pub command: u8,
}

impl AcqContext {
    pub fn new(command: u8) -> Self {
        Self {
            signal: None,
            rx: None,
            request: None,
            reading: None,
            fresh: false,
            decode_count: 0,
            faults: 0,
            command,
        }
    }

    /// Is the signal being delivered `s`?
    pub fn is(&self, s: Signal) -> bool {
        self.signal == Some(s)
    }

    pub fn take_request(&mut self) -> Option<BusRequest> {
        self.request.take()
    }

    /// The reading produced by the most recent decode, once.
    pub fn take_fresh_reading(&mut self) -> Option<Reading> {
        if core::mem::take(&mut self.fresh) {
            self.reading
        } else {
            None
        }
    }
}
