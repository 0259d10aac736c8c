//! Interrupt-to-main signal bridge.
//!
//! Hardware ISRs (buttons, PIR, I²C completion) and the acquisition timer
//! never call into application logic.  They set one bit in a shared
//! [`SignalSet`]; the main loop takes the whole set and turns each pending
//! bit into a [`StackEvent::Signal`](crate::events::StackEvent::Signal).
//!
//! ```text
//! ┌─────────────┐
//! │ Button ISR  │──┐
//! │ PIR ISR     │──┤    ┌────────────────┐     ┌──────────────┐
//! │ I²C ISR     │──┼───▶│ SignalSet      │────▶│  Main Loop   │
//! │ Acq. timer  │──┘    │ (AtomicU32)    │     │  Dispatcher  │
//! └─────────────┘       └────────────────┘     └──────────────┘
//! ```
//!
//! Signals coalesce: raising a bit that is already pending is a no-op, so
//! a burst of edges never builds a backlog.  Each bit is observed by the
//! consumer exactly once per take.

use core::sync::atomic::{AtomicU32, Ordering};

/// Software signal causes.  One bit each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Signal {
    // ── Acquisition family ────────────────────────────────
    /// Periodic acquisition timer fired.
    AcquisitionTick = 0x01,
    /// A bus half-transaction finished with an error.
    TransferFault = 0x02,
    /// The command write finished.
    CommandAck = 0x04,
    /// The result read finished.
    ReadAck = 0x08,

    // ── User / environment ────────────────────────────────
    /// PB0 edge.
    ButtonRelease = 0x40,
    /// PIR rising edge.
    Motion = 0x80,
}

impl Signal {
    /// Every signal, in delivery order.  Bus completions precede the tick so
    /// a tick drained alongside an ack lands in the state the ack produced.
    pub const ALL: [Signal; 6] = [
        Signal::TransferFault,
        Signal::CommandAck,
        Signal::ReadAck,
        Signal::AcquisitionTick,
        Signal::ButtonRelease,
        Signal::Motion,
    ];

    pub const fn bit(self) -> u32 {
        self as u32
    }

    /// True for the tick and the three bus acknowledgements.
    pub const fn is_acquisition(self) -> bool {
        self.bit() & ACQUISITION_MASK != 0
    }

    pub fn from_bit(bit: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.bit() == bit)
    }
}

/// Bits owned by the acquisition cycle.
pub const ACQUISITION_MASK: u32 = 0x0F;

/// A snapshot of pending signal bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalMask(u32);

impl SignalMask {
    pub const EMPTY: Self = Self(0);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, signal: Signal) -> bool {
        self.0 & signal.bit() != 0
    }

    /// Iterate the known signals present in the mask, in delivery order.
    /// Unknown bits are skipped.
    pub fn iter(self) -> impl Iterator<Item = Signal> {
        Signal::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl From<u32> for SignalMask {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

/// Lock-free, coalescing set of pending signals.
///
/// `raise` is callable from interrupt context: a single `fetch_or`, no
/// allocation, no blocking.
pub struct SignalSet {
    pending: AtomicU32,
}

impl SignalSet {
    pub const fn new() -> Self {
        Self {
            pending: AtomicU32::new(0),
        }
    }

    /// Mark `signal` pending.  Returns `true` if it was not already pending.
    pub fn raise(&self, signal: Signal) -> bool {
        self.pending.fetch_or(signal.bit(), Ordering::AcqRel) & signal.bit() == 0
    }

    /// Raise with interrupts masked, for callbacks that can be re-entered
    /// by a higher-priority source sharing the same line.
    pub fn raise_in_critical_section(&self, signal: Signal) -> bool {
        critical_section::with(|_| self.raise(signal))
    }

    /// Test-and-clear a single cause.
    pub fn take(&self, signal: Signal) -> bool {
        self.pending.fetch_and(!signal.bit(), Ordering::AcqRel) & signal.bit() != 0
    }

    /// Take every pending cause at once, leaving the set empty.
    pub fn take_all(&self) -> SignalMask {
        SignalMask(self.pending.swap(0, Ordering::AcqRel))
    }

    pub fn is_pending(&self, signal: Signal) -> bool {
        self.pending.load(Ordering::Acquire) & signal.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }
}

impl Default for SignalSet {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide signal set written by the ISR callbacks in
/// [`drivers`](crate::drivers) and drained by the main loop.
pub static SIGNALS: SignalSet = SignalSet::new();
