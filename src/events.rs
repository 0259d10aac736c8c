//! Stack event model and the main-loop event queue.
//!
//! Events are produced by:
//! - the mesh/BLE stack task (lifecycle, connections, GATT writes)
//! - software timer callbacks (display refresh, blink, delayed reboots)
//! - the [`SignalSet`](crate::signals::SignalSet) drained by the main loop
//!
//! and consumed one at a time, in arrival order, by the
//! [`Dispatcher`](crate::app::service::Dispatcher).
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Stack task  │────▶│              │     │              │
//! │ Soft timers │────▶│  EventQueue  │────▶│  Main Loop   │
//! │             │     │  (bounded)   │     │  Dispatcher  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//!                                                 ▲
//!                        SignalSet ── take_all ───┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use crate::signals::{Signal, SignalMask};

/// Maximum number of queued stack events.
pub const EVENT_QUEUE_CAP: usize = 16;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Software timer identities.  Each maps 1:1 to a dispatcher branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TimerId {
    /// Periodic display refresh.
    DisplayRefresh = 65,
    /// Provisioning LED blink (periodic while provisioning).
    ProvisioningBlink = 66,
    /// One-shot reboot after a factory reset.
    FactoryReset = 77,
    /// One-shot reboot after a provisioning failure.
    Restart = 78,
}

impl TimerId {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            65 => Some(Self::DisplayRefresh),
            66 => Some(Self::ProvisioningBlink),
            77 => Some(Self::FactoryReset),
            78 => Some(Self::Restart),
            _ => None,
        }
    }
}

/// GATT handle of the OTA control characteristic.  A user write here
/// requests a reboot into the firmware-update loader.
pub const OTA_CONTROL_CHARACTERISTIC: u16 = 0x0017;

/// Generic OnOff server model.
pub const MODEL_GENERIC_ON_OFF_SERVER: u16 = 0x1000;
/// Generic Level server model.
pub const MODEL_GENERIC_LEVEL_SERVER: u16 = 0x1002;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Network,
    Application,
}

impl KeyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Application => "application",
        }
    }
}

// ---------------------------------------------------------------------------
// Model server events (opaque to the dispatcher)
// ---------------------------------------------------------------------------

/// Raw generic-server model message, handed to the model collaborator as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMessage {
    pub model_id: u16,
    pub elem_index: u16,
    pub client_address: u16,
    pub appkey_index: u16,
    pub payload: Vec<u8, 16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    ClientRequest(ModelMessage),
    StateChanged(ModelMessage),
    StateRecall(ModelMessage),
}

impl ModelEvent {
    pub fn message(&self) -> &ModelMessage {
        match self {
            Self::ClientRequest(m) | Self::StateChanged(m) | Self::StateRecall(m) => m,
        }
    }
}

// ---------------------------------------------------------------------------
// Stack events
// ---------------------------------------------------------------------------

/// Every event the dispatcher can be handed.
#[derive(Debug, Clone, PartialEq)]
pub enum StackEvent {
    // ── System ────────────────────────────────────────────
    /// Stack is up; first event after reset.
    Boot,
    /// A software timer expired.
    SoftTimer(TimerId),

    // ── Mesh node lifecycle ───────────────────────────────
    NodeInitialized {
        provisioned: bool,
        address: u16,
        iv_index: u32,
    },
    ProvisioningStarted,
    Provisioned {
        address: u16,
    },
    ProvisioningFailed {
        result: u16,
    },
    KeyAdded {
        kind: KeyKind,
        index: u16,
    },
    ModelConfigChanged,
    ModelServer(ModelEvent),
    /// The provisioner removed this node from the network.
    NodeReset,

    // ── Friend role ───────────────────────────────────────
    FriendshipEstablished {
        lpn_address: u16,
    },
    FriendshipTerminated {
        reason: u16,
    },

    // ── BLE connection ────────────────────────────────────
    AdvertisingTimeout,
    ConnectionOpened {
        connection: u8,
    },
    ConnectionParameters,
    ConnectionClosed {
        reason: u16,
    },
    GattUserWrite {
        connection: u8,
        characteristic: u16,
    },

    // ── Application ───────────────────────────────────────
    /// The on/off model reported authorised personnel presence.
    AuthorityChanged {
        present: bool,
    },
    /// A software signal drained from the interrupt bridge.
    Signal(Signal),

    /// Any event identifier the firmware does not handle.
    Unknown(u32),
}

impl StackEvent {
    /// Short label for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Boot => "boot",
            Self::SoftTimer(_) => "soft_timer",
            Self::NodeInitialized { .. } => "node_initialized",
            Self::ProvisioningStarted => "provisioning_started",
            Self::Provisioned { .. } => "provisioned",
            Self::ProvisioningFailed { .. } => "provisioning_failed",
            Self::KeyAdded { .. } => "key_added",
            Self::ModelConfigChanged => "model_config_changed",
            Self::ModelServer(_) => "model_server",
            Self::NodeReset => "node_reset",
            Self::FriendshipEstablished { .. } => "friendship_established",
            Self::FriendshipTerminated { .. } => "friendship_terminated",
            Self::AdvertisingTimeout => "advertising_timeout",
            Self::ConnectionOpened { .. } => "connection_opened",
            Self::ConnectionParameters => "connection_parameters",
            Self::ConnectionClosed { .. } => "connection_closed",
            Self::GattUserWrite { .. } => "gatt_user_write",
            Self::AuthorityChanged { .. } => "authority_changed",
            Self::Signal(_) => "signal",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Expand a drained signal mask into one event per pending cause, in
/// [`Signal::ALL`] order.
pub fn signal_events(mask: SignalMask) -> impl Iterator<Item = StackEvent> {
    mask.iter().map(StackEvent::Signal)
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// Bounded FIFO between producer tasks and the main loop.
pub struct EventQueue<const N: usize> {
    chan: Channel<CriticalSectionRawMutex, StackEvent, N>,
}

impl<const N: usize> EventQueue<N> {
    pub const fn new() -> Self {
        Self {
            chan: Channel::new(),
        }
    }

    /// Enqueue without blocking.  Returns `false` if the queue is full and
    /// the event was dropped.
    pub fn post(&self, event: StackEvent) -> bool {
        match self.chan.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                log::warn!("event queue full, dropping event");
                false
            }
        }
    }

    /// Next event in arrival order, if any.
    pub fn next(&self) -> Option<StackEvent> {
        self.chan.try_receive().ok()
    }

    /// Drain every queued event into `handler`, FIFO.
    pub fn drain(&self, mut handler: impl FnMut(StackEvent)) {
        while let Some(event) = self.next() {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.chan.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chan.is_empty()
    }
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide queue fed by the stack task and timer callbacks.
pub static EVENTS: EventQueue<EVENT_QUEUE_CAP> = EventQueue::new();
