//! Snapshot publication and event fan-out.
//!
//! The cycle swaps a complete [`StateSnapshot`] into an `ArcSwap` once
//! per cycle; clients load it wait-free and copy-out, so a late joiner
//! never sees a half-updated view. Events go to subscriber channels
//! with `try_send` — a slow subscriber loses events, never stalls the
//! cycle.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender, bounded};
use sdc_common::event::ControllerEvent;
use sdc_common::joint::{JointState, StateSnapshot};
use sdc_common::state::OperatingState;
use tracing::debug;

/// Capacity of each subscriber's event channel.
const EVENT_QUEUE_DEPTH: usize = 64;

/// Writer side, owned by the cycle thread.
pub struct StatePublisher {
    snapshot: Arc<ArcSwap<StateSnapshot>>,
    subscribers: Arc<Mutex<Vec<Sender<ControllerEvent>>>>,
}

impl StatePublisher {
    /// Create a publisher seeded with the initial snapshot.
    pub fn new(initial: StateSnapshot) -> Self {
        Self {
            snapshot: Arc::new(ArcSwap::from_pointee(initial)),
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Read-side handle for clients. Cheap to clone.
    pub fn handle(&self) -> StateHandle {
        StateHandle {
            snapshot: Arc::clone(&self.snapshot),
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    /// Swap in this cycle's snapshot.
    pub fn store(&self, snapshot: StateSnapshot) {
        self.snapshot.store(Arc::new(snapshot));
    }

    /// Fan an event out to every subscriber, dropping on full queues
    /// and pruning disconnected ones.
    pub fn emit(&self, event: ControllerEvent) {
        let Ok(mut subs) = self.subscribers.lock() else {
            return;
        };
        subs.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(crossbeam_channel::TrySendError::Full(_)) => {
                debug!("subscriber queue full, event dropped");
                true
            }
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
        });
    }
}

/// Client-side view: wait-free snapshot loads plus event subscription.
#[derive(Clone)]
pub struct StateHandle {
    snapshot: Arc<ArcSwap<StateSnapshot>>,
    subscribers: Arc<Mutex<Vec<Sender<ControllerEvent>>>>,
}

impl StateHandle {
    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<StateSnapshot> {
        self.snapshot.load_full()
    }

    pub fn operating_state(&self) -> OperatingState {
        self.snapshot.load().operating
    }

    pub fn measured_joint_state(&self) -> JointState {
        self.snapshot.load().measured.clone()
    }

    pub fn setpoint_joint_state(&self) -> JointState {
        self.snapshot.load().setpoint.clone()
    }

    /// Number of configured axes. Fixed for the controller's lifetime.
    pub fn axis_count(&self) -> usize {
        self.snapshot.load().axis_count()
    }

    /// Register a new event subscriber.
    pub fn subscribe(&self) -> Receiver<ControllerEvent> {
        let (tx, rx) = bounded(EVENT_QUEUE_DEPTH);
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
