//! Threaded controller facade.
//!
//! Wires the command queue, publisher, and cycle runner together and
//! runs the polling loop on a dedicated thread. `submit` validates
//! synchronously against the last published snapshot and enqueues; the
//! cycle thread drains, re-checks against authoritative state, and
//! issues the transport writes. The call returns once the command is
//! admitted and queued — motion completion is observed through
//! subsequent state reads, never awaited.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded};
use sdc_common::command::Command;
use sdc_common::config::ControllerConfig;
use sdc_common::error::DispatchError;
use sdc_common::event::ControllerEvent;
use sdc_common::joint::{JointState, StateSnapshot};
use sdc_common::state::OperatingState;
use tracing::info;

use crate::config::ConfigError;
use crate::cycle::CycleRunner;
use crate::dispatch;
use crate::publish::{StateHandle, StatePublisher};
use crate::transport::Transport;

/// Depth of the command queue between clients and the cycle thread.
const COMMAND_QUEUE_DEPTH: usize = 32;

/// Running controller instance. Dropping it stops the cycle thread.
pub struct Controller {
    commands: Sender<Command>,
    state: StateHandle,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    /// Validate the configuration, spawn the polling thread, and
    /// return the client facade.
    pub fn start<T: Transport + 'static>(
        config: ControllerConfig,
        transport: T,
    ) -> Result<Self, ConfigError> {
        config.validate().map_err(ConfigError::ValidationError)?;

        let (tx, rx): (Sender<Command>, Receiver<Command>) = bounded(COMMAND_QUEUE_DEPTH);
        let publisher = StatePublisher::new(StateSnapshot::initial(config.axis_count()));
        let state = publisher.handle();

        let running = Arc::new(AtomicBool::new(true));
        let run_flag = Arc::clone(&running);
        let mut runner = CycleRunner::new(&config, transport, rx, publisher);
        let thread = std::thread::Builder::new()
            .name("sdc-cycle".to_string())
            .spawn(move || runner.run(&run_flag))
            .map_err(|e| ConfigError::IoError(format!("failed to spawn cycle thread: {e}")))?;

        info!(axes = config.axis_count(), "controller started");
        Ok(Self {
            commands: tx,
            state,
            running,
            thread: Some(thread),
        })
    }

    /// Submit a command.
    ///
    /// Validated synchronously against the latest published snapshot;
    /// a rejection mutates nothing. An admitted command takes effect
    /// at the start of the next polling cycle.
    pub fn submit(&self, command: Command) -> Result<(), DispatchError> {
        dispatch::admit(&command, &self.state.snapshot().modes)?;
        match self.commands.try_send(command) {
            Ok(()) => Ok(()),
            Err(crossbeam_channel::TrySendError::Full(_)) => Err(DispatchError::QueueFull),
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => Err(DispatchError::Shutdown),
        }
    }

    /// Latest complete state snapshot (copy-out).
    pub fn snapshot(&self) -> Arc<StateSnapshot> {
        self.state.snapshot()
    }

    pub fn operating_state(&self) -> OperatingState {
        self.state.operating_state()
    }

    pub fn measured_joint_state(&self) -> JointState {
        self.state.measured_joint_state()
    }

    pub fn setpoint_joint_state(&self) -> JointState {
        self.state.setpoint_joint_state()
    }

    /// Number of configured axes, fixed for the controller's lifetime.
    pub fn axis_count(&self) -> usize {
        self.state.axis_count()
    }

    /// Subscribe to operating-state changes and diagnostic messages.
    pub fn subscribe(&self) -> Receiver<ControllerEvent> {
        self.state.subscribe()
    }

    /// Stop the polling loop and join the cycle thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
