//! Joint-space and actuator state snapshots.
//!
//! The polling cycle assembles one `StateSnapshot` per cycle and swaps
//! it into the publisher; clients read it copy-out and never observe a
//! half-updated view.

use serde::{Deserialize, Serialize};

use crate::MAX_AXES;
use crate::error::AxisErrorCode;
use crate::state::{AxisMode, OperatingState};

/// Joint-space position/velocity vectors, one entry per axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointState {
    pub position: heapless::Vec<f64, MAX_AXES>,
    pub velocity: heapless::Vec<f64, MAX_AXES>,
}

impl JointState {
    /// Zero-filled joint state for `count` axes.
    pub fn zeroed(count: usize) -> Self {
        let mut js = Self::default();
        for _ in 0..count.min(MAX_AXES) {
            let _ = js.position.push(0.0);
            let _ = js.velocity.push(0.0);
        }
        js
    }
}

/// Raw per-axis hardware diagnostics, mirrored from the last poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActuatorState {
    /// Motor current [A].
    pub current: f64,
    /// Raw drive status word bits.
    pub status_raw: u16,
    pub digital_inputs: u16,
}

/// Complete published state, assembled once per polling cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Cycle counter at publication time.
    pub cycle: u64,
    pub operating: OperatingState,
    pub modes: heapless::Vec<AxisMode, MAX_AXES>,
    pub measured: JointState,
    pub setpoint: JointState,
    pub actuators: heapless::Vec<ActuatorState, MAX_AXES>,
    pub errors: heapless::Vec<Option<AxisErrorCode>, MAX_AXES>,
}

impl StateSnapshot {
    /// Initial snapshot for `count` configured axes: every axis
    /// Disabled, all values zero.
    pub fn initial(count: usize) -> Self {
        let count = count.min(MAX_AXES);
        let mut snap = Self {
            cycle: 0,
            operating: OperatingState {
                system_mode: crate::state::SystemMode::Disabled,
                is_homed: false,
            },
            measured: JointState::zeroed(count),
            setpoint: JointState::zeroed(count),
            ..Self::default()
        };
        for _ in 0..count {
            let _ = snap.modes.push(AxisMode::Disabled);
            let _ = snap.actuators.push(ActuatorState::default());
            let _ = snap.errors.push(None);
        }
        snap
    }

    #[inline]
    pub fn axis_count(&self) -> usize {
        self.modes.len()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
