//! Aggregate operating-state reduction.
//!
//! `SystemMode` is always a pure function of the current axis-mode
//! set, never independently settable. Recomputed every cycle and after
//! every drained command.

use sdc_common::state::{AxisMode, OperatingState, SystemMode};

use super::axis::AxisStates;

/// Reduce a set of axis modes to the aggregate system mode.
///
/// Fault dominates; Enabled requires unanimity; otherwise the system
/// reports Homing when homing axes form the majority of the
/// not-yet-enabled set, else Disabled.
pub fn reduce(modes: &[AxisMode]) -> SystemMode {
    if modes.is_empty() {
        return SystemMode::Undefined;
    }
    if modes.iter().any(|m| *m == AxisMode::Fault) {
        return SystemMode::Fault;
    }
    if modes.iter().all(|m| *m == AxisMode::Enabled) {
        return SystemMode::Enabled;
    }
    let homing = modes.iter().filter(|m| **m == AxisMode::Homing).count();
    let not_enabled = modes.iter().filter(|m| **m != AxisMode::Enabled).count();
    if homing > 0 && homing * 2 >= not_enabled {
        SystemMode::Homing
    } else {
        SystemMode::Disabled
    }
}

/// Full operating state for the current axis set.
pub fn operating_state(axes: &AxisStates) -> OperatingState {
    OperatingState {
        system_mode: reduce(&axes.modes()),
        is_homed: axes.all_homed(),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
