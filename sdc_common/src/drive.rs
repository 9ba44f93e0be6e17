//! Drive register model.
//!
//! `StatusWord` mirrors the drive's CiA-402-style status register;
//! `RegisterSnapshot` is what one transport read returns for a node;
//! `DriveCommand` is what the dispatcher writes to a node. None of
//! this specifies the wire encoding — that is the transport's concern.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Drive status word as observed by a register read.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusWord: u16 {
        const READY_TO_SWITCH_ON = 1 << 0;
        const SWITCHED_ON        = 1 << 1;
        const OPERATION_ENABLED  = 1 << 2;
        const FAULT              = 1 << 3;
        const VOLTAGE_ENABLED    = 1 << 4;
        const QUICK_STOP_ACTIVE  = 1 << 5;
        const TARGET_REACHED     = 1 << 10;
        const HOMING_ATTAINED    = 1 << 12;
        const HOMING_ERROR       = 1 << 13;
    }
}

impl StatusWord {
    /// Power stage on and ready to accept motion commands.
    #[inline]
    pub const fn is_operational(&self) -> bool {
        self.contains(Self::OPERATION_ENABLED)
    }

    /// Drive-reported fault, including a failed homing run.
    #[inline]
    pub const fn has_fault(&self) -> bool {
        self.intersects(Self::FAULT.union(Self::HOMING_ERROR))
    }
}

/// One transport read for one node. Position/velocity are in raw drive
/// units; calibration to joint space happens in the axis map.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegisterSnapshot {
    pub status: StatusWord,
    pub position: f64,
    pub velocity: f64,
    /// Motor current [A].
    pub current: f64,
    pub digital_inputs: u16,
}

/// Per-axis profile limits for absolute moves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileParams {
    /// Profile velocity [units/s].
    #[serde(default = "default_profile_velocity")]
    pub velocity: f64,
    /// Profile acceleration [units/s²].
    #[serde(default = "default_profile_accel")]
    pub acceleration: f64,
    /// Profile deceleration [units/s²].
    #[serde(default = "default_profile_accel")]
    pub deceleration: f64,
}

fn default_profile_velocity() -> f64 {
    10.0
}
fn default_profile_accel() -> f64 {
    100.0
}

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            velocity: default_profile_velocity(),
            acceleration: default_profile_accel(),
            deceleration: default_profile_accel(),
        }
    }
}

/// Command written to a single drive node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveCommand {
    /// Switch the power stage on.
    Enable,
    /// Switch the power stage off.
    Disable,
    /// Clear a latched drive fault (written before Disable when
    /// acknowledging a fault).
    FaultReset,
    /// Profile-mode move to an absolute raw target.
    ProfileMove {
        target: f64,
        profile: ProfileParams,
    },
    /// Continuous velocity mode at a raw velocity.
    VelocityMove { velocity: f64 },
    /// Decelerate to zero and hold position.
    Halt,
    /// Start the drive-internal homing procedure.
    StartHoming,
}

// ─── Tests ──────────────────────────────────────────────────────────
