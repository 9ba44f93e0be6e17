//! Axis and system operating-state enums.
//!
//! `AxisMode` is the per-axis safety state; `SystemMode` is the
//! aggregate derived from the full axis set every cycle. Both are
//! `#[repr(u8)]` for compact snapshots.

use serde::{Deserialize, Serialize};

/// Per-axis safety state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AxisMode {
    /// Drive power stage off. Initial state after configuration.
    Disabled = 0,
    /// Enable command sent, waiting for the drive to report ready.
    Enabling = 1,
    /// Power stage on, motion commands admissible.
    Enabled = 2,
    /// Drive homing procedure in progress.
    Homing = 3,
    /// Drive fault or communication failure. Held until acknowledged
    /// by an explicit Disable.
    Fault = 4,
}

impl AxisMode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Disabled),
            1 => Some(Self::Enabling),
            2 => Some(Self::Enabled),
            3 => Some(Self::Homing),
            4 => Some(Self::Fault),
            _ => None,
        }
    }

    /// Transient states advanced by the polling cycle against a timeout.
    #[inline]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Enabling | Self::Homing)
    }

    /// Whether motion commands may be issued in this state.
    #[inline]
    pub const fn accepts_motion(&self) -> bool {
        matches!(self, Self::Enabled)
    }
}

impl Default for AxisMode {
    fn default() -> Self {
        Self::Disabled
    }
}

/// Aggregate system operating mode, derived from the axis-mode set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SystemMode {
    /// No axes configured yet.
    Undefined = 0,
    /// Not all axes enabled, none faulted.
    Disabled = 1,
    /// Every axis enabled.
    Enabled = 2,
    /// Homing axes form the majority of the not-yet-enabled set.
    Homing = 3,
    /// At least one axis faulted.
    Fault = 4,
}

impl SystemMode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Undefined),
            1 => Some(Self::Disabled),
            2 => Some(Self::Enabled),
            3 => Some(Self::Homing),
            4 => Some(Self::Fault),
            _ => None,
        }
    }
}

impl Default for SystemMode {
    fn default() -> Self {
        Self::Undefined
    }
}

/// Published aggregate operating state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingState {
    pub system_mode: SystemMode,
    /// True once every axis has completed a SetHome.
    pub is_homed: bool,
}

// ─── Tests ──────────────────────────────────────────────────────────
