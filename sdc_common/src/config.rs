//! Configuration structs (TOML via serde).
//!
//! Per-axis: node id, calibration, home reference. Global: poll period
//! and enable/homing timeouts. Loading and cross-field validation live
//! in the control-unit crate; per-struct bounds checks live here.

use serde::{Deserialize, Serialize};

use crate::MAX_AXES;
use crate::drive::ProfileParams;

/// How SetHome references an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HomeReference {
    /// Zero the reported position at the current location; no motion.
    SetZero = 0,
    /// Run the drive-internal homing procedure, then zero.
    DriveHoming = 1,
}

impl HomeReference {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::SetZero),
            1 => Some(Self::DriveHoming),
            _ => None,
        }
    }
}

impl Default for HomeReference {
    fn default() -> Self {
        Self::SetZero
    }
}

/// Configuration for a single axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Field-network node id of this axis's drive. Unique per axis.
    pub node_id: u8,
    #[serde(default)]
    pub name: String,
    /// Calibration offset [units], subtracted from the scaled raw position.
    #[serde(default)]
    pub position_offset: f64,
    /// Raw-to-joint scale divisor. Must be non-zero.
    #[serde(default = "default_position_scale")]
    pub position_scale: f64,
    #[serde(default)]
    pub home_reference: HomeReference,
    /// Initial profile limits; replaceable at runtime via SetProfile.
    #[serde(default)]
    pub profile: ProfileParams,
}

fn default_position_scale() -> f64 {
    1.0
}

/// Top-level controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Polling cycle period [µs].
    #[serde(default = "default_poll_period_us")]
    pub poll_period_us: u64,
    /// Enable sequence timeout [s].
    #[serde(default = "default_enable_timeout")]
    pub enable_timeout: f64,
    /// Homing procedure timeout [s].
    #[serde(default = "default_homing_timeout")]
    pub homing_timeout: f64,
    pub axes: Vec<AxisConfig>,
}

fn default_poll_period_us() -> u64 {
    10_000
}
fn default_enable_timeout() -> f64 {
    5.0
}
fn default_homing_timeout() -> f64 {
    30.0
}

impl ControllerConfig {
    /// Validate bounds and cross-axis constraints.
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_period_us < 100 {
            return Err(format!(
                "poll_period_us {} below minimum 100",
                self.poll_period_us
            ));
        }
        if !(self.enable_timeout > 0.0) {
            return Err(format!("enable_timeout {} must be > 0", self.enable_timeout));
        }
        if !(self.homing_timeout > 0.0) {
            return Err(format!("homing_timeout {} must be > 0", self.homing_timeout));
        }
        if self.axes.is_empty() {
            return Err("at least one axis must be configured".to_string());
        }
        if self.axes.len() > MAX_AXES {
            return Err(format!(
                "{} axes configured, maximum is {MAX_AXES}",
                self.axes.len()
            ));
        }
        let mut seen = [false; 256];
        for (i, ax) in self.axes.iter().enumerate() {
            if seen[ax.node_id as usize] {
                return Err(format!("duplicate node_id {} on axis {i}", ax.node_id));
            }
            seen[ax.node_id as usize] = true;
            if ax.position_scale == 0.0 {
                return Err(format!("axis {i}: position_scale must be non-zero"));
            }
            if !(ax.profile.velocity > 0.0)
                || !(ax.profile.acceleration > 0.0)
                || !(ax.profile.deceleration > 0.0)
            {
                return Err(format!("axis {i}: profile limits must be > 0"));
            }
        }
        Ok(())
    }

    #[inline]
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
