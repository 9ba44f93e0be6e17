//! Client-facing command variants.
//!
//! A `Command` is an immutable value created by a client at submission
//! time and consumed exactly once at the command-drain point of the
//! polling cycle. Goal vectors are fixed-capacity so a command never
//! allocates on the control path.

use serde::{Deserialize, Serialize};

use crate::MAX_AXES;

/// Joint-space goal vector, one entry per configured axis.
pub type GoalVec = heapless::Vec<f64, MAX_AXES>;

/// Command submitted by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Move every axis to an absolute position using the drive's
    /// profile motion mode.
    PositionAbsolute(GoalVec),
    /// Move every axis by a delta relative to its last setpoint.
    PositionRelative(GoalVec),
    /// Continuous velocity mode. Persists until superseded by Hold,
    /// a new Velocity command, or Disable.
    Velocity(GoalVec),
    /// Decelerate to zero and hold position at the current measured
    /// position. Aborts an in-progress homing.
    Hold,
    /// Power up all drives.
    Enable,
    /// Power down all drives. Never rejected; also the fault
    /// acknowledgment path.
    Disable,
    /// Zero the reported position of every axis at its current
    /// location, starting the drive homing procedure where configured.
    SetHome,
    /// Stage per-axis velocity/acceleration/deceleration limits for
    /// subsequent absolute moves.
    SetProfile {
        velocity: GoalVec,
        acceleration: GoalVec,
        deceleration: GoalVec,
    },
}

/// Discriminant used for admission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandKind {
    PositionAbsolute = 0,
    PositionRelative = 1,
    Velocity = 2,
    Hold = 3,
    Enable = 4,
    Disable = 5,
    SetHome = 6,
    SetProfile = 7,
}

impl CommandKind {
    /// Motion commands require every axis to be Enabled.
    #[inline]
    pub const fn is_motion(&self) -> bool {
        matches!(
            self,
            Self::PositionAbsolute | Self::PositionRelative | Self::Velocity
        )
    }
}

impl Command {
    #[inline]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::PositionAbsolute(_) => CommandKind::PositionAbsolute,
            Self::PositionRelative(_) => CommandKind::PositionRelative,
            Self::Velocity(_) => CommandKind::Velocity,
            Self::Hold => CommandKind::Hold,
            Self::Enable => CommandKind::Enable,
            Self::Disable => CommandKind::Disable,
            Self::SetHome => CommandKind::SetHome,
            Self::SetProfile { .. } => CommandKind::SetProfile,
        }
    }

    /// Goal vector length carried by this command, if any.
    pub fn goal_len(&self) -> Option<usize> {
        match self {
            Self::PositionAbsolute(g) | Self::PositionRelative(g) | Self::Velocity(g) => {
                Some(g.len())
            }
            Self::SetProfile { velocity, .. } => Some(velocity.len()),
            _ => None,
        }
    }
}

/// Build a goal vector from a slice. Fails if the slice exceeds
/// [`MAX_AXES`].
pub fn goal_from_slice(values: &[f64]) -> Option<GoalVec> {
    GoalVec::from_slice(values).ok()
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mapping() {
        let g = goal_from_slice(&[1.0, 2.0]).unwrap();
        assert_eq!(
            Command::PositionAbsolute(g.clone()).kind(),
            CommandKind::PositionAbsolute
        );
        assert_eq!(Command::Hold.kind(), CommandKind::Hold);
        assert_eq!(Command::Disable.kind(), CommandKind::Disable);
        assert_eq!(
            Command::SetProfile {
                velocity: g.clone(),
                acceleration: g.clone(),
                deceleration: g,
            }
            .kind(),
            CommandKind::SetProfile
        );
    }

    #[test]
    fn motion_kinds() {
        assert!(CommandKind::PositionAbsolute.is_motion());
        assert!(CommandKind::PositionRelative.is_motion());
        assert!(CommandKind::Velocity.is_motion());
        assert!(!CommandKind::Hold.is_motion());
        assert!(!CommandKind::Enable.is_motion());
        assert!(!CommandKind::SetHome.is_motion());
    }

    #[test]
    fn goal_len() {
        let g = goal_from_slice(&[0.0; 3]).unwrap();
        assert_eq!(Command::Velocity(g).goal_len(), Some(3));
        assert_eq!(Command::Enable.goal_len(), None);
    }

    #[test]
    fn goal_capacity_bound() {
        let too_many = [0.0; MAX_AXES + 1];
        assert!(goal_from_slice(&too_many).is_none());
    }
}
