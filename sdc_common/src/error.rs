//! Dispatch, transport, and axis error types.
//!
//! Dispatch-time validation errors are surfaced synchronously to the
//! submitting client and never mutate controller state. Poll-time
//! failures land on the affected axis only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport read/write failure for a single node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("node {node}: operation timed out")]
    Timeout { node: u8 },
    #[error("node {node} is offline")]
    NodeOffline { node: u8 },
    #[error("bus error: {0}")]
    Bus(String),
}

/// Synchronous command rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown axis {axis}")]
    UnknownAxis { axis: usize },
    #[error("dimension mismatch: expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("axis {axis} is not ready for motion")]
    AxisNotReady { axis: usize },
    #[error("axis {axis} has a pending fault; acknowledge with Disable first")]
    FaultPending { axis: usize },
    #[error("invalid transition for axis {axis}: {reason}")]
    Transition { axis: usize, reason: &'static str },
    #[error("command queue is full")]
    QueueFull,
    #[error("controller is shut down")]
    Shutdown,
}

/// Cause recorded on an axis when it enters Fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AxisErrorCode {
    /// Transport read or write failed for this node.
    CommunicationError = 0,
    /// Drive reported a fault bit in its status word.
    DriveFault = 1,
    /// Drive did not report ready within the enable timeout.
    EnableTimeout = 2,
    /// Homing did not complete within the homing timeout.
    HomingTimeout = 3,
}

impl AxisErrorCode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::CommunicationError),
            1 => Some(Self::DriveFault),
            2 => Some(Self::EnableTimeout),
            3 => Some(Self::HomingTimeout),
            _ => None,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::CommunicationError => "communication error",
            Self::DriveFault => "drive fault",
            Self::EnableTimeout => "enable timeout",
            Self::HomingTimeout => "homing timeout",
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
