//! Controller events delivered to subscribed clients.

use serde::{Deserialize, Serialize};

use crate::state::OperatingState;

/// Severity of a human-readable diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Severity {
    Status = 0,
    Warning = 1,
    Error = 2,
}

/// Event pushed to subscribers by the polling cycle.
///
/// Delivery is best-effort and non-blocking: a subscriber that stops
/// draining its channel loses events, never stalls the cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControllerEvent {
    /// Fires on every aggregate operating-state transition, including
    /// entry into Fault.
    OperatingStateChanged {
        previous: OperatingState,
        current: OperatingState,
    },
    /// Human-readable diagnostic message.
    Message { severity: Severity, text: String },
}

impl ControllerEvent {
    pub fn status(text: impl Into<String>) -> Self {
        Self::Message {
            severity: Severity::Status,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::Message {
            severity: Severity::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::Message {
            severity: Severity::Error,
            text: text.into(),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
