//! SDC Common Library
//!
//! Shared types for the SDC (servo-drive control) workspace: axis and
//! system state enums, command variants, the drive register model,
//! joint/actuator snapshots, error types, events, and configuration
//! structs.
//!
//! # Module Structure
//!
//! - [`state`] - Axis and system operating-state enums
//! - [`command`] - Client-facing command variants
//! - [`drive`] - Drive register model (status word, register snapshot, drive commands)
//! - [`joint`] - Joint-space and actuator state snapshots
//! - [`error`] - Dispatch, transport, and axis error types
//! - [`event`] - Controller event types delivered to subscribers
//! - [`config`] - Configuration structs (TOML via serde)

pub mod command;
pub mod config;
pub mod drive;
pub mod error;
pub mod event;
pub mod joint;
pub mod state;

/// Maximum number of axes a single controller instance supports.
///
/// Bounds all fixed-capacity collections so the polling cycle never
/// allocates after startup.
pub const MAX_AXES: usize = 16;
