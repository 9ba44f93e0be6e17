//! SDC Control Unit
//!
//! Control core for a multi-axis servo-drive controller: a fixed-period
//! polling cycle reads every drive node through a transport
//! abstraction, advances the per-axis safety state machines, and
//! publishes joint/actuator state; an asynchronous command surface is
//! serialized into the cycle at a single drain point so commands never
//! race the poll-driven state updates.
//!
//! # Module Structure
//!
//! - [`axis_map`] - Logical axis index → hardware node mapping + calibration
//! - [`state`] - Per-axis state machine and operating-state reduction
//! - [`dispatch`] - Command admission and drain-point execution
//! - [`cycle`] - The fixed-period polling loop
//! - [`publish`] - Snapshot publication and event fan-out
//! - [`transport`] - Transport trait + simulation transport
//! - [`config`] - TOML config loading and validation
//! - [`controller`] - Threaded facade wiring all of the above

pub mod axis_map;
pub mod config;
pub mod controller;
pub mod cycle;
pub mod dispatch;
pub mod publish;
pub mod state;
pub mod transport;
