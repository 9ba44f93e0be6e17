//! Per-axis state machine, aggregate axis state, and the
//! operating-state reduction.

pub mod axis;
pub mod machine;
pub mod operating;

pub use axis::{AxisState, AxisStates};
pub use machine::{AxisEvent, AxisStateMachine, Transition};
