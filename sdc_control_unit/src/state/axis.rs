//! Aggregate per-axis runtime state and the fixed-capacity container
//! the cycle iterates over.

use heapless::Vec;
use sdc_common::MAX_AXES;
use sdc_common::config::AxisConfig;
use sdc_common::drive::ProfileParams;
use sdc_common::joint::ActuatorState;
use sdc_common::state::AxisMode;

use super::machine::AxisStateMachine;

/// Everything the controller tracks for one axis.
///
/// Measured fields are written only by the poll phase; setpoints and
/// mode transitions only at the command-drain point.
#[derive(Debug, Clone)]
pub struct AxisState {
    pub machine: AxisStateMachine,
    /// Joint-space measured values from the last successful poll.
    pub measured_position: f64,
    pub measured_velocity: f64,
    /// Raw drive position from the last successful poll; SetHome uses
    /// it to re-zero the calibration.
    pub raw_position: f64,
    /// Joint-space setpoints. Relative moves accumulate on these, not
    /// on measured values, so sensor noise never drifts the target.
    pub setpoint_position: f64,
    pub setpoint_velocity: f64,
    /// Diagnostics mirror of the last poll.
    pub actuator: ActuatorState,
    /// Profile limits for absolute moves; staged by SetProfile.
    pub profile: ProfileParams,
}

impl AxisState {
    pub fn new(profile: ProfileParams) -> Self {
        Self {
            machine: AxisStateMachine::new(),
            measured_position: 0.0,
            measured_velocity: 0.0,
            raw_position: 0.0,
            setpoint_position: 0.0,
            setpoint_velocity: 0.0,
            actuator: ActuatorState::default(),
            profile,
        }
    }

    #[inline]
    pub fn mode(&self) -> AxisMode {
        self.machine.mode()
    }
}

/// Fixed-capacity axis-state array, sized at configuration time.
#[derive(Debug, Clone, Default)]
pub struct AxisStates {
    axes: Vec<AxisState, MAX_AXES>,
}

impl AxisStates {
    /// Initialize one state per configured axis, all Disabled.
    pub fn from_config(configs: &[AxisConfig]) -> Self {
        let mut states = Self::default();
        for cfg in configs.iter().take(MAX_AXES) {
            let _ = states.axes.push(AxisState::new(cfg.profile));
        }
        states
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.axes.len()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&AxisState> {
        self.axes.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut AxisState> {
        self.axes.get_mut(index)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &AxisState> {
        self.axes.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AxisState> {
        self.axes.iter_mut()
    }

    /// Current mode of every axis, in logical order.
    pub fn modes(&self) -> Vec<AxisMode, MAX_AXES> {
        let mut modes = Vec::new();
        for ax in &self.axes {
            let _ = modes.push(ax.mode());
        }
        modes
    }

    /// True once every axis has completed a SetHome.
    pub fn all_homed(&self) -> bool {
        !self.axes.is_empty() && self.axes.iter().all(|ax| ax.machine.is_homed)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sdc_common::config::HomeReference;

    fn configs(n: usize) -> std::vec::Vec<AxisConfig> {
        (0..n)
            .map(|i| AxisConfig {
                node_id: i as u8 + 1,
                name: format!("axis{i}"),
                position_offset: 0.0,
                position_scale: 1.0,
                home_reference: HomeReference::SetZero,
                profile: ProfileParams::default(),
            })
            .collect()
    }

    #[test]
    fn from_config_all_disabled() {
        let states = AxisStates::from_config(&configs(4));
        assert_eq!(states.count(), 4);
        assert!(states.iter().all(|ax| ax.mode() == AxisMode::Disabled));
        assert!(!states.all_homed());
    }

    #[test]
    fn modes_snapshot_in_order() {
        let mut states = AxisStates::from_config(&configs(3));
        states
            .get_mut(1)
            .unwrap()
            .machine
            .force_comm_fault();
        let modes = states.modes();
        assert_eq!(modes[0], AxisMode::Disabled);
        assert_eq!(modes[1], AxisMode::Fault);
        assert_eq!(modes[2], AxisMode::Disabled);
    }

    #[test]
    fn all_homed_requires_every_axis() {
        let mut states = AxisStates::from_config(&configs(2));
        states.get_mut(0).unwrap().machine.is_homed = true;
        assert!(!states.all_homed());
        states.get_mut(1).unwrap().machine.is_homed = true;
        assert!(states.all_homed());
    }
}
