//! Logical axis index → hardware node mapping with calibration.
//!
//! Built once from configuration. The single runtime mutation is
//! `zero_offset`, called only at the command-drain point of the cycle,
//! so poll reads never observe a half-applied calibration.

use heapless::Vec;
use sdc_common::MAX_AXES;
use sdc_common::config::{AxisConfig, HomeReference};
use sdc_common::error::DispatchError;

/// Mapping and calibration for one axis.
#[derive(Debug, Clone)]
pub struct AxisDescriptor {
    pub logical_index: usize,
    pub node_id: u8,
    /// Subtracted from the scaled raw position.
    pub position_offset: f64,
    /// Raw-to-joint divisor, non-zero (enforced at config validation).
    pub position_scale: f64,
    pub home_reference: HomeReference,
}

/// Static axis map. Axis count is fixed after construction.
#[derive(Debug, Clone)]
pub struct AxisMap {
    axes: Vec<AxisDescriptor, MAX_AXES>,
}

impl AxisMap {
    /// Build from validated axis configuration.
    pub fn from_config(axes: &[AxisConfig]) -> Self {
        let mut map = Self { axes: Vec::new() };
        for (i, ax) in axes.iter().enumerate().take(MAX_AXES) {
            let _ = map.axes.push(AxisDescriptor {
                logical_index: i,
                node_id: ax.node_id,
                position_offset: ax.position_offset,
                position_scale: ax.position_scale,
                home_reference: ax.home_reference,
            });
        }
        map
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.axes.len()
    }

    /// Descriptor for a logical axis index.
    pub fn resolve(&self, logical_index: usize) -> Result<&AxisDescriptor, DispatchError> {
        self.axes
            .get(logical_index)
            .ok_or(DispatchError::UnknownAxis {
                axis: logical_index,
            })
    }

    /// Node id for a logical axis. Callers index within `0..count()`.
    #[inline]
    pub fn node_id(&self, logical_index: usize) -> u8 {
        self.axes[logical_index].node_id
    }

    /// Raw drive position → joint position.
    #[inline]
    pub fn to_joint_position(&self, logical_index: usize, raw: f64) -> f64 {
        let d = &self.axes[logical_index];
        raw / d.position_scale - d.position_offset
    }

    /// Joint position → raw drive position.
    #[inline]
    pub fn to_raw_position(&self, logical_index: usize, joint: f64) -> f64 {
        let d = &self.axes[logical_index];
        (joint + d.position_offset) * d.position_scale
    }

    /// Raw drive velocity → joint velocity (scale only, no offset).
    #[inline]
    pub fn to_joint_velocity(&self, logical_index: usize, raw: f64) -> f64 {
        raw / self.axes[logical_index].position_scale
    }

    /// Joint velocity → raw drive velocity.
    #[inline]
    pub fn to_raw_velocity(&self, logical_index: usize, joint: f64) -> f64 {
        joint * self.axes[logical_index].position_scale
    }

    /// Re-zero the axis so that `raw` reads as joint position 0.
    ///
    /// Only the command-drain point calls this.
    pub fn zero_offset(&mut self, logical_index: usize, raw: f64) {
        let d = &mut self.axes[logical_index];
        d.position_offset = raw / d.position_scale;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sdc_common::drive::ProfileParams;

    fn axis(node_id: u8, offset: f64, scale: f64) -> AxisConfig {
        AxisConfig {
            node_id,
            name: String::new(),
            position_offset: offset,
            position_scale: scale,
            home_reference: HomeReference::SetZero,
            profile: ProfileParams::default(),
        }
    }

    #[test]
    fn resolve_in_range() {
        let map = AxisMap::from_config(&[axis(1, 0.0, 1.0), axis(2, 0.0, 1.0)]);
        assert_eq!(map.count(), 2);
        assert_eq!(map.resolve(0).unwrap().node_id, 1);
        assert_eq!(map.resolve(1).unwrap().node_id, 2);
    }

    #[test]
    fn resolve_out_of_range() {
        let map = AxisMap::from_config(&[axis(1, 0.0, 1.0)]);
        assert_eq!(
            map.resolve(1).unwrap_err(),
            DispatchError::UnknownAxis { axis: 1 }
        );
    }

    #[test]
    fn position_calibration_roundtrip() {
        let map = AxisMap::from_config(&[axis(5, 2.5, 1000.0)]);
        let joint = map.to_joint_position(0, 7500.0);
        assert!((joint - 5.0).abs() < 1e-9);
        let raw = map.to_raw_position(0, joint);
        assert!((raw - 7500.0).abs() < 1e-9);
    }

    #[test]
    fn velocity_ignores_offset() {
        let map = AxisMap::from_config(&[axis(5, 100.0, 2.0)]);
        assert_eq!(map.to_joint_velocity(0, 4.0), 2.0);
        assert_eq!(map.to_raw_velocity(0, 2.0), 4.0);
    }

    #[test]
    fn zero_offset_makes_current_raw_read_zero() {
        let mut map = AxisMap::from_config(&[axis(1, 3.0, 500.0)]);
        map.zero_offset(0, 1234.0);
        assert!(map.to_joint_position(0, 1234.0).abs() < 1e-9);
        // A move away from the new zero reads in joint units.
        assert!((map.to_joint_position(0, 1234.0 + 500.0) - 1.0).abs() < 1e-9);
    }
}
