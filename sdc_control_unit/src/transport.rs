//! Transport boundary and the simulation transport.
//!
//! The cycle is generic over [`Transport`]; wire-level encoding and
//! retry/timeout policy are the implementation's concern — the core
//! only requires that calls return within a bounded time.

use sdc_common::drive::{DriveCommand, RegisterSnapshot, StatusWord};
use sdc_common::error::TransportError;

/// Read/write access to a single drive node on the field network.
pub trait Transport: Send {
    /// Implementation name, for logs.
    fn name(&self) -> &str;

    /// Read status/position/velocity/diagnostic registers for a node.
    fn read_registers(&mut self, node_id: u8) -> Result<RegisterSnapshot, TransportError>;

    /// Write one command to a node.
    fn write_command(
        &mut self,
        node_id: u8,
        command: &DriveCommand,
    ) -> Result<(), TransportError>;
}

// ─── Simulation Transport ───────────────────────────────────────────

/// One emulated drive node.
#[derive(Debug, Clone)]
struct SimDrive {
    enabled: bool,
    /// Reads remaining before the power stage reports operational.
    enable_countdown: u32,
    homing: bool,
    homing_countdown: u32,
    homing_attained: bool,
    fault: bool,
    offline: bool,
    position: f64,
    velocity_cmd: f64,
    target: Option<f64>,
    profile_velocity: f64,
}

impl SimDrive {
    fn new() -> Self {
        Self {
            enabled: false,
            enable_countdown: 0,
            homing: false,
            homing_countdown: 0,
            homing_attained: false,
            fault: false,
            offline: false,
            position: 0.0,
            velocity_cmd: 0.0,
            target: None,
            profile_velocity: 0.0,
        }
    }

    fn status(&self) -> StatusWord {
        let mut w = StatusWord::VOLTAGE_ENABLED | StatusWord::READY_TO_SWITCH_ON;
        if self.fault {
            w |= StatusWord::FAULT;
        }
        if self.enabled && self.enable_countdown == 0 && !self.fault {
            w |= StatusWord::SWITCHED_ON | StatusWord::OPERATION_ENABLED;
        }
        if self.homing_attained {
            w |= StatusWord::HOMING_ATTAINED;
        }
        let at_target = self
            .target
            .map(|t| (t - self.position).abs() < 1e-6)
            .unwrap_or(true);
        if at_target && self.velocity_cmd == 0.0 {
            w |= StatusWord::TARGET_REACHED;
        }
        w
    }

    /// Advance the drive by one read interval.
    fn step(&mut self, dt: f64) {
        if self.enable_countdown > 0 && self.enabled {
            self.enable_countdown -= 1;
        }
        if self.homing && self.enabled {
            if self.homing_countdown > 0 {
                self.homing_countdown -= 1;
            }
            if self.homing_countdown == 0 {
                self.homing = false;
                self.homing_attained = true;
            }
            return;
        }
        if !self.enabled || self.fault {
            return;
        }
        if let Some(target) = self.target {
            let max_step = self.profile_velocity.abs() * dt;
            let err = target - self.position;
            if err.abs() <= max_step {
                self.position = target;
            } else {
                self.position += max_step.copysign(err);
            }
        } else if self.velocity_cmd != 0.0 {
            self.position += self.velocity_cmd * dt;
        }
    }

    fn measured_velocity(&self) -> f64 {
        if !self.enabled || self.fault {
            return 0.0;
        }
        match self.target {
            Some(t) if (t - self.position).abs() > 1e-6 => {
                self.profile_velocity.copysign(t - self.position)
            }
            Some(_) => 0.0,
            None => self.velocity_cmd,
        }
    }
}

/// In-process drive emulation used by tests, benches, and the demo
/// binary. Supports fault and offline injection per node.
pub struct SimTransport {
    drives: Vec<(u8, SimDrive)>,
    enable_latency: u32,
    homing_latency: u32,
    /// Simulated time advanced per register read [s].
    read_interval: f64,
}

impl SimTransport {
    pub fn new(nodes: &[u8]) -> Self {
        Self {
            drives: nodes.iter().map(|n| (*n, SimDrive::new())).collect(),
            enable_latency: 2,
            homing_latency: 3,
            read_interval: 0.01,
        }
    }

    /// Reads after Enable until the drive reports operational: with a
    /// latency of N, the Nth read is the first operational one.
    pub fn with_enable_latency(mut self, reads: u32) -> Self {
        self.enable_latency = reads;
        self
    }

    /// Reads a drive needs to complete its homing procedure.
    pub fn with_homing_latency(mut self, reads: u32) -> Self {
        self.homing_latency = reads;
        self
    }

    /// Latch a drive fault bit on a node.
    pub fn inject_fault(&mut self, node_id: u8) {
        if let Some(d) = self.drive_mut(node_id) {
            d.fault = true;
        }
    }

    /// Make a node stop answering (reads and writes time out).
    pub fn set_offline(&mut self, node_id: u8, offline: bool) {
        if let Some(d) = self.drive_mut(node_id) {
            d.offline = offline;
        }
    }

    /// Raw position of a simulated drive, for test assertions.
    pub fn raw_position(&self, node_id: u8) -> Option<f64> {
        self.drives
            .iter()
            .find(|(n, _)| *n == node_id)
            .map(|(_, d)| d.position)
    }

    fn drive_mut(&mut self, node_id: u8) -> Option<&mut SimDrive> {
        self.drives
            .iter_mut()
            .find(|(n, _)| *n == node_id)
            .map(|(_, d)| d)
    }
}

impl Transport for SimTransport {
    fn name(&self) -> &str {
        "sim"
    }

    fn read_registers(&mut self, node_id: u8) -> Result<RegisterSnapshot, TransportError> {
        let dt = self.read_interval;
        let drive = self
            .drive_mut(node_id)
            .ok_or(TransportError::NodeOffline { node: node_id })?;
        if drive.offline {
            return Err(TransportError::Timeout { node: node_id });
        }
        drive.step(dt);
        let velocity = drive.measured_velocity();
        Ok(RegisterSnapshot {
            status: drive.status(),
            position: drive.position,
            velocity,
            current: 0.05 + velocity.abs() * 0.01,
            digital_inputs: 0,
        })
    }

    fn write_command(
        &mut self,
        node_id: u8,
        command: &DriveCommand,
    ) -> Result<(), TransportError> {
        let enable_latency = self.enable_latency;
        let homing_latency = self.homing_latency;
        let drive = self
            .drive_mut(node_id)
            .ok_or(TransportError::NodeOffline { node: node_id })?;
        if drive.offline {
            return Err(TransportError::Timeout { node: node_id });
        }
        match command {
            DriveCommand::Enable => {
                if !drive.enabled {
                    drive.enabled = true;
                    drive.enable_countdown = enable_latency;
                }
            }
            DriveCommand::Disable => {
                drive.enabled = false;
                drive.target = None;
                drive.velocity_cmd = 0.0;
                drive.homing = false;
            }
            DriveCommand::FaultReset => {
                drive.fault = false;
            }
            DriveCommand::ProfileMove { target, profile } => {
                drive.target = Some(*target);
                drive.profile_velocity = profile.velocity;
                drive.velocity_cmd = 0.0;
            }
            DriveCommand::VelocityMove { velocity } => {
                drive.velocity_cmd = *velocity;
                drive.target = None;
            }
            DriveCommand::Halt => {
                drive.target = None;
                drive.velocity_cmd = 0.0;
                drive.homing = false;
            }
            DriveCommand::StartHoming => {
                drive.homing = true;
                drive.homing_attained = false;
                drive.homing_countdown = homing_latency;
            }
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
