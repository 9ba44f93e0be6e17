//! Fixed-period polling cycle.
//!
//! Each cycle: drain admitted commands, poll every axis through the
//! transport, advance transient timeouts, reduce the operating state,
//! and publish the snapshot. A command admitted in cycle N is executed
//! before cycle N's poll reads, so its effect is visible to the state
//! read that begins the cycle. No error terminates the loop; a
//! malfunctioning axis degrades to Fault and the loop continues.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use sdc_common::command::Command;
use sdc_common::config::ControllerConfig;
use sdc_common::event::ControllerEvent;
use sdc_common::joint::StateSnapshot;
use sdc_common::state::{AxisMode, OperatingState};
use tracing::{debug, info, warn};

use crate::axis_map::AxisMap;
use crate::dispatch;
use crate::publish::StatePublisher;
use crate::state::AxisStates;
use crate::state::operating;
use crate::transport::Transport;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) running timing statistics over all executed cycles.
#[derive(Debug, Clone)]
pub struct CycleStats {
    pub cycles: u64,
    pub overruns: u64,
    pub min_exec_ns: u64,
    pub max_exec_ns: u64,
    total_exec_ns: u128,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycles: 0,
            overruns: 0,
            min_exec_ns: u64::MAX,
            max_exec_ns: 0,
            total_exec_ns: 0,
        }
    }

    /// Record one cycle's execution time. Returns true on overrun.
    pub fn record(&mut self, exec_ns: u64, period_ns: u64) -> bool {
        self.cycles += 1;
        self.min_exec_ns = self.min_exec_ns.min(exec_ns);
        self.max_exec_ns = self.max_exec_ns.max(exec_ns);
        self.total_exec_ns += exec_ns as u128;
        let overrun = exec_ns > period_ns;
        if overrun {
            self.overruns += 1;
        }
        overrun
    }

    pub fn avg_exec_ns(&self) -> u64 {
        if self.cycles == 0 {
            0
        } else {
            (self.total_exec_ns / self.cycles as u128) as u64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns everything the polling loop touches: transport, axis states,
/// axis map, the command queue receiver, and the publisher.
pub struct CycleRunner<T: Transport> {
    period: Duration,
    enable_timeout_cycles: u32,
    homing_timeout_cycles: u32,
    transport: T,
    axes: AxisStates,
    map: AxisMap,
    commands: Receiver<Command>,
    publisher: StatePublisher,
    pub stats: CycleStats,
    cycle: u64,
    last_operating: OperatingState,
}

impl<T: Transport> CycleRunner<T> {
    /// Build a runner from a validated configuration.
    pub fn new(
        config: &ControllerConfig,
        transport: T,
        commands: Receiver<Command>,
        publisher: StatePublisher,
    ) -> Self {
        let period = Duration::from_micros(config.poll_period_us);
        let axes = AxisStates::from_config(&config.axes);
        let map = AxisMap::from_config(&config.axes);
        let last_operating = operating::operating_state(&axes);
        Self {
            period,
            enable_timeout_cycles: timeout_cycles(config.enable_timeout, config.poll_period_us),
            homing_timeout_cycles: timeout_cycles(config.homing_timeout, config.poll_period_us),
            transport,
            axes,
            map,
            commands,
            publisher,
            stats: CycleStats::new(),
            cycle: 0,
            last_operating,
        }
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Direct transport access, for tests and benches.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Run until `running` is cleared, pacing with the configured
    /// period. Overruns are counted and logged, never fatal.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            transport = self.transport.name(),
            axes = self.axes.count(),
            period_us = self.period.as_micros() as u64,
            "entering polling loop"
        );
        let mut next = Instant::now() + self.period;
        while running.load(Ordering::SeqCst) {
            let start = Instant::now();
            self.tick();
            let exec_ns = start.elapsed().as_nanos() as u64;
            if self.stats.record(exec_ns, self.period.as_nanos() as u64) {
                warn!(
                    cycle = self.cycle,
                    exec_ns,
                    period_ns = self.period.as_nanos() as u64,
                    "cycle overrun"
                );
            }
            let now = Instant::now();
            if next > now {
                std::thread::sleep(next - now);
            }
            next += self.period;
            // Fell more than a full period behind: resynchronize
            // instead of bursting catch-up cycles.
            let now = Instant::now();
            if next < now {
                next = now + self.period;
            }
        }
        info!(
            cycles = self.stats.cycles,
            overruns = self.stats.overruns,
            avg_exec_ns = self.stats.avg_exec_ns(),
            "polling loop stopped"
        );
    }

    /// One complete cycle: drain, poll, advance timeouts, publish.
    pub fn tick(&mut self) {
        self.drain_commands();
        self.poll_axes();
        self.advance_transients();
        self.publish();
        self.cycle += 1;
    }

    /// Phase 1: apply every queued command against authoritative state.
    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.commands.try_recv() {
            let modes = self.axes.modes();
            match dispatch::admit(&cmd, &modes) {
                Ok(()) => {
                    debug!(command = dispatch::describe_kind(cmd.kind()), "executing");
                    dispatch::execute(
                        &cmd,
                        &mut self.axes,
                        &mut self.map,
                        &mut self.transport,
                        &self.publisher,
                    );
                }
                Err(e) => {
                    // Admitted at submit time but the state moved on
                    // before the drain; drop and report.
                    warn!(
                        command = dispatch::describe_kind(cmd.kind()),
                        "command dropped at drain: {e}"
                    );
                    self.publisher.emit(ControllerEvent::warning(format!(
                        "{} dropped: {e}",
                        dispatch::describe_kind(cmd.kind())
                    )));
                }
            }
        }
    }

    /// Phase 2: read every node, isolating per-axis failures.
    fn poll_axes(&mut self) {
        for i in 0..self.axes.count() {
            let node = self.map.node_id(i);
            match self.transport.read_registers(node) {
                Ok(regs) => {
                    let Some(ax) = self.axes.get_mut(i) else {
                        continue;
                    };
                    ax.raw_position = regs.position;
                    ax.measured_position = self.map.to_joint_position(i, regs.position);
                    ax.measured_velocity = self.map.to_joint_velocity(i, regs.velocity);
                    ax.actuator.current = regs.current;
                    ax.actuator.status_raw = regs.status.bits();
                    ax.actuator.digital_inputs = regs.digital_inputs;

                    if let Some(new_mode) = ax.machine.apply_status(regs.status) {
                        match new_mode {
                            AxisMode::Fault => {
                                let label = ax
                                    .machine
                                    .last_error
                                    .map(|c| c.label())
                                    .unwrap_or("fault");
                                warn!(axis = i, node, "axis faulted: {label}");
                                self.publisher.emit(ControllerEvent::error(format!(
                                    "axis {i}: {label}"
                                )));
                            }
                            AxisMode::Enabled => {
                                info!(axis = i, node, "axis enabled");
                                self.publisher.emit(ControllerEvent::status(format!(
                                    "axis {i} ready"
                                )));
                            }
                            _ => {}
                        }
                    }
                }
                Err(e) => {
                    let Some(ax) = self.axes.get_mut(i) else {
                        continue;
                    };
                    // One axis's failure never blocks the others; the
                    // next cycle is itself the retry.
                    if ax.mode() != AxisMode::Fault {
                        ax.machine.force_comm_fault();
                        warn!(axis = i, node, "poll failed: {e}");
                        self.publisher.emit(ControllerEvent::error(format!(
                            "axis {i}: communication error: {e}"
                        )));
                    }
                }
            }
        }
    }

    /// Phase 3: advance Enabling/Homing timeout counters.
    fn advance_transients(&mut self) {
        let enable = self.enable_timeout_cycles;
        let homing = self.homing_timeout_cycles;
        for i in 0..self.axes.count() {
            let Some(ax) = self.axes.get_mut(i) else {
                continue;
            };
            if let Some(AxisMode::Fault) = ax.machine.tick_transient(enable, homing) {
                let label = ax.machine.last_error.map(|c| c.label()).unwrap_or("timeout");
                warn!(axis = i, "transient timed out: {label}");
                self.publisher
                    .emit(ControllerEvent::error(format!("axis {i}: {label}")));
            }
        }
    }

    /// Phase 4: reduce operating state, build and swap the snapshot.
    fn publish(&mut self) {
        let operating = operating::operating_state(&self.axes);
        if operating != self.last_operating {
            info!(
                from = ?self.last_operating.system_mode,
                to = ?operating.system_mode,
                "operating state changed"
            );
            self.publisher.emit(ControllerEvent::OperatingStateChanged {
                previous: self.last_operating,
                current: operating,
            });
            self.last_operating = operating;
        }

        let mut snap = StateSnapshot {
            cycle: self.cycle,
            operating,
            ..StateSnapshot::default()
        };
        for ax in self.axes.iter() {
            let _ = snap.modes.push(ax.mode());
            let _ = snap.measured.position.push(ax.measured_position);
            let _ = snap.measured.velocity.push(ax.measured_velocity);
            let _ = snap.setpoint.position.push(ax.setpoint_position);
            let _ = snap.setpoint.velocity.push(ax.setpoint_velocity);
            let _ = snap.actuators.push(ax.actuator);
            let _ = snap.errors.push(ax.machine.last_error);
        }
        self.publisher.store(snap);
    }
}

fn timeout_cycles(timeout_s: f64, period_us: u64) -> u32 {
    let cycles = (timeout_s * 1_000_000.0 / period_us as f64).ceil();
    (cycles as u32).max(1)
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{Sender, unbounded};
    use sdc_common::command::goal_from_slice;
    use sdc_common::config::{AxisConfig, HomeReference};
    use sdc_common::drive::ProfileParams;
    use sdc_common::state::SystemMode;

    use crate::publish::StateHandle;
    use crate::transport::SimTransport;

    fn config(n: usize) -> ControllerConfig {
        ControllerConfig {
            poll_period_us: 1000,
            enable_timeout: 0.02,
            homing_timeout: 0.05,
            axes: (0..n)
                .map(|i| AxisConfig {
                    node_id: i as u8 + 1,
                    name: format!("axis{i}"),
                    position_offset: 0.0,
                    position_scale: 1.0,
                    home_reference: HomeReference::SetZero,
                    profile: ProfileParams {
                        velocity: 1000.0,
                        ..Default::default()
                    },
                })
                .collect(),
        }
    }

    fn build(n: usize) -> (CycleRunner<SimTransport>, Sender<Command>, StateHandle) {
        let cfg = config(n);
        let nodes: Vec<u8> = cfg.axes.iter().map(|a| a.node_id).collect();
        let transport = SimTransport::new(&nodes).with_enable_latency(2);
        let (tx, rx) = unbounded();
        let publisher = StatePublisher::new(StateSnapshot::initial(n));
        let handle = publisher.handle();
        (CycleRunner::new(&cfg, transport, rx, publisher), tx, handle)
    }

    fn enable_all(runner: &mut CycleRunner<SimTransport>, tx: &Sender<Command>) {
        tx.send(Command::Enable).unwrap();
        for _ in 0..5 {
            runner.tick();
        }
    }

    #[test]
    fn initial_snapshot_all_disabled() {
        for n in [1, 3] {
            let (mut runner, _tx, handle) = build(n);
            runner.tick();
            let snap = handle.snapshot();
            assert_eq!(snap.axis_count(), n);
            assert_eq!(snap.operating.system_mode, SystemMode::Disabled);
            assert!(snap.modes.iter().all(|m| *m == AxisMode::Disabled));
        }
    }

    #[test]
    fn enable_reaches_enabled_after_drive_ready() {
        let (mut runner, tx, handle) = build(2);
        tx.send(Command::Enable).unwrap();
        runner.tick();
        // Enable drained at start of this cycle, drives not ready yet.
        assert_eq!(
            handle.operating_state().system_mode,
            SystemMode::Disabled
        );
        for _ in 0..3 {
            runner.tick();
        }
        assert_eq!(handle.operating_state().system_mode, SystemMode::Enabled);
        assert!(handle.snapshot().modes.iter().all(|m| *m == AxisMode::Enabled));
    }

    #[test]
    fn enable_timeout_faults_axis() {
        let cfg = config(1);
        let transport = SimTransport::new(&[1]).with_enable_latency(1000);
        let (tx, rx) = unbounded();
        let publisher = StatePublisher::new(StateSnapshot::initial(1));
        let handle = publisher.handle();
        let mut runner = CycleRunner::new(&cfg, transport, rx, publisher);
        tx.send(Command::Enable).unwrap();
        // enable_timeout 0.02s at 1ms period = 20 cycles.
        for _ in 0..25 {
            runner.tick();
        }
        let snap = handle.snapshot();
        assert_eq!(snap.modes[0], AxisMode::Fault);
        assert_eq!(
            snap.errors[0],
            Some(sdc_common::error::AxisErrorCode::EnableTimeout)
        );
        assert_eq!(snap.operating.system_mode, SystemMode::Fault);
    }

    #[test]
    fn single_axis_comm_failure_is_isolated() {
        let (mut runner, tx, handle) = build(3);
        enable_all(&mut runner, &tx);
        assert_eq!(handle.operating_state().system_mode, SystemMode::Enabled);

        runner.transport_mut().set_offline(2, true);
        runner.tick();

        let snap = handle.snapshot();
        assert_eq!(snap.modes[0], AxisMode::Enabled);
        assert_eq!(snap.modes[1], AxisMode::Fault);
        assert_eq!(snap.modes[2], AxisMode::Enabled);
        assert_eq!(
            snap.errors[1],
            Some(sdc_common::error::AxisErrorCode::CommunicationError)
        );
        assert_eq!(snap.operating.system_mode, SystemMode::Fault);

        // Healthy axes keep polling.
        runner.tick();
        let snap = handle.snapshot();
        assert_eq!(snap.modes[0], AxisMode::Enabled);
    }

    #[test]
    fn disable_mid_motion_takes_one_cycle() {
        let (mut runner, tx, handle) = build(2);
        enable_all(&mut runner, &tx);
        tx.send(Command::PositionAbsolute(
            goal_from_slice(&[50.0, -50.0]).unwrap(),
        ))
        .unwrap();
        runner.tick();
        assert_eq!(handle.snapshot().setpoint.position[0], 50.0);

        tx.send(Command::Disable).unwrap();
        runner.tick();
        let snap = handle.snapshot();
        assert!(snap.modes.iter().all(|m| *m == AxisMode::Disabled));
        assert_eq!(snap.operating.system_mode, SystemMode::Disabled);
    }

    #[test]
    fn relative_moves_accumulate_on_setpoint() {
        let (mut runner, tx, handle) = build(1);
        enable_all(&mut runner, &tx);
        tx.send(Command::PositionRelative(goal_from_slice(&[2.0]).unwrap()))
            .unwrap();
        runner.tick();
        tx.send(Command::PositionRelative(goal_from_slice(&[3.0]).unwrap()))
            .unwrap();
        runner.tick();
        // Cumulative relative to the pre-command setpoint (0.0),
        // independent of measured-position noise in between.
        assert_eq!(handle.snapshot().setpoint.position[0], 5.0);
    }

    #[test]
    fn rejected_command_at_drain_is_dropped_with_warning() {
        let (mut runner, tx, handle) = build(2);
        let events = handle.subscribe();
        // Motion while disabled: invalid, must not write setpoints.
        tx.send(Command::Velocity(goal_from_slice(&[1.0, 1.0]).unwrap()))
            .unwrap();
        runner.tick();
        let snap = handle.snapshot();
        assert_eq!(snap.setpoint.velocity[0], 0.0);
        assert!(snap.modes.iter().all(|m| *m == AxisMode::Disabled));
        let saw_warning = events.try_iter().any(|e| {
            matches!(
                e,
                ControllerEvent::Message {
                    severity: sdc_common::event::Severity::Warning,
                    ..
                }
            )
        });
        assert!(saw_warning);
    }

    #[test]
    fn sethome_zeroes_measured_position() {
        let (mut runner, tx, handle) = build(1);
        enable_all(&mut runner, &tx);
        tx.send(Command::Velocity(goal_from_slice(&[10.0]).unwrap()))
            .unwrap();
        for _ in 0..10 {
            runner.tick();
        }
        let before = handle.snapshot().measured.position[0];
        assert!(before.abs() > 1e-6, "axis should have moved, got {before}");

        tx.send(Command::Hold).unwrap();
        runner.tick();
        tx.send(Command::SetHome).unwrap();
        runner.tick();
        let snap = handle.snapshot();
        assert!(
            snap.measured.position[0].abs() < 1e-6,
            "got {}",
            snap.measured.position[0]
        );
        assert!(snap.operating.is_homed);
    }

    #[test]
    fn operating_state_change_event_fires_on_fault_entry() {
        let (mut runner, tx, handle) = build(1);
        let events = handle.subscribe();
        enable_all(&mut runner, &tx);
        runner.transport_mut().inject_fault(1);
        runner.tick();

        let mut saw_fault_transition = false;
        for e in events.try_iter() {
            if let ControllerEvent::OperatingStateChanged { current, .. } = e {
                if current.system_mode == SystemMode::Fault {
                    saw_fault_transition = true;
                }
            }
        }
        assert!(saw_fault_transition);
    }

    #[test]
    fn fault_recovery_requires_disable_then_enable() {
        let (mut runner, tx, handle) = build(1);
        enable_all(&mut runner, &tx);
        runner.transport_mut().inject_fault(1);
        runner.tick();
        assert_eq!(handle.snapshot().modes[0], AxisMode::Fault);

        // Enable straight from Fault is dropped.
        tx.send(Command::Enable).unwrap();
        runner.tick();
        assert_eq!(handle.snapshot().modes[0], AxisMode::Fault);

        // Disable acknowledges (and resets the drive fault), then
        // Enable proceeds.
        tx.send(Command::Disable).unwrap();
        runner.tick();
        assert_eq!(handle.snapshot().modes[0], AxisMode::Disabled);
        assert!(handle.snapshot().errors[0].is_none());
        tx.send(Command::Enable).unwrap();
        for _ in 0..5 {
            runner.tick();
        }
        assert_eq!(handle.snapshot().modes[0], AxisMode::Enabled);
    }

    #[test]
    fn cycle_stats_record() {
        let mut stats = CycleStats::new();
        assert!(!stats.record(500, 1000));
        assert!(stats.record(1500, 1000));
        assert_eq!(stats.cycles, 2);
        assert_eq!(stats.overruns, 1);
        assert_eq!(stats.min_exec_ns, 500);
        assert_eq!(stats.max_exec_ns, 1500);
        assert_eq!(stats.avg_exec_ns(), 1000);
    }

    #[test]
    fn timeout_cycle_conversion() {
        assert_eq!(timeout_cycles(0.02, 1000), 20);
        assert_eq!(timeout_cycles(5.0, 10_000), 500);
        // Never rounds down to zero.
        assert_eq!(timeout_cycles(0.0001, 10_000), 1);
    }
}
