//! Per-axis safety state machine.
//!
//! Command-driven transitions go through `handle_event` at the drain
//! point; poll-driven transitions (drive ready, fault bits, homing
//! attained) go through `apply_status`; transient timeouts are
//! advanced once per cycle by `tick_transient`. Exactly one logical
//! writer touches the machine per cycle.

use sdc_common::command::CommandKind;
use sdc_common::drive::StatusWord;
use sdc_common::error::AxisErrorCode;
use sdc_common::state::AxisMode;

/// Result of a command-driven transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// State changed (or was re-entered).
    Ok(AxisMode),
    /// Transition rejected, state unchanged.
    Rejected(&'static str),
}

/// Events that drive command-side transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisEvent {
    /// Admitted Enable command.
    EnableRequested,
    /// Admitted Disable command. Also acknowledges a fault.
    DisableRequested,
    /// Admitted SetHome on an axis configured for drive homing.
    HomeRequested,
    /// Admitted Hold. Aborts an in-progress homing.
    HoldRequested,
}

/// Counts cycles spent in a transient state for timeout detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransientTracker {
    cycles: u32,
}

impl TransientTracker {
    pub const fn new() -> Self {
        Self { cycles: 0 }
    }

    pub fn reset(&mut self) {
        self.cycles = 0;
    }

    pub fn tick(&mut self) {
        self.cycles = self.cycles.saturating_add(1);
    }

    pub const fn timed_out(&self, timeout_cycles: u32) -> bool {
        timeout_cycles > 0 && self.cycles >= timeout_cycles
    }
}

/// Per-axis safety state machine.
#[derive(Debug, Clone)]
pub struct AxisStateMachine {
    mode: AxisMode,
    transient: TransientTracker,
    /// Cause of the last Fault entry. Cleared on acknowledgment.
    pub last_error: Option<AxisErrorCode>,
    /// Set once a SetHome has completed on this axis.
    pub is_homed: bool,
}

impl AxisStateMachine {
    pub const fn new() -> Self {
        Self {
            mode: AxisMode::Disabled,
            transient: TransientTracker::new(),
            last_error: None,
            is_homed: false,
        }
    }

    #[inline]
    pub const fn mode(&self) -> AxisMode {
        self.mode
    }

    /// Pure admission predicate used by the dispatcher.
    pub const fn can_accept(&self, kind: CommandKind) -> bool {
        mode_accepts(self.mode, kind)
    }

    /// Handle a command-driven event.
    pub fn handle_event(&mut self, event: AxisEvent) -> Transition {
        use AxisEvent::*;
        use AxisMode::*;

        match (self.mode, event) {
            (Disabled, EnableRequested) => {
                self.mode = Enabling;
                self.transient.reset();
                Transition::Ok(Enabling)
            }
            // Already powered: Enable is idempotent.
            (Enabled, EnableRequested) => Transition::Ok(Enabled),
            (Fault, EnableRequested) => {
                Transition::Rejected("fault must be acknowledged by Disable first")
            }
            (_, EnableRequested) => Transition::Rejected("enable sequence already in progress"),

            // Disable is the safety escape hatch: admitted from every
            // state, clears a latched fault.
            (_, DisableRequested) => {
                self.mode = Disabled;
                self.last_error = None;
                self.transient.reset();
                Transition::Ok(Disabled)
            }

            (Enabled, HomeRequested) => {
                self.mode = Homing;
                self.transient.reset();
                Transition::Ok(Homing)
            }
            (_, HomeRequested) => Transition::Rejected("homing requires an enabled axis"),

            (Enabled, HoldRequested) => Transition::Ok(Enabled),
            (Homing, HoldRequested) => {
                // Abort homing; the axis stays powered.
                self.mode = Enabled;
                self.transient.reset();
                Transition::Ok(Enabled)
            }
            (_, HoldRequested) => Transition::Rejected("hold requires an enabled axis"),
        }
    }

    /// Apply a freshly read status word. Returns the new mode if a
    /// poll-driven transition fired.
    pub fn apply_status(&mut self, status: StatusWord) -> Option<AxisMode> {
        use AxisMode::*;

        if status.has_fault() && self.mode != Fault {
            self.fault(AxisErrorCode::DriveFault);
            return Some(Fault);
        }

        match self.mode {
            Enabling if status.is_operational() => {
                self.mode = Enabled;
                self.transient.reset();
                Some(Enabled)
            }
            Homing if status.contains(StatusWord::HOMING_ATTAINED) => {
                self.mode = Enabled;
                self.is_homed = true;
                self.transient.reset();
                Some(Enabled)
            }
            // A drive that drops out of operation without a fault bit
            // (e.g. external STO) is treated as a drive fault.
            Enabled if !status.is_operational() => {
                self.fault(AxisErrorCode::DriveFault);
                Some(Fault)
            }
            _ => None,
        }
    }

    /// Advance the transient timeout by one cycle. Returns `Fault` if
    /// the configured timeout elapsed.
    pub fn tick_transient(
        &mut self,
        enable_timeout_cycles: u32,
        homing_timeout_cycles: u32,
    ) -> Option<AxisMode> {
        match self.mode {
            AxisMode::Enabling => {
                self.transient.tick();
                if self.transient.timed_out(enable_timeout_cycles) {
                    self.fault(AxisErrorCode::EnableTimeout);
                    return Some(AxisMode::Fault);
                }
                None
            }
            AxisMode::Homing => {
                self.transient.tick();
                if self.transient.timed_out(homing_timeout_cycles) {
                    self.fault(AxisErrorCode::HomingTimeout);
                    return Some(AxisMode::Fault);
                }
                None
            }
            _ => None,
        }
    }

    /// Force Fault from a transport read/write failure.
    pub fn force_comm_fault(&mut self) {
        self.fault(AxisErrorCode::CommunicationError);
    }

    fn fault(&mut self, code: AxisErrorCode) {
        self.mode = AxisMode::Fault;
        self.last_error = Some(code);
        self.transient.reset();
    }
}

impl Default for AxisStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether an axis in `mode` admits a command of `kind`.
///
/// Also usable against published mode snapshots, where no machine
/// instance is at hand.
pub const fn mode_accepts(mode: AxisMode, kind: CommandKind) -> bool {
    use AxisMode::*;
    match kind {
        CommandKind::Disable | CommandKind::SetProfile => true,
        CommandKind::Enable => matches!(mode, Disabled | Enabled),
        CommandKind::PositionAbsolute
        | CommandKind::PositionRelative
        | CommandKind::Velocity => matches!(mode, Enabled),
        CommandKind::Hold => matches!(mode, Enabled | Homing),
        CommandKind::SetHome => matches!(mode, Disabled | Enabled),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use AxisEvent::*;
    use AxisMode::*;

    fn operational() -> StatusWord {
        StatusWord::READY_TO_SWITCH_ON
            | StatusWord::SWITCHED_ON
            | StatusWord::OPERATION_ENABLED
            | StatusWord::VOLTAGE_ENABLED
    }

    #[test]
    fn initial_state_is_disabled() {
        let sm = AxisStateMachine::new();
        assert_eq!(sm.mode(), Disabled);
        assert!(sm.last_error.is_none());
        assert!(!sm.is_homed);
    }

    #[test]
    fn enable_starts_enabling_and_ready_completes_it() {
        let mut sm = AxisStateMachine::new();
        assert_eq!(sm.handle_event(EnableRequested), Transition::Ok(Enabling));
        assert_eq!(sm.apply_status(operational()), Some(Enabled));
        assert_eq!(sm.mode(), Enabled);
    }

    #[test]
    fn enable_rejected_while_faulted() {
        let mut sm = AxisStateMachine::new();
        sm.force_comm_fault();
        assert!(matches!(
            sm.handle_event(EnableRequested),
            Transition::Rejected(_)
        ));
        assert_eq!(sm.mode(), Fault);
    }

    #[test]
    fn disable_admitted_from_every_state() {
        for mode in [Disabled, Enabling, Enabled, Homing, Fault] {
            let mut sm = AxisStateMachine::new();
            match mode {
                Disabled => {}
                Enabling => {
                    sm.handle_event(EnableRequested);
                }
                Enabled => {
                    sm.handle_event(EnableRequested);
                    sm.apply_status(operational());
                }
                Homing => {
                    sm.handle_event(EnableRequested);
                    sm.apply_status(operational());
                    sm.handle_event(HomeRequested);
                }
                Fault => sm.force_comm_fault(),
            }
            assert_eq!(sm.mode(), mode);
            assert_eq!(sm.handle_event(DisableRequested), Transition::Ok(Disabled));
            assert!(sm.last_error.is_none(), "Disable must clear the fault");
        }
    }

    #[test]
    fn fault_then_disable_then_enable_recovers() {
        let mut sm = AxisStateMachine::new();
        sm.force_comm_fault();
        sm.handle_event(DisableRequested);
        assert_eq!(sm.handle_event(EnableRequested), Transition::Ok(Enabling));
    }

    #[test]
    fn drive_fault_bit_faults_any_mode() {
        for setup in [Disabled, Enabling, Enabled, Homing] {
            let mut sm = AxisStateMachine::new();
            match setup {
                Disabled => {}
                Enabling => {
                    sm.handle_event(EnableRequested);
                }
                Enabled => {
                    sm.handle_event(EnableRequested);
                    sm.apply_status(operational());
                }
                Homing => {
                    sm.handle_event(EnableRequested);
                    sm.apply_status(operational());
                    sm.handle_event(HomeRequested);
                }
                Fault => unreachable!(),
            }
            assert_eq!(sm.apply_status(StatusWord::FAULT), Some(Fault));
            assert_eq!(sm.last_error, Some(AxisErrorCode::DriveFault));
        }
    }

    #[test]
    fn enable_timeout_faults() {
        let mut sm = AxisStateMachine::new();
        sm.handle_event(EnableRequested);
        for _ in 0..9 {
            assert_eq!(sm.tick_transient(10, 10), None);
        }
        assert_eq!(sm.tick_transient(10, 10), Some(Fault));
        assert_eq!(sm.last_error, Some(AxisErrorCode::EnableTimeout));
    }

    #[test]
    fn homing_completes_on_attained_bit() {
        let mut sm = AxisStateMachine::new();
        sm.handle_event(EnableRequested);
        sm.apply_status(operational());
        sm.handle_event(HomeRequested);
        assert_eq!(sm.mode(), Homing);
        assert_eq!(
            sm.apply_status(operational() | StatusWord::HOMING_ATTAINED),
            Some(Enabled)
        );
        assert!(sm.is_homed);
    }

    #[test]
    fn homing_timeout_faults() {
        let mut sm = AxisStateMachine::new();
        sm.handle_event(EnableRequested);
        sm.apply_status(operational());
        sm.handle_event(HomeRequested);
        for _ in 0..5 {
            sm.tick_transient(10, 5);
        }
        assert_eq!(sm.mode(), Fault);
        assert_eq!(sm.last_error, Some(AxisErrorCode::HomingTimeout));
    }

    #[test]
    fn hold_aborts_homing() {
        let mut sm = AxisStateMachine::new();
        sm.handle_event(EnableRequested);
        sm.apply_status(operational());
        sm.handle_event(HomeRequested);
        assert_eq!(sm.handle_event(HoldRequested), Transition::Ok(Enabled));
        assert!(!sm.is_homed);
    }

    #[test]
    fn dropout_without_fault_bit_is_drive_fault() {
        let mut sm = AxisStateMachine::new();
        sm.handle_event(EnableRequested);
        sm.apply_status(operational());
        assert_eq!(
            sm.apply_status(StatusWord::READY_TO_SWITCH_ON),
            Some(Fault)
        );
        assert_eq!(sm.last_error, Some(AxisErrorCode::DriveFault));
    }

    #[test]
    fn can_accept_matrix() {
        use CommandKind::*;
        let mut sm = AxisStateMachine::new();
        // Disabled
        assert!(sm.can_accept(Enable));
        assert!(sm.can_accept(Disable));
        assert!(sm.can_accept(SetHome));
        assert!(sm.can_accept(SetProfile));
        assert!(!sm.can_accept(PositionAbsolute));
        assert!(!sm.can_accept(Hold));
        // Enabled
        sm.handle_event(AxisEvent::EnableRequested);
        sm.apply_status(operational());
        assert!(sm.can_accept(PositionAbsolute));
        assert!(sm.can_accept(Velocity));
        assert!(sm.can_accept(Hold));
        assert!(sm.can_accept(SetHome));
        // Fault
        sm.force_comm_fault();
        assert!(sm.can_accept(Disable));
        assert!(!sm.can_accept(Enable));
        assert!(!sm.can_accept(PositionAbsolute));
        assert!(!sm.can_accept(SetHome));
    }

    #[test]
    fn transient_tracker_timeout() {
        let mut t = TransientTracker::new();
        assert!(!t.timed_out(3));
        t.tick();
        t.tick();
        t.tick();
        assert!(t.timed_out(3));
        assert!(!t.timed_out(4));
        t.reset();
        assert!(!t.timed_out(3));
    }
}
