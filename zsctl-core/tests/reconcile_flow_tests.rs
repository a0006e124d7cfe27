//! Reconciliation flow tests
//!
//! These tests drive full startup/shutdown sequences against recording
//! doubles and verify step ordering, verification gating and the
//! abort-on-first-failure discipline.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use zsctl_core::error::{ProcessError, ReconcileError, UnitError, ZsctlError};
use zsctl_core::types::{ClientTopology, ProcessIdentity, ReconcileAction, ServiceUnit, VpnStatus};
use zsctl_core::vpn::{ProcessProbe, Reconciler, UnitSupervisor};

type CallLog = Rc<RefCell<Vec<String>>>;

/// Probe double with a fixed running set and a scripted convergence answer
struct ScriptedProbe {
    running: HashSet<ProcessIdentity>,
    converges: bool,
    log: CallLog,
}

impl ScriptedProbe {
    fn new(running: &[&str], converges: bool, log: CallLog) -> Self {
        Self {
            running: running.iter().map(|b| ProcessIdentity::from(*b)).collect(),
            converges,
            log,
        }
    }
}

fn join(identities: &[ProcessIdentity]) -> String {
    identities
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl ProcessProbe for ScriptedProbe {
    fn is_running(&self, identity: &ProcessIdentity) -> Result<bool, ProcessError> {
        Ok(self.running.contains(identity))
    }

    fn wait_until_all_running(
        &self,
        identities: &[ProcessIdentity],
    ) -> Result<bool, ProcessError> {
        self.log
            .borrow_mut()
            .push(format!("wait-all {}", join(identities)));
        Ok(self.converges)
    }

    fn wait_until_none_running(
        &self,
        identities: &[ProcessIdentity],
    ) -> Result<bool, ProcessError> {
        self.log
            .borrow_mut()
            .push(format!("wait-none {}", join(identities)));
        Ok(self.converges)
    }
}

/// Supervisor double recording every call, with scripted query answers
struct ScriptedSupervisor {
    enabled_answer: bool,
    disabled_answer: bool,
    log: CallLog,
}

impl UnitSupervisor for ScriptedSupervisor {
    fn is_enabled(&self, unit: &ServiceUnit) -> Result<bool, UnitError> {
        self.log.borrow_mut().push(format!("is_enabled {unit}"));
        Ok(self.enabled_answer)
    }

    fn is_disabled(&self, unit: &ServiceUnit) -> Result<bool, UnitError> {
        self.log.borrow_mut().push(format!("is_disabled {unit}"));
        Ok(self.disabled_answer)
    }

    fn enable(&self, unit: &ServiceUnit) -> Result<(), UnitError> {
        self.log.borrow_mut().push(format!("enable {unit}"));
        Ok(())
    }

    fn disable(&self, unit: &ServiceUnit) -> Result<(), UnitError> {
        self.log.borrow_mut().push(format!("disable {unit}"));
        Ok(())
    }

    fn start(&self, unit: &ServiceUnit) -> Result<(), UnitError> {
        self.log.borrow_mut().push(format!("start {unit}"));
        Ok(())
    }

    fn stop(&self, unit: &ServiceUnit) -> Result<(), UnitError> {
        self.log.borrow_mut().push(format!("stop {unit}"));
        Ok(())
    }
}

const TRAY: &str = "/opt/zscaler/bin/ZSTray";
const DAEMON: &str = "/opt/zscaler/bin/zsaservice";
const TUNNEL: &str = "/opt/zscaler/bin/zstunnel";

fn reconciler(
    running: &[&str],
    converges: bool,
    enabled_answer: bool,
    disabled_answer: bool,
) -> (Reconciler<ScriptedProbe, ScriptedSupervisor>, CallLog) {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let probe = ScriptedProbe::new(running, converges, Rc::clone(&log));
    let supervisor = ScriptedSupervisor {
        enabled_answer,
        disabled_answer,
        log: Rc::clone(&log),
    };
    (
        Reconciler::new(probe, supervisor, ClientTopology::zscaler()),
        log,
    )
}

fn step_of(err: ZsctlError) -> String {
    match err {
        ZsctlError::Reconcile(ReconcileError::StepFailed { step }) => step,
        other => panic!("expected StepFailed, got: {other}"),
    }
}

#[test]
fn test_startup_sequence_order_and_no_teardown_calls() {
    let (reconciler, log) = reconciler(&[], true, true, false);

    let action = reconciler.reconcile(VpnStatus::AllRunning).unwrap();

    assert_eq!(action, ReconcileAction::Startup);
    assert_eq!(
        *log.borrow(),
        vec![
            "enable zsaservice.service".to_string(),
            "is_enabled zsaservice.service".to_string(),
            "start zsaservice.service".to_string(),
            format!("wait-all {DAEMON},{TUNNEL}"),
            "start ZSTray.service".to_string(),
            format!("wait-all {TRAY}"),
        ]
    );
    assert!(!log
        .borrow()
        .iter()
        .any(|call| call.starts_with("stop") || call.starts_with("disable")));
}

#[test]
fn test_startup_from_half_running_client() {
    let (reconciler, log) = reconciler(&[DAEMON], true, true, false);

    let action = reconciler.reconcile(VpnStatus::AllRunning).unwrap();

    assert_eq!(action, ReconcileAction::Startup);
    assert!(log
        .borrow()
        .iter()
        .any(|call| call == "enable zsaservice.service"));
}

#[test]
fn test_shutdown_sequence_mirrors_startup() {
    let (reconciler, log) = reconciler(&[TRAY, DAEMON, TUNNEL], true, false, true);

    let action = reconciler.reconcile(VpnStatus::NoneRunning).unwrap();

    assert_eq!(action, ReconcileAction::Shutdown);
    assert_eq!(
        *log.borrow(),
        vec![
            "stop ZSTray.service".to_string(),
            format!("wait-none {TRAY}"),
            "stop zsaservice.service".to_string(),
            format!("wait-none {DAEMON},{TUNNEL}"),
            "disable zsaservice.service".to_string(),
            "is_disabled zsaservice.service".to_string(),
        ]
    );
    assert!(!log
        .borrow()
        .iter()
        .any(|call| call.starts_with("enable") || call.starts_with("start")));
}

#[test]
fn test_startup_aborts_when_enable_verification_fails() {
    let (reconciler, log) = reconciler(&[], true, false, false);

    let err = reconciler.reconcile(VpnStatus::AllRunning).unwrap_err();

    assert_eq!(step_of(err), "enable zsaservice.service");
    // Sequence aborted before any start was attempted
    assert!(!log.borrow().iter().any(|call| call.starts_with("start")));
}

#[test]
fn test_startup_aborts_when_daemon_processes_never_converge() {
    let (reconciler, log) = reconciler(&[], false, true, false);

    let err = reconciler.reconcile(VpnStatus::AllRunning).unwrap_err();

    assert_eq!(step_of(err), "start zsaservice.service");
    assert!(!log
        .borrow()
        .iter()
        .any(|call| call == "start ZSTray.service"));
}

#[test]
fn test_shutdown_aborts_when_tray_keeps_running() {
    let (reconciler, log) = reconciler(&[TRAY, DAEMON, TUNNEL], false, false, true);

    let err = reconciler.reconcile(VpnStatus::NoneRunning).unwrap_err();

    assert_eq!(step_of(err), "stop ZSTray.service");
    assert!(!log
        .borrow()
        .iter()
        .any(|call| call == "stop zsaservice.service"));
}

#[test]
fn test_noop_when_already_reconciled() {
    let (reconciler, log) = reconciler(&[TRAY, DAEMON, TUNNEL], true, true, false);

    let action = reconciler.reconcile(VpnStatus::AllRunning).unwrap();

    assert_eq!(action, ReconcileAction::NoOp);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_mixed_target_is_rejected_before_any_side_effect() {
    let (reconciler, log) = reconciler(&[TRAY], true, true, true);

    let err = reconciler.reconcile(VpnStatus::SomeRunning).unwrap_err();

    assert!(matches!(
        err,
        ZsctlError::Reconcile(ReconcileError::UnsupportedTransition { .. })
    ));
    assert!(log.borrow().is_empty());
}
