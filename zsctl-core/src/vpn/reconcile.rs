//! State reconciliation for the ZScaler client
//!
//! Decides the action required to move the observed client status to the
//! desired one and drives the ordered startup/shutdown sequence, verifying
//! every step against observable OS state before proceeding.
//!
//! Ordering matters: the GUI depends on the daemon's tunnel, so startup
//! brings the daemon up first and shutdown tears the GUI down first.

use tracing::info;

use crate::error::{ReconcileError, Result};
use crate::types::{ClientTopology, ProcessIdentity, ReconcileAction, VpnStatus};
use crate::vpn::observer::ProcessProbe;
use crate::vpn::status::classify;
use crate::vpn::supervisor::UnitSupervisor;

/// Transition function of the status lattice
///
/// Total over every (current, desired) pair except desired `SomeRunning`,
/// which is only ever an observed status and never a valid target.
pub fn decide(
    current: VpnStatus,
    desired: VpnStatus,
) -> std::result::Result<ReconcileAction, ReconcileError> {
    if current == desired {
        return Ok(ReconcileAction::NoOp);
    }

    match desired {
        VpnStatus::AllRunning => Ok(ReconcileAction::Startup),
        VpnStatus::NoneRunning => Ok(ReconcileAction::Shutdown),
        VpnStatus::SomeRunning => Err(ReconcileError::UnsupportedTransition {
            current: current.to_string(),
            desired: desired.to_string(),
        }),
    }
}

/// Drives startup/shutdown sequences over injected capabilities
pub struct Reconciler<P: ProcessProbe, U: UnitSupervisor> {
    probe: P,
    supervisor: U,
    topology: ClientTopology,
}

impl<P: ProcessProbe, U: UnitSupervisor> Reconciler<P, U> {
    /// Create a reconciler over the given capabilities and client topology
    pub fn new(probe: P, supervisor: U, topology: ClientTopology) -> Self {
        Self {
            probe,
            supervisor,
            topology,
        }
    }

    /// Sample and classify the current client status
    pub fn current_status(&self) -> Result<VpnStatus> {
        Ok(classify(&self.probe, &self.topology.tracked_processes())?)
    }

    /// Reconcile the observed status against `desired`
    ///
    /// Returns the action that was taken. Aborts with the failing step on
    /// the first verification failure.
    pub fn reconcile(&self, desired: VpnStatus) -> Result<ReconcileAction> {
        let current = self.current_status()?;
        let action = decide(current, desired)?;

        match action {
            ReconcileAction::NoOp => {
                info!("nothing to reconcile, client is already {current}");
            }
            ReconcileAction::Startup => self.startup()?,
            ReconcileAction::Shutdown => self.shutdown()?,
        }

        Ok(action)
    }

    fn step_failed(step: impl Into<String>) -> ReconcileError {
        ReconcileError::StepFailed { step: step.into() }
    }

    /// Ordered startup: daemon unit enabled and started (with its tunnel)
    /// before the GUI, each step verified before the next
    fn startup(&self) -> Result<()> {
        let topology = &self.topology;
        let daemon_processes: [ProcessIdentity; 2] =
            [topology.daemon.clone(), topology.tunnel.clone()];

        info!("enabling {:?} systemd unit as root", topology.daemon_unit.name);
        self.supervisor.enable(&topology.daemon_unit)?;
        if !self.supervisor.is_enabled(&topology.daemon_unit)? {
            return Err(Self::step_failed(format!("enable {}", topology.daemon_unit)).into());
        }

        info!("starting {:?} systemd unit as root", topology.daemon_unit.name);
        self.supervisor.start(&topology.daemon_unit)?;
        if !self.probe.wait_until_all_running(&daemon_processes)? {
            return Err(Self::step_failed(format!("start {}", topology.daemon_unit)).into());
        }

        info!("starting {:?} systemd unit as user", topology.gui_unit.name);
        self.supervisor.start(&topology.gui_unit)?;
        if !self.probe.wait_until_all_running(&[topology.tray.clone()])? {
            return Err(Self::step_failed(format!("start {}", topology.gui_unit)).into());
        }

        info!("zscaler correctly started");
        Ok(())
    }

    /// Ordered shutdown, the mirror of startup so no dependent process is
    /// left orphaned
    fn shutdown(&self) -> Result<()> {
        let topology = &self.topology;
        let daemon_processes: [ProcessIdentity; 2] =
            [topology.daemon.clone(), topology.tunnel.clone()];

        info!("stopping {:?} systemd unit as user", topology.gui_unit.name);
        self.supervisor.stop(&topology.gui_unit)?;
        if !self.probe.wait_until_none_running(&[topology.tray.clone()])? {
            return Err(Self::step_failed(format!("stop {}", topology.gui_unit)).into());
        }

        info!("stopping {:?} systemd unit as root", topology.daemon_unit.name);
        self.supervisor.stop(&topology.daemon_unit)?;
        if !self.probe.wait_until_none_running(&daemon_processes)? {
            return Err(Self::step_failed(format!("stop {}", topology.daemon_unit)).into());
        }

        info!("disabling {:?} systemd unit as root", topology.daemon_unit.name);
        self.supervisor.disable(&topology.daemon_unit)?;
        if !self.supervisor.is_disabled(&topology.daemon_unit)? {
            return Err(Self::step_failed(format!("disable {}", topology.daemon_unit)).into());
        }

        info!("zscaler correctly stopped");
        Ok(())
    }
}
