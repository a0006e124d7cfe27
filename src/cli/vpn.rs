//! VPN client reconciliation commands
//!
//! Maps `up`/`down`/no-subcommand onto the core reconciler.

use colored::Colorize;
use zsctl_core::error::Result;
use zsctl_core::types::{ClientTopology, VpnStatus};
use zsctl_core::vpn::{ProcessObserver, PsProcessTable, Reconciler, SystemctlClient};

/// Reconciler over the live process table and systemd
fn live_reconciler() -> Reconciler<ProcessObserver<PsProcessTable>, SystemctlClient> {
    Reconciler::new(
        ProcessObserver::new(),
        SystemctlClient::new(),
        ClientTopology::zscaler(),
    )
}

/// Run the up command: reconcile towards a fully running client
pub fn run_up() -> Result<()> {
    live_reconciler().reconcile(VpnStatus::AllRunning)?;
    Ok(())
}

/// Run the down command: reconcile towards a fully stopped client
pub fn run_down() -> Result<()> {
    live_reconciler().reconcile(VpnStatus::NoneRunning)?;
    Ok(())
}

/// Report the current client status without mutating anything
pub fn run_status() -> Result<()> {
    let status = live_reconciler().current_status()?;

    let line = match status {
        VpnStatus::AllRunning => "ZScaler is running".green(),
        VpnStatus::SomeRunning => "ZScaler is half-running".yellow(),
        VpnStatus::NoneRunning => "ZScaler is not running".red(),
    };
    println!("{}", line);

    Ok(())
}
