//! Periodic security check loop
//!
//! Samples the client status on a configured interval and raises a
//! notification while the Internet Security feature is active. Every cycle
//! re-samples live state, so the loop can run unbounded.

use std::time::Duration;

use tracing::info;

use zsctl_core::config::WatchConfig;
use zsctl_core::error::Result;
use zsctl_core::events::SecurityFeatureMonitor;
use zsctl_core::notify::notify;
use zsctl_core::types::{ClientTopology, SecurityStatus, VpnStatus};
use zsctl_core::vpn::{classify, ProcessObserver, PsProcessTable};

/// Leading command tokens ending in this are treated as an active meeting
const MEETING_BINARY_SUFFIX: &str = "zoom";

/// Run the watch subcommand
pub fn run(detach: bool, stop: bool) -> Result<()> {
    let watcher = super::process::WatcherProcess::new(super::process::default_pid_file());

    if stop {
        return watcher.stop();
    }

    // Load before daemonizing so a missing config is reported in the
    // foreground, where the user can still see it.
    let config = WatchConfig::load()?;

    if detach {
        if watcher.is_running()? {
            info!("watcher is already running");
            return Ok(());
        }
        watcher.daemonize()?;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(watch_loop(&config))
}

/// Check, sleep, repeat until interrupted
async fn watch_loop(config: &WatchConfig) -> Result<()> {
    let wait = Duration::from_secs(config.wait_between_checks);

    loop {
        check(config).await?;

        info!("waiting {}s before the next check", config.wait_between_checks);
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down watcher");
                return Ok(());
            }
        }
    }
}

/// One stateless check cycle
async fn check(config: &WatchConfig) -> Result<()> {
    let observer = ProcessObserver::new();
    let topology = ClientTopology::zscaler();

    let vpn_status = classify(&observer, &topology.tracked_processes())?;
    if vpn_status == VpnStatus::NoneRunning {
        info!("ZScaler is OFF");
        return Ok(());
    }

    let monitor = SecurityFeatureMonitor::new();
    match monitor.current_status().await? {
        // Nothing found in the DB, or the DB file itself was not found
        SecurityStatus::Unknown | SecurityStatus::Off => {}
        SecurityStatus::On => {
            if in_a_call(&observer)? {
                notify(config, "turn lights off");
            } else {
                notify(config, "Z Scaler internet security is on");
            }
        }
    }

    Ok(())
}

/// Whether a meeting client is currently among the active executables
fn in_a_call(observer: &ProcessObserver<PsProcessTable>) -> Result<bool> {
    let active = observer.active_executables()?;
    Ok(active
        .iter()
        .any(|binary| binary.as_str().ends_with(MEETING_BINARY_SUFFIX)))
}
