//! Desktop notification collaborator
//!
//! Invokes the configured notifier binary with a single message argument.
//! Fire-and-forget: a broken notifier never takes the watcher down.

use std::process::Command;

use tracing::{debug, warn};

use crate::config::WatchConfig;

/// Send a notification message through the configured binary
pub fn notify(config: &WatchConfig, msg: &str) {
    debug!("notifying via {:?}: {msg:?}", config.notification_bin);

    match Command::new(&config.notification_bin).arg(msg).status() {
        Ok(status) if !status.success() => {
            warn!(
                "notifier {:?} exited with {status}",
                config.notification_bin
            );
        }
        Ok(_) => {}
        Err(e) => {
            warn!("failed to run notifier {:?}: {e}", config.notification_bin);
        }
    }
}
