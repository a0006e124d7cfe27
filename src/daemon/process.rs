//! Watcher process management
//!
//! Handles daemonizing the watch loop, PID file management, and stopping a
//! detached watcher.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use daemonize::Daemonize;
use tracing::info;

use zsctl_core::error::{Result, ZsctlError};

/// Represents a detached watcher process
pub struct WatcherProcess {
    pid_file: PathBuf,
}

fn io_error(message: String) -> ZsctlError {
    ZsctlError::Io(std::io::Error::other(message))
}

impl WatcherProcess {
    /// Create a new watcher process manager
    pub fn new(pid_file: PathBuf) -> Self {
        Self { pid_file }
    }

    /// Check if a detached watcher is already running
    pub fn is_running(&self) -> Result<bool> {
        if !self.pid_file.exists() {
            return Ok(false);
        }

        let pid = self.pid()?;

        match nix::unistd::getpgid(Some(nix::unistd::Pid::from_raw(pid))) {
            Ok(_) => Ok(true),
            Err(nix::errno::Errno::ESRCH) => {
                // Process doesn't exist, clean up the stale PID file
                let _ = fs::remove_file(&self.pid_file);
                Ok(false)
            }
            Err(e) => Err(io_error(format!("failed to check watcher status: {e}"))),
        }
    }

    /// Daemonize the current process
    pub fn daemonize(&self) -> Result<()> {
        if let Some(parent) = self.pid_file.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| io_error(format!("failed to create PID file directory: {e}")))?;
        }

        let daemonize = Daemonize::new()
            .pid_file(&self.pid_file)
            .chown_pid_file(true)
            .working_directory(
                std::env::current_dir()
                    .map_err(|e| io_error(format!("failed to get current directory: {e}")))?,
            )
            .umask(0o027);

        daemonize
            .start()
            .map_err(|e| io_error(format!("failed to daemonize watcher: {e}")))?;

        info!("successfully daemonized watcher, PID: {}", process::id());
        Ok(())
    }

    /// Read the PID of the detached watcher
    fn pid(&self) -> Result<i32> {
        let pid_content = fs::read_to_string(&self.pid_file)
            .map_err(|e| io_error(format!("failed to read PID file: {e}")))?;

        pid_content
            .trim()
            .parse()
            .map_err(|_| io_error("invalid PID in PID file".to_string()))
    }

    /// Stop the detached watcher
    pub fn stop(&self) -> Result<()> {
        if !self.pid_file.exists() {
            info!("no watcher PID file found, nothing to stop");
            return Ok(());
        }

        let pid = self.pid()?;

        nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(pid),
            nix::sys::signal::Signal::SIGTERM,
        )
        .map_err(|e| io_error(format!("failed to send SIGTERM to watcher: {e}")))?;

        // Grace period before escalating
        std::thread::sleep(std::time::Duration::from_secs(2));

        if self.is_running()? {
            nix::sys::signal::kill(
                nix::unistd::Pid::from_raw(pid),
                nix::sys::signal::Signal::SIGKILL,
            )
            .map_err(|e| io_error(format!("failed to send SIGKILL to watcher: {e}")))?;
        }

        let _ = fs::remove_file(&self.pid_file);

        info!("stopped watcher process {}", pid);
        Ok(())
    }
}

/// Get the default PID file path
pub fn default_pid_file() -> PathBuf {
    // Use XDG_RUNTIME_DIR if available, otherwise /tmp
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        Path::new(&runtime_dir).join("zsctl-watch.pid")
    } else {
        Path::new("/tmp").join(format!("zsctl-watch-{}.pid", nix::unistd::getuid()))
    }
}
