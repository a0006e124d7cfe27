//! Process table sampling and bounded-retry convergence
//!
//! This module provides the observer used to verify that ZScaler binaries
//! actually came up or went down, independent of what systemd reports.

use std::collections::HashSet;
use std::process::Command;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::ProcessError;
use crate::types::ProcessIdentity;

/// Fixed columns before the command field in `ps aux` output
/// (user, pid, %cpu, %mem, vsz, rss, tty, stat, start, time)
const PS_AUX_COMMAND_FIELD: usize = 10;

/// Attempt budget for the convergence primitives
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Pause between convergence attempts
const DEFAULT_WAIT_BETWEEN_ATTEMPTS: Duration = Duration::from_secs(1);

/// Capability returning the raw rows of a `ps aux`-style listing
///
/// One row per process, header stripped. Injected so the observer is
/// testable against a canned process table.
pub trait ProcessTable {
    fn rows(&self) -> Result<Vec<String>, ProcessError>;
}

/// Real process table backed by `ps aux`
#[derive(Debug, Default)]
pub struct PsProcessTable;

impl ProcessTable for PsProcessTable {
    fn rows(&self) -> Result<Vec<String>, ProcessError> {
        let output = Command::new("ps").arg("aux").output().map_err(|e| {
            ProcessError::CommandFailed {
                command: "ps aux".to_string(),
                message: e.to_string(),
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().skip(1).map(str::to_string).collect())
    }
}

/// Extract the executable invocation token from a `ps aux` row
///
/// The command field starts at the 11th whitespace-delimited field; its
/// first token is the binary as invoked. A row too short to carry a command
/// is a hard error, since it means the listing shape changed.
fn command_token(row: &str) -> Result<&str, ProcessError> {
    row.split_whitespace()
        .nth(PS_AUX_COMMAND_FIELD)
        .ok_or_else(|| ProcessError::MalformedPsRow {
            row: row.to_string(),
        })
}

/// Observer interface the classifier and reconciler depend on
///
/// Split out as a trait so reconciliation sequences can be exercised with
/// doubles instead of the live process table.
pub trait ProcessProbe {
    /// Check whether `identity` currently appears in the process listing
    fn is_running(&self, identity: &ProcessIdentity) -> Result<bool, ProcessError>;

    /// Poll until every identity is running, within the attempt budget
    fn wait_until_all_running(&self, identities: &[ProcessIdentity])
        -> Result<bool, ProcessError>;

    /// Poll until no identity is running, within the attempt budget
    fn wait_until_none_running(
        &self,
        identities: &[ProcessIdentity],
    ) -> Result<bool, ProcessError>;
}

/// Samples live process state with single-shot and convergence primitives
///
/// Stateless between calls: every operation re-reads the process table.
#[derive(Debug)]
pub struct ProcessObserver<T: ProcessTable> {
    table: T,
    max_attempts: u32,
    wait_between_attempts: Duration,
}

impl ProcessObserver<PsProcessTable> {
    /// Observer over the live `ps aux` table with the default retry budget
    pub fn new() -> Self {
        Self::with_table(PsProcessTable)
    }
}

impl Default for ProcessObserver<PsProcessTable> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ProcessTable> ProcessObserver<T> {
    /// Observer over an injected process table
    pub fn with_table(table: T) -> Self {
        Self {
            table,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            wait_between_attempts: DEFAULT_WAIT_BETWEEN_ATTEMPTS,
        }
    }

    /// Override the convergence budget (tests use a zero interval)
    pub fn with_retry(mut self, max_attempts: u32, wait_between_attempts: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.wait_between_attempts = wait_between_attempts;
        self
    }

    /// All distinct executables currently active
    ///
    /// Kernel-thread-style rows (command starting with `[` or `-`) are
    /// filtered out.
    pub fn active_executables(&self) -> Result<HashSet<ProcessIdentity>, ProcessError> {
        let mut executables = HashSet::new();
        for row in self.table.rows()? {
            let token = command_token(&row)?;
            if token.starts_with('[') || token.starts_with('-') {
                continue;
            }
            executables.insert(ProcessIdentity::new(token));
        }
        Ok(executables)
    }

    /// Bounded-retry convergence: re-check only the identities that have not
    /// reached the target condition yet, up to `max_attempts` passes.
    ///
    /// Bounded by attempts, not wall-clock. Returns false on exhaustion; an
    /// error only surfaces when the process table itself cannot be read.
    fn converge(
        &self,
        identities: &[ProcessIdentity],
        satisfied: impl Fn(bool) -> bool,
    ) -> Result<bool, ProcessError> {
        let mut pending: Vec<&ProcessIdentity> = identities.iter().collect();

        for attempt in 1..=self.max_attempts {
            let mut still_pending = Vec::new();
            for identity in pending {
                if satisfied(self.is_running(identity)?) {
                    debug!("{identity} reached the target condition");
                } else {
                    still_pending.push(identity);
                }
            }
            pending = still_pending;

            if pending.is_empty() {
                return Ok(true);
            }

            if attempt < self.max_attempts {
                info!(
                    "{} processes have not converged yet, waiting {:?} before retrying...",
                    pending.len(),
                    self.wait_between_attempts
                );
                thread::sleep(self.wait_between_attempts);
            }
        }

        Ok(false)
    }
}

impl<T: ProcessTable> ProcessProbe for ProcessObserver<T> {
    fn is_running(&self, identity: &ProcessIdentity) -> Result<bool, ProcessError> {
        debug!("looking for {identity:?} in the output of `ps aux`");
        for row in self.table.rows()? {
            if command_token(&row)? == identity.as_str() {
                debug!("{identity} found");
                return Ok(true);
            }
        }
        debug!("{identity} not found");
        Ok(false)
    }

    fn wait_until_all_running(
        &self,
        identities: &[ProcessIdentity],
    ) -> Result<bool, ProcessError> {
        self.converge(identities, |running| running)
    }

    fn wait_until_none_running(
        &self,
        identities: &[ProcessIdentity],
    ) -> Result<bool, ProcessError> {
        self.converge(identities, |running| !running)
    }
}
