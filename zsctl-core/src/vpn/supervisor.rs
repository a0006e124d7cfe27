//! systemd unit supervision
//!
//! Queries and mutates the enabled/running state of the ZScaler units.
//! Privileged units go through sudo, user units run in the caller's session.
//! Mutation exit codes are never trusted as success; callers verify against
//! the process table or the enablement query.

use std::process::Command;

use regex::Regex;
use tracing::debug;

use crate::error::UnitError;
use crate::types::{ServiceUnit, UnitScope};

/// Marker prefix of the second `systemctl status` output line
const LOADED_PREFIX: &str = "Loaded: ";

/// Enablement state read from the `Loaded:` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Enablement {
    Enabled,
    Disabled,
    /// The marker line is present but carries neither known substring
    Unknown,
}

/// Supervisor interface the reconciler depends on
///
/// Split out as a trait so reconciliation sequences can be exercised with
/// recording doubles instead of a live systemd.
pub trait UnitSupervisor {
    fn is_enabled(&self, unit: &ServiceUnit) -> Result<bool, UnitError>;
    fn is_disabled(&self, unit: &ServiceUnit) -> Result<bool, UnitError>;
    fn enable(&self, unit: &ServiceUnit) -> Result<(), UnitError>;
    fn disable(&self, unit: &ServiceUnit) -> Result<(), UnitError>;
    fn start(&self, unit: &ServiceUnit) -> Result<(), UnitError>;
    fn stop(&self, unit: &ServiceUnit) -> Result<(), UnitError>;
}

/// Real supervisor client shelling out to `systemctl`
pub struct SystemctlClient {
    /// Matches `; enabled; preset: disabled)` / `; disabled; preset: disabled)`
    enablement_pattern: Regex,
}

impl SystemctlClient {
    /// Create a new client with the compiled status-line pattern
    pub fn new() -> Self {
        Self {
            enablement_pattern: Regex::new(r"; (enabled|disabled); preset: disabled\)")
                .expect("Failed to compile enablement pattern"),
        }
    }

    /// Run `systemctl status <unit>` and return its stdout
    fn status_text(&self, unit: &ServiceUnit) -> Result<String, UnitError> {
        // `systemctl status` exits non-zero for stopped units; only a spawn
        // failure is an error here.
        let output = Command::new("systemctl")
            .arg("status")
            .arg(&unit.name)
            .output()
            .map_err(|e| UnitError::CommandFailed {
                unit: unit.name.clone(),
                message: e.to_string(),
            })?;

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Parse the enablement state out of `systemctl status` output
    ///
    /// The second line, trimmed, must start with `Loaded: `; anything else
    /// means an incompatible systemd and is a hard error.
    fn parse_enablement(&self, unit: &ServiceUnit, stdout: &str) -> Result<Enablement, UnitError> {
        let second_line = stdout.lines().nth(1).map(str::trim).ok_or_else(|| {
            UnitError::UnexpectedStatusOutput {
                unit: unit.name.clone(),
                output: stdout.to_string(),
            }
        })?;

        if !second_line.starts_with(LOADED_PREFIX) {
            return Err(UnitError::UnexpectedStatusOutput {
                unit: unit.name.clone(),
                output: stdout.to_string(),
            });
        }

        let enablement = match self
            .enablement_pattern
            .captures(second_line)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
        {
            Some("enabled") => Enablement::Enabled,
            Some("disabled") => Enablement::Disabled,
            _ => Enablement::Unknown,
        };

        debug!("the unit {:?} is {:?}", unit.name, enablement);
        Ok(enablement)
    }

    /// Query the current enablement state of a unit
    fn enablement(&self, unit: &ServiceUnit) -> Result<Enablement, UnitError> {
        debug!("checking the enablement of the unit {:?}", unit.name);
        let stdout = self.status_text(unit)?;
        self.parse_enablement(unit, &stdout)
    }

    /// Run a mutating systemctl verb in the unit's privilege scope
    ///
    /// Privileged units execute through sudo (skipped when already root),
    /// which may prompt and block. stdio stays inherited for that reason.
    fn run(&self, unit: &ServiceUnit, verb: &str) -> Result<(), UnitError> {
        let mut command = match unit.scope {
            UnitScope::Privileged => {
                if nix::unistd::Uid::effective().is_root() {
                    let mut c = Command::new("systemctl");
                    c.arg(verb);
                    c
                } else {
                    let mut c = Command::new("sudo");
                    c.arg("systemctl").arg(verb);
                    c
                }
            }
            UnitScope::User => {
                let mut c = Command::new("systemctl");
                c.arg("--user").arg(verb);
                c
            }
        };

        debug!("executing `systemctl {verb} {}` ({:?} scope)", unit.name, unit.scope);
        command
            .arg(&unit.name)
            .status()
            .map_err(|e| UnitError::CommandFailed {
                unit: unit.name.clone(),
                message: e.to_string(),
            })?;

        Ok(())
    }
}

impl Default for SystemctlClient {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitSupervisor for SystemctlClient {
    fn is_enabled(&self, unit: &ServiceUnit) -> Result<bool, UnitError> {
        Ok(self.enablement(unit)? == Enablement::Enabled)
    }

    fn is_disabled(&self, unit: &ServiceUnit) -> Result<bool, UnitError> {
        Ok(self.enablement(unit)? == Enablement::Disabled)
    }

    fn enable(&self, unit: &ServiceUnit) -> Result<(), UnitError> {
        self.run(unit, "enable")
    }

    fn disable(&self, unit: &ServiceUnit) -> Result<(), UnitError> {
        self.run(unit, "disable")
    }

    fn start(&self, unit: &ServiceUnit) -> Result<(), UnitError> {
        self.run(unit, "start")
    }

    fn stop(&self, unit: &ServiceUnit) -> Result<(), UnitError> {
        self.run(unit, "stop")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> ServiceUnit {
        ServiceUnit::privileged("zsaservice.service")
    }

    fn status_output(loaded_line: &str) -> String {
        format!(
            "● zsaservice.service - ZScaler Service\n     {loaded_line}\n     Active: inactive (dead)\n"
        )
    }

    #[test]
    fn test_parse_enabled() {
        let client = SystemctlClient::new();
        let stdout = status_output(
            "Loaded: loaded (/etc/systemd/system/zsaservice.service; enabled; preset: disabled)",
        );

        let state = client.parse_enablement(&unit(), &stdout).unwrap();
        assert_eq!(state, Enablement::Enabled);
    }

    #[test]
    fn test_parse_disabled() {
        let client = SystemctlClient::new();
        let stdout = status_output(
            "Loaded: loaded (/etc/systemd/system/zsaservice.service; disabled; preset: disabled)",
        );

        let state = client.parse_enablement(&unit(), &stdout).unwrap();
        assert_eq!(state, Enablement::Disabled);
    }

    #[test]
    fn test_missing_preset_marker_is_not_enabled() {
        let client = SystemctlClient::new();
        let stdout = status_output(
            "Loaded: loaded (/etc/systemd/system/zsaservice.service; enabled; preset: enabled)",
        );

        let state = client.parse_enablement(&unit(), &stdout).unwrap();
        assert_eq!(state, Enablement::Unknown);
    }

    #[test]
    fn test_unexpected_second_line_is_a_hard_error() {
        let client = SystemctlClient::new();
        let stdout = "● zsaservice.service\n     Active: inactive (dead)\n".to_string();

        let err = client.parse_enablement(&unit(), &stdout).unwrap_err();
        assert!(matches!(err, UnitError::UnexpectedStatusOutput { .. }));
    }

    #[test]
    fn test_single_line_output_is_a_hard_error() {
        let client = SystemctlClient::new();

        let err = client
            .parse_enablement(&unit(), "Unit zsaservice.service could not be found.")
            .unwrap_err();
        assert!(matches!(err, UnitError::UnexpectedStatusOutput { .. }));
    }
}
