//! Domain types for ZScaler state reconciliation
//!
//! This module defines the identities, statuses and well-known constants the
//! reconciliation engine operates on. Statuses are always derived from a live
//! observation and never persisted.

use std::fmt;

/// An executable path exactly as it appears in the process listing
///
/// Compared by exact equality against the leading token of a `ps aux`
/// command field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessIdentity(String);

impl ProcessIdentity {
    /// Create a new process identity from a binary path
    pub fn new(binary: impl Into<String>) -> Self {
        Self(binary.into())
    }

    /// The binary path as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProcessIdentity {
    fn from(binary: &str) -> Self {
        Self::new(binary)
    }
}

/// Observed status of the ZScaler client, derived from the three tracked
/// process identities on every call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VpnStatus {
    /// Tray, daemon and tunnel processes are all running
    AllRunning,
    /// Some but not all of the tracked processes are running
    SomeRunning,
    /// None of the tracked processes are running
    NoneRunning,
}

impl fmt::Display for VpnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VpnStatus::AllRunning => write!(f, "running"),
            VpnStatus::SomeRunning => write!(f, "half-running"),
            VpnStatus::NoneRunning => write!(f, "not running"),
        }
    }
}

/// Action required to reconcile a (current, desired) status pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Current already matches desired
    NoOp,
    /// Drive the ordered startup sequence
    Startup,
    /// Drive the ordered shutdown sequence
    Shutdown,
}

/// Privilege context a unit's operations must run in
///
/// The binding between a unit and its scope is fixed, never negotiated at
/// runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitScope {
    /// Runs within the invoking user's session (`systemctl --user`)
    User,
    /// Requires elevated permissions (`sudo systemctl`)
    Privileged,
}

/// A systemd unit managed by the reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUnit {
    /// Unit name as systemd knows it, e.g. `zsaservice.service`
    pub name: String,
    /// Privilege context for every operation against this unit
    pub scope: UnitScope,
}

impl ServiceUnit {
    /// Create a user-scoped unit
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: UnitScope::User,
        }
    }

    /// Create a privileged-scoped unit
    pub fn privileged(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: UnitScope::Privileged,
        }
    }
}

impl fmt::Display for ServiceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Status of the ZScaler Internet Security feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityStatus {
    On,
    Off,
    /// No notification log, or no matching events in it
    Unknown,
}

/// A row from the ZScaler notification log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityEvent {
    /// Notification name, e.g. `Internet Security On`
    pub name: String,
    /// Timestamp parsed from the row's `Time` column
    pub time: chrono::NaiveDateTime,
}

/// ZScaler tray binary as it appears in the process listing
pub const ZSCALER_TRAY_BIN: &str = "/opt/zscaler/bin/ZSTray";
/// ZScaler privileged daemon binary
pub const ZSCALER_DAEMON_BIN: &str = "/opt/zscaler/bin/zsaservice";
/// ZScaler tunnel binary, spawned by the daemon
pub const ZSCALER_TUNNEL_BIN: &str = "/opt/zscaler/bin/zstunnel";

/// User-level tray unit (`/etc/xdg/systemd/user/ZSTray.service`)
pub const ZSCALER_GUI_UNIT: &str = "ZSTray.service";
/// System-level daemon unit (`/etc/systemd/system/zsaservice.service`)
pub const ZSCALER_DAEMON_UNIT: &str = "zsaservice.service";

/// The fixed process identities and units of one managed VPN client
///
/// Passed into the reconciler as explicit data so binary paths and unit
/// names live in one place instead of being scattered over call sites.
#[derive(Debug, Clone)]
pub struct ClientTopology {
    /// Per-user GUI tray process
    pub tray: ProcessIdentity,
    /// Privileged daemon process
    pub daemon: ProcessIdentity,
    /// Tunnel process managed by the daemon
    pub tunnel: ProcessIdentity,
    /// User-scoped unit supervising the tray
    pub gui_unit: ServiceUnit,
    /// Privileged unit supervising the daemon
    pub daemon_unit: ServiceUnit,
}

impl ClientTopology {
    /// Topology of the stock ZScaler client install
    pub fn zscaler() -> Self {
        Self {
            tray: ProcessIdentity::new(ZSCALER_TRAY_BIN),
            daemon: ProcessIdentity::new(ZSCALER_DAEMON_BIN),
            tunnel: ProcessIdentity::new(ZSCALER_TUNNEL_BIN),
            gui_unit: ServiceUnit::user(ZSCALER_GUI_UNIT),
            daemon_unit: ServiceUnit::privileged(ZSCALER_DAEMON_UNIT),
        }
    }

    /// The three tracked identities the status lattice is derived from
    pub fn tracked_processes(&self) -> [ProcessIdentity; 3] {
        [self.tray.clone(), self.daemon.clone(), self.tunnel.clone()]
    }
}

impl Default for ClientTopology {
    fn default() -> Self {
        Self::zscaler()
    }
}
