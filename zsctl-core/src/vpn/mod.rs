//! VPN client state reconciliation
//!
//! Process observation, systemd unit supervision, status classification and
//! the reconciliation state machine.

pub mod observer;
pub mod reconcile;
pub mod status;
pub mod supervisor;

// Public re-exports
pub use observer::{ProcessObserver, ProcessProbe, ProcessTable, PsProcessTable};
pub use reconcile::{decide, Reconciler};
pub use status::classify;
pub use supervisor::{SystemctlClient, UnitSupervisor};
