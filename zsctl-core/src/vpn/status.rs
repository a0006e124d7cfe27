//! Status classification over the tracked process set
//!
//! Turns per-process observations into the three-valued client status.

use tracing::debug;

use crate::error::ProcessError;
use crate::types::{ProcessIdentity, VpnStatus};
use crate::vpn::observer::ProcessProbe;

/// Classify the client status from the three tracked identities
///
/// Re-samples the live process state on every call; nothing is cached.
pub fn classify(
    probe: &impl ProcessProbe,
    tracked: &[ProcessIdentity; 3],
) -> Result<VpnStatus, ProcessError> {
    let mut any_running = false;
    let mut all_running = true;

    for identity in tracked {
        if probe.is_running(identity)? {
            any_running = true;
        } else {
            all_running = false;
        }
    }

    let status = if all_running {
        VpnStatus::AllRunning
    } else if any_running {
        VpnStatus::SomeRunning
    } else {
        VpnStatus::NoneRunning
    };

    debug!("classified client status: {status}");
    Ok(status)
}
