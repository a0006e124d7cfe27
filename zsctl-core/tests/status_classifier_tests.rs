//! Status classification over the observer with a canned process table
//!
//! Exercises the classifier through the same observer the CLI uses, with
//! `ps aux`-shaped rows instead of the live table.

use zsctl_core::error::ProcessError;
use zsctl_core::types::{ClientTopology, VpnStatus};
use zsctl_core::vpn::{classify, ProcessObserver, ProcessTable};

struct CannedTable {
    rows: Vec<String>,
}

impl CannedTable {
    fn with_commands(commands: &[&str]) -> Self {
        let rows = commands
            .iter()
            .map(|command| {
                format!("user  4321  0.2  0.5 654321  9876 ?  Ssl  08:30  0:12 {command}")
            })
            .collect();
        Self { rows }
    }
}

impl ProcessTable for CannedTable {
    fn rows(&self) -> Result<Vec<String>, ProcessError> {
        Ok(self.rows.clone())
    }
}

fn classify_commands(commands: &[&str]) -> VpnStatus {
    let observer = ProcessObserver::with_table(CannedTable::with_commands(commands));
    let topology = ClientTopology::zscaler();
    classify(&observer, &topology.tracked_processes()).unwrap()
}

#[test]
fn test_all_three_processes_running() {
    let status = classify_commands(&[
        "/opt/zscaler/bin/ZSTray",
        "/opt/zscaler/bin/zsaservice",
        "/opt/zscaler/bin/zstunnel --systemd",
        "/usr/bin/firefox",
    ]);
    assert_eq!(status, VpnStatus::AllRunning);
}

#[test]
fn test_only_daemon_side_running() {
    let status = classify_commands(&[
        "/opt/zscaler/bin/zsaservice",
        "/opt/zscaler/bin/zstunnel",
    ]);
    assert_eq!(status, VpnStatus::SomeRunning);
}

#[test]
fn test_only_tray_running() {
    let status = classify_commands(&["/opt/zscaler/bin/ZSTray"]);
    assert_eq!(status, VpnStatus::SomeRunning);
}

#[test]
fn test_nothing_tracked_running() {
    let status = classify_commands(&["/usr/bin/firefox", "[kworker/2:0]"]);
    assert_eq!(status, VpnStatus::NoneRunning);
}

#[test]
fn test_empty_process_table() {
    let status = classify_commands(&[]);
    assert_eq!(status, VpnStatus::NoneRunning);
}
