//! Background watcher for the ZScaler client
//!
//! This module handles the periodic security check loop and the PID-file
//! management for running it detached.

pub mod process;
pub mod watch;
