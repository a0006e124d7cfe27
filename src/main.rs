//! zsctl - ZScaler VPN client controller
//!
//! The ZScaler client wants to stay hanging around and start when the system
//! starts. No way. zsctl reconciles the client against the state you asked
//! for and watches its Internet Security feature in the background.

use clap::{Parser, Subcommand};
use tracing::error;
use zsctl_core::init_logging;

mod cli;
mod daemon;

#[derive(Parser)]
#[command(name = "zsctl")]
#[command(about = "Start/fully-stop the ZScaler VPN client")]
struct Cli {
    /// Show debug logs
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the ZScaler client
    Up,
    /// Stop the ZScaler client and keep it from coming back
    Down,
    /// Periodically check the client and notify while Internet Security is on
    Watch {
        /// Run in the background, managed via a PID file
        #[arg(long)]
        detach: bool,

        /// Stop a detached watcher
        #[arg(long, conflicts_with = "detach")]
        stop: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let result = match cli.command {
        Some(Commands::Up) => cli::vpn::run_up(),
        Some(Commands::Down) => cli::vpn::run_down(),
        Some(Commands::Watch { detach, stop }) => daemon::watch::run(detach, stop),
        None => cli::vpn::run_status(),
    };

    // Errors are logged but deliberately not reflected in the exit status
    if let Err(e) = result {
        error!("{}", e);
    }
    std::process::exit(0);
}
