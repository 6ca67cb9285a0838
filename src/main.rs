//! # Live Preview Entry Point
//!
//! Parses the command line and hands over to [`live_preview::run`].
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- update-dirty-on-event --count 300
//! ```

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let cli = live_preview::Cli::parse();
    match live_preview::run(cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("live-preview: {err}");
            ExitCode::FAILURE
        }
    }
}
