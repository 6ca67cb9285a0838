#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Live Preview
//!
//! A live camera preview pipeline: frames are captured on background worker
//! threads, handed to a single-threaded consumer through an event bridge, and
//! drawn through a scene of cached nodes whose compositor repaints only the
//! screen rectangles that changed.
//!
//! ## Key Modules
//!
//! * `application_state` - configuration, preview strategies and the paced loop
//! * `core` - shared resource wrappers for multi- and single-threaded state
//! * `engine_state` - task pool, capture, scene, geometry and compositing
//! * `error` - crate error type and task failures
//!
//! ## Architecture
//!
//! The pipeline keeps a strict split between:
//! * Producers, which only ever run on pool workers
//! * The event bridge, the only channel from workers to the consumer
//! * The scene and compositor, owned by the consumer thread
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//!
//! fn main() {
//!     let cli = live_preview::Cli::parse();
//!     if let Err(err) = live_preview::run(cli) {
//!         eprintln!("{err}");
//!     }
//! }
//! ```

pub mod application_state;
pub mod core;
pub mod engine_state;
pub mod error;

pub use application_state::{
    config::{Cli, PreviewConfig, StrategyKind},
    preview_loop::LoopStats,
    ApplicationState,
};
pub use error::{PreviewError, Result, TaskFailure};

use log::info;

/// Initialises logging, loads the configuration and runs the selected
/// strategy on an in-memory display.
pub fn run(cli: Cli) -> Result<LoopStats> {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .filter_level(cli.log_level)
        .parse_env("RUST_LOG");
    // A second init in the same process keeps the first logger.
    let _ = log_builder.try_init();

    info!("Logger initialized");
    let config = PreviewConfig::load(&cli)?;
    let mut app = ApplicationState::new(config)?;
    let (stats, _sink) = app.run_headless()?;
    info!(
        "Displayed {} frames from {} captures in {:.2}s",
        stats.frames,
        stats.captures,
        stats.elapsed.as_secs_f64()
    );
    Ok(stats)
}
