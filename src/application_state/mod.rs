//! # Application State Management
//!
//! This module wires the preview engine into a runnable application:
//! - Configuration from defaults, a JSON file and the command line
//! - The preview strategies selectable by name
//! - The frame-paced loop that drives a strategy against a display sink

pub mod config;
pub mod preview_loop;
pub mod strategies;

use config::PreviewConfig;
use preview_loop::{LoopStats, PreviewLoop};
use strategies::{build_strategy, PreviewStrategy};

use crate::{
    engine_state::rendering::sink::{DisplaySink, MemorySink},
    error::Result,
};

/// A configured preview session, ready to run against a display.
pub struct ApplicationState {
    pub config: PreviewConfig,
    strategy: Box<dyn PreviewStrategy>,
    preview_loop: PreviewLoop,
}

impl ApplicationState {
    /// Builds the camera and strategy named by `config`. Strategies that
    /// capture in the background start doing so right away.
    pub fn new(config: PreviewConfig) -> Result<Self> {
        let config = config.validate()?;
        let strategy = build_strategy(&config)?;
        let preview_loop = PreviewLoop::from_config(&config);
        Ok(Self {
            config,
            strategy,
            preview_loop,
        })
    }

    /// Runs the loop to completion on `sink`.
    pub fn run_on(&mut self, sink: &mut dyn DisplaySink) -> Result<LoopStats> {
        self.preview_loop.run(self.strategy.as_mut(), sink)
    }

    /// Runs the loop on an in-memory display of the configured size.
    pub fn run_headless(&mut self) -> Result<(LoopStats, MemorySink)> {
        let mut sink = MemorySink::new(self.config.display_size)?;
        let stats = self.run_on(&mut sink)?;
        log::info!("Display stats: {:?}", sink.stats());
        Ok((stats, sink))
    }
}
