//! Frame-paced driver of a preview strategy.

use std::thread;

use web_time::{Duration, Instant};

use super::{config::PreviewConfig, strategies::PreviewStrategy};
use crate::{engine_state::rendering::sink::DisplaySink, error::Result};

/// Summary of a finished loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopStats {
    pub frames: u64,
    pub captures: u64,
    pub elapsed: Duration,
}

impl LoopStats {
    /// Loop iterations per second.
    pub fn fps(&self) -> f64 {
        per_second(self.frames, self.elapsed)
    }

    /// Captures per second.
    pub fn cps(&self) -> f64 {
        per_second(self.captures, self.elapsed)
    }
}

fn per_second(count: u64, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64();
    if seconds > 0.0 {
        count as f64 / seconds
    } else {
        0.0
    }
}

pub struct PreviewLoop {
    frame_budget: Duration,
    frame_count: u64,
}

impl PreviewLoop {
    /// Runs at most `max_fps` iterations per second and stops after
    /// `frame_count` of them; 0 never stops on its own.
    pub fn new(max_fps: u32, frame_count: u64) -> Self {
        Self {
            frame_budget: Duration::from_secs(1) / max_fps.max(1),
            frame_count,
        }
    }

    pub fn from_config(config: &PreviewConfig) -> Self {
        Self::new(config.max_fps, config.frame_count)
    }

    /// Drives `strategy` until the frame count is reached or an update
    /// fails. The strategy is quit in both cases.
    pub fn run(
        &self,
        strategy: &mut dyn PreviewStrategy,
        sink: &mut dyn DisplaySink,
    ) -> Result<LoopStats> {
        let start = Instant::now();
        let mut frames = 0u64;

        let outcome = loop {
            if self.frame_count != 0 && frames >= self.frame_count {
                break Ok(());
            }
            let tick = Instant::now();
            if let Err(err) = strategy.update(sink) {
                log::error!("'{}' update failed: {err}", strategy.name());
                break Err(err);
            }
            frames += 1;

            let spent = tick.elapsed();
            if spent < self.frame_budget {
                thread::sleep(self.frame_budget - spent);
            }
        };

        let stats = LoopStats {
            frames,
            captures: strategy.captures(),
            elapsed: start.elapsed(),
        };
        log::info!("Game loop speed (FPS): {:.1}", stats.fps());
        log::info!("Captures per second (CPS): {:.1}", stats.cps());

        strategy.quit();
        outcome.map(|()| stats)
    }
}
