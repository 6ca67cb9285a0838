//! # Preview Configuration
//!
//! Settings are layered: built-in defaults, then an optional JSON file, then
//! command line flags. Validation runs once on the merged result.
//!
//! ```json
//! {
//!     "display_size": { "width": 800, "height": 480 },
//!     "preview_size": { "width": 240, "height": 400 },
//!     "max_fps": 100,
//!     "strategy": "update-dirty-on-event",
//!     "backlog": 8
//! }
//! ```

use std::{fs, path::PathBuf};

use clap::{Parser, ValueEnum};
use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::{
    engine_state::{rendering::geometry::Size, task_management::Backlog},
    error::{PreviewError, Result},
};

/// How the preview loop gets frames on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Capture on the loop thread, present the whole surface.
    Flip,
    /// Capture on the loop thread, present the preview rectangle.
    Update,
    /// Capture in the background, blit each frame event.
    UpdateOnEvent,
    /// Capture in the background, composite dirty rectangles of a scene.
    #[default]
    UpdateDirtyOnEvent,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Flip => "flip",
            StrategyKind::Update => "update",
            StrategyKind::UpdateOnEvent => "update-on-event",
            StrategyKind::UpdateDirtyOnEvent => "update-dirty-on-event",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub display_size: Size,
    pub preview_size: Size,
    /// Upper bound on loop iterations per second.
    pub max_fps: u32,
    /// Loop iterations before exiting; 0 runs until interrupted.
    pub frame_count: u64,
    /// Worker threads; 0 uses the available parallelism.
    pub workers: usize,
    /// Maximum queued frame events, oldest dropped first; `None` is unbounded.
    pub backlog: Option<usize>,
    pub background: [u8; 3],
    pub strategy: StrategyKind,
    /// Image files cycled by the mock camera; generated frames when empty.
    pub captures: Vec<PathBuf>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            display_size: Size::new(800, 480),
            preview_size: Size::new(240, 400),
            max_fps: 100,
            frame_count: 300,
            workers: 0,
            backlog: None,
            background: [0, 0, 0],
            strategy: StrategyKind::default(),
            captures: Vec::new(),
        }
    }
}

impl PreviewConfig {
    /// Merges defaults, the config file named by `cli` and the flag overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|err| {
                    PreviewError::Config(format!("cannot read {}: {err}", path.display()))
                })?;
                Self::from_json(&text)?
            }
            None => Self::default(),
        };

        if let Some(strategy) = cli.strategy {
            config.strategy = strategy;
        }
        if let Some(count) = cli.count {
            config.frame_count = count;
        }
        if let Some(workers) = cli.workers {
            config.workers = workers;
        }
        if cli.backlog.is_some() {
            config.backlog = cli.backlog;
        }
        if !cli.captures.is_empty() {
            config.captures = cli.captures.clone();
        }

        config.validate()
    }

    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| PreviewError::Config(err.to_string()))
    }

    pub fn validate(self) -> Result<Self> {
        if self.display_size.is_empty() {
            return Err(PreviewError::Config(format!(
                "display size {} is empty",
                self.display_size
            )));
        }
        if self.preview_size.is_empty() {
            return Err(PreviewError::Config(format!(
                "preview size {} is empty",
                self.preview_size
            )));
        }
        if self.max_fps == 0 {
            return Err(PreviewError::Config("max_fps must be positive".to_string()));
        }
        if self.backlog == Some(0) {
            return Err(PreviewError::Config(
                "backlog must hold at least one event".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn backlog(&self) -> Backlog {
        match self.backlog {
            Some(limit) => Backlog::DropOldest(limit),
            None => Backlog::Unbounded,
        }
    }

    pub fn background(&self) -> Rgb<u8> {
        Rgb(self.background)
    }
}

/// Live preview demo: captures frames and repaints them as fast as allowed.
#[derive(Debug, Parser)]
#[command(name = "live-preview", version)]
pub struct Cli {
    /// Preview strategy to run
    #[arg(value_enum)]
    pub strategy: Option<StrategyKind>,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of loop iterations (0 runs until interrupted)
    #[arg(short, long)]
    pub count: Option<u64>,

    /// Worker threads (0 uses the available parallelism)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Maximum queued frame events before the oldest is dropped
    #[arg(long)]
    pub backlog: Option<usize>,

    /// Image file for the mock camera to cycle; repeatable
    #[arg(long = "capture")]
    pub captures: Vec<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: log::LevelFilter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PreviewConfig::default().validate().unwrap();
        assert_eq!(config.display_size, Size::new(800, 480));
        assert_eq!(config.preview_size, Size::new(240, 400));
        assert_eq!(config.backlog(), Backlog::Unbounded);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            PreviewConfig::from_json(r#"{ "strategy": "flip", "backlog": 4, "max_fps": 30 }"#)
                .unwrap();
        assert_eq!(config.strategy, StrategyKind::Flip);
        assert_eq!(config.backlog(), Backlog::DropOldest(4));
        assert_eq!(config.max_fps, 30);
        assert_eq!(config.frame_count, 300);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            PreviewConfig::from_json("{ not json"),
            Err(PreviewError::Config(_))
        ));

        let config = PreviewConfig {
            max_fps: 0,
            ..PreviewConfig::default()
        };
        assert!(matches!(config.validate(), Err(PreviewError::Config(_))));

        let config = PreviewConfig {
            preview_size: Size::new(240, 0),
            ..PreviewConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_backlog_rejected() {
        let config = PreviewConfig {
            backlog: Some(0),
            ..PreviewConfig::default()
        };
        assert!(matches!(config.validate(), Err(PreviewError::Config(_))));

        let cli = Cli::parse_from(["live-preview", "--backlog", "0"]);
        assert!(matches!(PreviewConfig::load(&cli), Err(PreviewError::Config(_))));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "live-preview",
            "update-on-event",
            "-c",
            "10",
            "--workers",
            "3",
            "--backlog",
            "2",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.log_level, log::LevelFilter::Debug);

        let config = PreviewConfig::load(&cli).unwrap();
        assert_eq!(config.strategy, StrategyKind::UpdateOnEvent);
        assert_eq!(config.frame_count, 10);
        assert_eq!(config.workers, 3);
        assert_eq!(config.backlog, Some(2));
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli::parse_from(["live-preview", "--config", "/nonexistent/preview.json"]);
        assert!(matches!(PreviewConfig::load(&cli), Err(PreviewError::Config(_))));
    }
}
