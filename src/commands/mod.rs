//! CLI subcommand implementations

pub mod classify;
pub mod scan;

use anyhow::{Context, Result};
use market_pulse::{Config, Smoothing};
use std::path::Path;
use tracing::info;

/// Engine parameter overrides shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct EngineOverrides {
    pub window: Option<usize>,
    pub period: Option<usize>,
    pub smoothing: Option<Smoothing>,
}

/// Load the configuration file (or defaults) and apply CLI overrides
pub fn load_config(config_path: Option<&str>, overrides: &EngineOverrides) -> Result<Config> {
    let mut config = Config::load_or_default(config_path.map(Path::new))?;
    if let Some(path) = config_path {
        info!("Loaded configuration from: {}", path);
    }

    if let Some(window) = overrides.window {
        info!("Overriding trend window to: {}", window);
        config.engine.trend_window = window;
    }
    if let Some(period) = overrides.period {
        info!("Overriding oscillator period to: {}", period);
        config.engine.oscillator_period = period;
    }
    if let Some(smoothing) = overrides.smoothing {
        info!("Overriding smoothing to: {}", smoothing);
        config.engine.smoothing = smoothing;
    }

    config
        .engine
        .validate()
        .context("Invalid engine parameters")?;

    Ok(config)
}
