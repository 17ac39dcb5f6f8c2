//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable overrides for the data directories.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ValidationError;
use crate::Symbol;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub data: DataConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        config.apply_env_overrides();
        config
            .engine
            .validate()
            .context("Invalid engine configuration")?;

        Ok(config)
    }

    /// Load from `path` if given, otherwise start from defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let mut config = Config::default();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    /// Directory overrides from the environment (a `.env` file is honoured)
    pub fn apply_env_overrides(&mut self) {
        dotenv::dotenv().ok();

        if let Ok(dir) = std::env::var("MARKETPULSE_DATA_DIR") {
            self.data.data_dir = dir;
        }
        if let Ok(dir) = std::env::var("MARKETPULSE_RESULTS_DIR") {
            self.data.results_dir = dir;
        }
    }
}

/// How average gains and losses are smoothed for the oscillator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Smoothing {
    /// Rolling arithmetic mean over the trailing period
    #[default]
    Simple,
    /// Wilder's smoothing seeded with the simple mean
    Wilder,
    /// Exponential moving average
    Exponential,
}

impl std::str::FromStr for Smoothing {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" | "sma" => Ok(Smoothing::Simple),
            "wilder" => Ok(Smoothing::Wilder),
            "exponential" | "ema" => Ok(Smoothing::Exponential),
            _ => Err(format!(
                "Unknown smoothing: {}. Use 'simple', 'wilder' or 'exponential'",
                s
            )),
        }
    }
}

impl std::fmt::Display for Smoothing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Smoothing::Simple => write!(f, "simple"),
            Smoothing::Wilder => write!(f, "wilder"),
            Smoothing::Exponential => write!(f, "exponential"),
        }
    }
}

/// Classification engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Observations in the trailing trend baseline
    pub trend_window: usize,
    /// Close-to-close deltas averaged by the oscillator
    pub oscillator_period: usize,
    /// Oscillator at or above this reads as Heated
    pub heated_threshold: f64,
    /// Oscillator at or below this reads as Value
    pub value_threshold: f64,
    pub smoothing: Smoothing,
    /// Percentage returns in the rolling volatility window
    pub volatility_window: usize,
    /// Volatility (percent) strictly above this is HighVolatility
    pub high_volatility_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            trend_window: 50,
            oscillator_period: 14,
            heated_threshold: 70.0,
            value_threshold: 30.0,
            smoothing: Smoothing::Simple,
            volatility_window: 14,
            high_volatility_threshold: 2.5,
        }
    }
}

/// Longest lookback any indicator window may use
pub const MAX_LOOKBACK: usize = 1_000_000;

impl EngineConfig {
    /// Check parameter ranges before any computation
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.trend_window == 0 {
            return Err(invalid("trend_window", "must be positive"));
        }
        if self.oscillator_period == 0 {
            return Err(invalid("oscillator_period", "must be positive"));
        }
        for (name, value) in [
            ("trend_window", self.trend_window),
            ("oscillator_period", self.oscillator_period),
            ("volatility_window", self.volatility_window),
        ] {
            if value > MAX_LOOKBACK {
                return Err(invalid(
                    name,
                    format!("must be at most {}, got {}", MAX_LOOKBACK, value),
                ));
            }
        }
        if self.volatility_window < 2 {
            return Err(invalid(
                "volatility_window",
                format!("must be at least 2, got {}", self.volatility_window),
            ));
        }
        if !self.heated_threshold.is_finite() || !self.value_threshold.is_finite() {
            return Err(invalid("thresholds", "must be finite"));
        }
        if self.value_threshold < 0.0 || self.heated_threshold > 100.0 {
            return Err(invalid(
                "thresholds",
                format!(
                    "must lie within [0, 100], got value={} heated={}",
                    self.value_threshold, self.heated_threshold
                ),
            ));
        }
        if self.value_threshold >= self.heated_threshold {
            return Err(invalid(
                "value_threshold",
                format!(
                    "must be below heated_threshold ({} >= {})",
                    self.value_threshold, self.heated_threshold
                ),
            ));
        }
        if !self.high_volatility_threshold.is_finite() || self.high_volatility_threshold < 0.0 {
            return Err(invalid(
                "high_volatility_threshold",
                "must be a non-negative number",
            ));
        }
        Ok(())
    }

    /// Index of the first point where both baseline and oscillator exist
    pub fn first_classified_index(&self) -> usize {
        (self.trend_window.saturating_sub(1)).max(self.oscillator_period)
    }

    /// Shortest series the engine will classify
    pub fn min_observations(&self) -> usize {
        self.first_classified_index().saturating_add(2)
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

/// Data location configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub data_dir: String,
    pub results_dir: String,
    pub symbols: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            data_dir: "data".to_string(),
            results_dir: "results".to_string(),
            symbols: vec![
                "NVDA".to_string(),
                "TSLA".to_string(),
                "AAPL".to_string(),
                "MSFT".to_string(),
                "AMZN".to_string(),
                "GOOGL".to_string(),
                "META".to_string(),
                "SPY".to_string(),
                "JPM".to_string(),
                "GS".to_string(),
                "XOM".to_string(),
            ],
        }
    }
}

impl DataConfig {
    pub fn symbols(&self) -> Vec<Symbol> {
        self.symbols.iter().map(Symbol::new).collect()
    }
}
