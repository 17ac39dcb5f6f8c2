//! Core data types: price observations, labels and classified output

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A single recorded observation for one asset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self {
            timestamp,
            close,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }
}

/// Validated, time-ordered price observations for one asset.
///
/// The only way to obtain a `PriceSeries` is through [`PriceSeries::new`],
/// so every instance holds strictly increasing timestamps and finite,
/// positive closes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Validate and wrap a sequence of observations
    pub fn new(points: Vec<PricePoint>) -> Result<Self, ValidationError> {
        for (index, point) in points.iter().enumerate() {
            if !point.close.is_finite() {
                return Err(ValidationError::MissingPrice {
                    index,
                    timestamp: point.timestamp,
                });
            }

            if point.close <= 0.0 {
                return Err(ValidationError::NonPositivePrice {
                    index,
                    close: point.close,
                });
            }

            if let Some(volume) = point.volume {
                if volume.is_nan() || volume < 0.0 {
                    return Err(ValidationError::NegativeVolume { index, volume });
                }
            }

            if index > 0 {
                let previous = points[index - 1].timestamp;
                if point.timestamp <= previous {
                    return Err(ValidationError::NonMonotonicTimestamps {
                        index,
                        previous,
                        current: point.timestamp,
                    });
                }
            }
        }

        Ok(Self { points })
    }

    /// Build a daily series starting at `start` from bare closes
    pub fn from_daily_closes(start: NaiveDate, closes: &[f64]) -> Result<Self, ValidationError> {
        let origin = Utc.from_utc_datetime(&start.and_time(chrono::NaiveTime::MIN));
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint::new(origin + chrono::Duration::days(i as i64), close))
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}

/// Structural phase of the asset relative to its trend baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseLabel {
    Expansion,
    Contraction,
}

impl PhaseLabel {
    pub fn headline(&self) -> &'static str {
        match self {
            Self::Expansion => "EXPANSION (Growth Phase)",
            Self::Contraction => "CONTRACTION (Pressure Phase)",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Expansion => {
                "Asset is trading at or above its trend baseline, indicating positive structural momentum."
            }
            Self::Contraction => {
                "Asset is trading below its trend baseline, indicating structural headwinds."
            }
        }
    }
}

/// Momentum sentiment zone derived from the bounded oscillator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentZone {
    Heated,
    Value,
    Neutral,
}

impl SentimentZone {
    pub fn headline(&self) -> &'static str {
        match self {
            Self::Heated => "HEATED / ELEVATED ATTENTION",
            Self::Value => "DEPRESSED / VALUE ZONE",
            Self::Neutral => "STABLE / NORMALIZED",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Heated => {
                "Sentiment is historically stretched. Often correlates with news cycles or hype spikes."
            }
            Self::Value => {
                "Sentiment is historically low. May indicate over-reaction to negative news."
            }
            Self::Neutral => {
                "Sentiment is within its normal range. Price movement is likely rational."
            }
        }
    }
}

/// Short-term variance profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskProfile {
    HighVolatility,
    Stable,
}

impl RiskProfile {
    pub fn headline(&self) -> &'static str {
        match self {
            Self::HighVolatility => "HIGH VOLATILITY",
            Self::Stable => "STABLE",
        }
    }
}

/// One fully labeled observation emitted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassifiedPoint {
    pub point: PricePoint,
    pub baseline: f64,
    pub oscillator: f64,
    pub phase: PhaseLabel,
    pub sentiment: SentimentZone,
    /// Rolling volatility of percentage returns, in percent
    pub volatility: Option<f64>,
    pub risk: Option<RiskProfile>,
}

/// Summary of the latest classified observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurrentState {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    /// Change against the previous close, in percent
    pub pct_change: f64,
    pub baseline: f64,
    pub oscillator: f64,
    pub phase: PhaseLabel,
    pub sentiment: SentimentZone,
    pub volatility: Option<f64>,
    pub risk: Option<RiskProfile>,
}

/// Asset symbol using Arc<str> for cheap cloning
///
/// Symbols are cloned into every batch result, so sharing the backing
/// string avoids a heap allocation per clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(#[serde(with = "arc_str_serde")] std::sync::Arc<str>);

mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl Symbol {
    /// Symbols are normalised to upper case, matching ticker conventions
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(std::sync::Arc::from(s.as_ref().trim().to_uppercase().as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
