//! Business phase and sentiment classification engine
//!
//! Turns a validated [`PriceSeries`] into a sequence of [`ClassifiedPoint`]s:
//! the close against its trailing trend baseline gives the phase, and the
//! RSI-style oscillator gives the sentiment zone. The engine holds only its
//! configuration, so one instance can classify any number of series, from
//! any number of threads.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{ClassifyError, ClassifyResult};
use crate::indicators;
use crate::types::{
    ClassifiedPoint, CurrentState, PhaseLabel, PriceSeries, RiskProfile, SentimentZone, Symbol,
};

/// Phase of a close relative to its baseline. Equality counts as Expansion.
pub fn classify_phase(close: f64, baseline: f64) -> PhaseLabel {
    if close >= baseline {
        PhaseLabel::Expansion
    } else {
        PhaseLabel::Contraction
    }
}

/// Readings this close to a threshold count as on it. The ratio inside the
/// oscillator can land a few ulps either side of a decimal boundary.
pub const THRESHOLD_TOLERANCE: f64 = 1e-9;

/// Sentiment zone of an oscillator reading. Both thresholds are inclusive.
pub fn classify_sentiment(oscillator: f64, config: &EngineConfig) -> SentimentZone {
    if oscillator >= config.heated_threshold - THRESHOLD_TOLERANCE {
        SentimentZone::Heated
    } else if oscillator <= config.value_threshold + THRESHOLD_TOLERANCE {
        SentimentZone::Value
    } else {
        SentimentZone::Neutral
    }
}

/// Risk profile of a volatility reading (percent)
pub fn classify_risk(volatility: f64, config: &EngineConfig) -> RiskProfile {
    if volatility > config.high_volatility_threshold {
        RiskProfile::HighVolatility
    } else {
        RiskProfile::Stable
    }
}

/// Stateless classifier parameterised by an [`EngineConfig`]
#[derive(Debug, Clone, Default)]
pub struct ClassificationEngine {
    config: EngineConfig,
}

impl ClassificationEngine {
    /// Create an engine, rejecting invalid parameters up front
    pub fn new(config: EngineConfig) -> ClassifyResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute indicator columns for `series`.
    ///
    /// Fails before producing any output when the series is too short. The
    /// returned [`Classification`] materialises points lazily.
    pub fn classify<'a>(&self, series: &'a PriceSeries) -> ClassifyResult<Classification<'a>> {
        let required = self.config.min_observations();
        if series.len() < required {
            return Err(ClassifyError::InsufficientData {
                required,
                actual: series.len(),
            });
        }

        let closes = series.closes();
        let baseline = indicators::sma(&closes, self.config.trend_window);
        let oscillator = indicators::rsi(
            &closes,
            self.config.oscillator_period,
            self.config.smoothing,
        );
        let volatility = indicators::rolling_volatility(&closes, self.config.volatility_window);
        let start = self.config.first_classified_index();

        let columns = Columns {
            series,
            config: self.config.clone(),
            baseline,
            oscillator,
            volatility,
            start,
        };
        let current = columns
            .summarize_latest()
            .ok_or(ClassifyError::InsufficientData {
                required,
                actual: series.len(),
            })?;

        debug!(
            points = series.len(),
            classified = series.len() - start,
            window = self.config.trend_window,
            period = self.config.oscillator_period,
            smoothing = %self.config.smoothing,
            "Classified series"
        );

        Ok(Classification { columns, current })
    }

    /// Classify a series and return only its latest state
    pub fn current_state(&self, series: &PriceSeries) -> ClassifyResult<CurrentState> {
        self.classify(series).map(|c| c.current_state())
    }

    /// Classify many assets in parallel. Result order is unspecified.
    pub fn classify_batch(&self, assets: &[(Symbol, PriceSeries)]) -> Vec<AssetState> {
        info!("Classifying {} assets in parallel", assets.len());

        assets
            .par_iter()
            .map(|(symbol, series)| self.asset_state(symbol, series))
            .collect()
    }

    /// Classify many assets on the calling thread, in input order
    pub fn classify_batch_sequential(&self, assets: &[(Symbol, PriceSeries)]) -> Vec<AssetState> {
        info!("Classifying {} assets sequentially", assets.len());

        assets
            .iter()
            .map(|(symbol, series)| self.asset_state(symbol, series))
            .collect()
    }

    /// Classify one asset and tag the outcome with its symbol
    pub fn asset_state(&self, symbol: &Symbol, series: &PriceSeries) -> AssetState {
        AssetState {
            symbol: symbol.clone(),
            state: self.current_state(series),
        }
    }
}

/// Outcome of classifying one asset in a batch
#[derive(Debug, Clone)]
pub struct AssetState {
    pub symbol: Symbol,
    pub state: ClassifyResult<CurrentState>,
}

/// Indicator columns for one series, ready to be walked
#[derive(Debug, Clone)]
pub struct Classification<'a> {
    columns: Columns<'a>,
    current: CurrentState,
}

impl<'a> Classification<'a> {
    /// Iterate classified points in timestamp order. Each call starts over.
    pub fn iter(&self) -> ClassifiedPoints<'_> {
        ClassifiedPoints {
            columns: &self.columns,
            next: self.columns.start,
        }
    }

    /// Number of classified points
    pub fn len(&self) -> usize {
        self.columns.series.len() - self.columns.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index in the input series of the first classified point
    pub fn first_index(&self) -> usize {
        self.columns.start
    }

    /// Label the input point at `index`, if it lies past the warm-up
    pub fn point_at(&self, index: usize) -> Option<ClassifiedPoint> {
        self.columns.point_at(index)
    }

    /// Summary of the latest point for dashboard consumption
    pub fn current_state(&self) -> CurrentState {
        self.current
    }
}

#[derive(Debug, Clone)]
struct Columns<'a> {
    series: &'a PriceSeries,
    config: EngineConfig,
    baseline: Vec<Option<f64>>,
    oscillator: Vec<Option<f64>>,
    volatility: Vec<Option<f64>>,
    start: usize,
}

impl Columns<'_> {
    fn point_at(&self, index: usize) -> Option<ClassifiedPoint> {
        if index < self.start {
            return None;
        }

        let point = *self.series.points().get(index)?;
        let baseline = self.baseline.get(index).copied().flatten()?;
        let oscillator = self.oscillator.get(index).copied().flatten()?;
        let volatility = self.volatility.get(index).copied().flatten();

        Some(ClassifiedPoint {
            point,
            baseline,
            oscillator,
            phase: classify_phase(point.close, baseline),
            sentiment: classify_sentiment(oscillator, &self.config),
            volatility,
            risk: volatility.map(|v| classify_risk(v, &self.config)),
        })
    }

    fn summarize_latest(&self) -> Option<CurrentState> {
        let points = self.series.points();
        let last_index = points.len().checked_sub(1)?;
        let latest = self.point_at(last_index)?;
        let previous_close = points.get(last_index.checked_sub(1)?)?.close;

        Some(CurrentState {
            timestamp: latest.point.timestamp,
            close: latest.point.close,
            pct_change: (latest.point.close - previous_close) / previous_close * 100.0,
            baseline: latest.baseline,
            oscillator: latest.oscillator,
            phase: latest.phase,
            sentiment: latest.sentiment,
            volatility: latest.volatility,
            risk: latest.risk,
        })
    }
}

impl<'c, 'a> IntoIterator for &'c Classification<'a> {
    type Item = ClassifiedPoint;
    type IntoIter = ClassifiedPoints<'c>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over a [`Classification`]
#[derive(Debug, Clone)]
pub struct ClassifiedPoints<'c> {
    columns: &'c Columns<'c>,
    next: usize,
}

impl Iterator for ClassifiedPoints<'_> {
    type Item = ClassifiedPoint;

    fn next(&mut self) -> Option<Self::Item> {
        let point = self.columns.point_at(self.next)?;
        self.next += 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.columns.series.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ClassifiedPoints<'_> {}
