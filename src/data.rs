//! Data loading and export
//!
//! Loads price series from CSV files (a `datetime`/`date` column, a `close`
//! column and an optional `volume` column, as written by most market-data
//! downloaders) and writes classified output back to CSV.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::engine::Classification;
use crate::{PhaseLabel, PricePoint, PriceSeries, RiskProfile, SentimentZone, Symbol};

// =============================================================================
// CSV Data Loading
// =============================================================================

const TIMESTAMP_COLUMNS: &[&str] = &["datetime", "date", "timestamp", "time"];

/// Column positions resolved from a CSV header row
#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    timestamp: usize,
    close: usize,
    volume: Option<usize>,
}

impl ColumnLayout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let timestamp = TIMESTAMP_COLUMNS
            .iter()
            .find_map(|name| find(name))
            .unwrap_or(0);
        let close = find("close").context("Missing close column")?;
        let volume = find("volume");

        Ok(Self {
            timestamp,
            close,
            volume,
        })
    }
}

/// Parse a timestamp as RFC 3339, `%Y-%m-%d %H:%M:%S`, or a bare date
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    s.parse::<DateTime<Utc>>()
        .or_else(|_| {
            DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z").map(|dt| dt.with_timezone(&Utc))
        })
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| {
                DateTime::<Utc>::from_naive_utc_and_offset(d.and_time(chrono::NaiveTime::MIN), Utc)
            })
        })
        .context(format!("Failed to parse datetime: {}", s))
}

/// Blank or null-like cells are missing prices, surfaced as NaN
fn parse_price(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() || ["nan", "null", "none", "n/a"].contains(&raw.to_lowercase().as_str()) {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>()
        .context(format!("Failed to parse price: {}", raw))
}

/// Load a price series from a CSV file, validating order and prices
pub fn load_csv(path: impl AsRef<Path>) -> Result<PriceSeries> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).context("Failed to open CSV file")?;
    let layout = ColumnLayout::from_headers(reader.headers().context("Failed to read header")?)?;

    let mut points = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.context(format!("Failed to read row {}", row_idx + 1))?;

        let timestamp = parse_timestamp(
            record
                .get(layout.timestamp)
                .context("Missing datetime column")?,
        )?;
        let close = parse_price(record.get(layout.close).context("Missing close column")?)
            .context(format!("Row {}", row_idx + 1))?;
        let volume = match layout.volume.and_then(|i| record.get(i)) {
            Some(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<f64>()
                    .context(format!("Failed to parse volume: {}", raw))?,
            ),
            _ => None,
        };

        points.push(PricePoint {
            timestamp,
            close,
            volume,
        });
    }

    let series = PriceSeries::new(points)
        .with_context(|| format!("Invalid price series in {}", path.display()))?;

    Ok(series)
}

/// Path of the CSV file holding `symbol` inside `data_dir`
pub fn symbol_path(data_dir: impl AsRef<Path>, symbol: &Symbol) -> PathBuf {
    data_dir.as_ref().join(format!("{}.csv", symbol.as_str()))
}

/// Load the `{SYMBOL}.csv` file for one symbol
pub fn load_symbol(data_dir: impl AsRef<Path>, symbol: &Symbol) -> Result<PriceSeries> {
    let path = symbol_path(data_dir, symbol);
    if !path.exists() {
        anyhow::bail!("Data file not found: {}", path.display());
    }

    let series = load_csv(&path).context(format!("Failed to load data for {}", symbol))?;
    info!("Loaded {} observations for {}", series.len(), symbol);
    Ok(series)
}

/// Outcome of loading many symbols: every symbol lands in exactly one list
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<(Symbol, PriceSeries)>,
    /// Symbols that could not be loaded, with the reason
    pub failed: Vec<(Symbol, String)>,
}

impl LoadReport {
    /// Split per-symbol results, logging each failure. Both lists are sorted by symbol.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = (Symbol, Result<PriceSeries>)>) -> Self {
        let mut report = LoadReport::default();

        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(series) => report.loaded.push((symbol, series)),
                Err(e) => {
                    warn!("Skipping {}: {:#}", symbol, e);
                    report.failed.push((symbol, format!("{:#}", e)));
                }
            }
        }

        report.loaded.sort_by(|a, b| a.0.cmp(&b.0));
        report.failed.sort_by(|a, b| a.0.cmp(&b.0));
        report
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

/// Load price series for multiple symbols, skipping missing or invalid files
pub fn load_multi_symbol(data_dir: impl AsRef<Path>, symbols: &[Symbol]) -> LoadReport {
    let data_dir = data_dir.as_ref();
    LoadReport::from_outcomes(
        symbols
            .iter()
            .map(|symbol| (symbol.clone(), load_symbol(data_dir, symbol))),
    )
}

// =============================================================================
// CSV Export
// =============================================================================

/// One exported row per classified point
#[derive(Debug, Serialize)]
struct ExportRow {
    timestamp: String,
    close: f64,
    volume: Option<f64>,
    baseline: f64,
    oscillator: f64,
    phase: PhaseLabel,
    sentiment: SentimentZone,
    volatility: Option<f64>,
    risk: Option<RiskProfile>,
}

/// Default export file name for a symbol
pub fn export_filename(symbol: &Symbol) -> String {
    format!("{}_marketpulse_data.csv", symbol.as_str())
}

/// Write every classified point to `path`, creating parent directories
pub fn export_csv(classification: &Classification<'_>, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    let mut writer = csv::Writer::from_path(path).context("Failed to create output file")?;

    for point in classification {
        writer.serialize(ExportRow {
            timestamp: point.point.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            close: point.point.close,
            volume: point.point.volume,
            baseline: point.baseline,
            oscillator: point.oscillator,
            phase: point.phase,
            sentiment: point.sentiment,
            volatility: point.volatility,
            risk: point.risk,
        })?;
    }
    writer.flush()?;

    info!(
        "Saved {} rows to {}",
        classification.len(),
        path.display()
    );
    Ok(path.to_path_buf())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::{ClassificationEngine, EngineConfig};
    use std::io::Write;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "market_pulse_{}_{}",
            name,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_file(path: &Path, contents: &str) {
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let a = parse_timestamp("2024-01-05").unwrap();
        let b = parse_timestamp("2024-01-05 00:00:00").unwrap();
        let c = parse_timestamp("2024-01-05T00:00:00Z").unwrap();
        let d = parse_timestamp("2024-01-04 19:00:00-05:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(c, d);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_load_csv_by_header_name() {
        let dir = temp_dir("load");
        let path = dir.join("NVDA.csv");
        write_file(
            &path,
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-02,10,11,9,10.5,1000\n\
             2024-01-03,10.5,12,10,11.5,\n",
        );

        let series = load_csv(&path).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].close, 10.5);
        assert_eq!(series.points()[0].volume, Some(1000.0));
        assert_eq!(series.points()[1].volume, None);
    }

    #[test]
    fn test_load_csv_rejects_missing_price() {
        let dir = temp_dir("missing");
        let path = dir.join("GAP.csv");
        write_file(&path, "date,close\n2024-01-02,10\n2024-01-03,\n");

        let err = load_csv(&path).unwrap_err();
        let validation = err.downcast_ref::<ValidationError>().unwrap();
        assert!(matches!(
            validation,
            ValidationError::MissingPrice { index: 1, .. }
        ));
    }

    #[test]
    fn test_load_csv_rejects_unordered_rows() {
        let dir = temp_dir("unordered");
        let path = dir.join("ODD.csv");
        write_file(&path, "date,close\n2024-01-03,10\n2024-01-02,11\n");

        let err = load_csv(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::NonMonotonicTimestamps { .. })
        ));
    }

    #[test]
    fn test_load_multi_symbol_reports_failures() {
        let dir = temp_dir("multi");
        write_file(&dir.join("AAPL.csv"), "date,close\n2024-01-02,10\n");
        write_file(&dir.join("GAP.csv"), "date,close\n2024-01-02,10\n2024-01-03,\n");

        let symbols = [Symbol::new("nope"), Symbol::new("GAP"), Symbol::new("aapl")];
        let report = load_multi_symbol(&dir, &symbols);

        assert_eq!(report.loaded.len(), 1);
        assert_eq!(report.loaded[0].0, Symbol::new("AAPL"));
        let failed: Vec<_> = report.failed.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(failed, vec!["GAP", "NOPE"]);
        assert!(report.failed[0].1.contains("missing close price"));
        assert!(report.failed[1].1.contains("Data file not found"));

        assert!(load_multi_symbol(&dir, &[Symbol::new("NOPE")]).is_empty());
    }

    #[test]
    fn test_export_csv_writes_all_points() {
        let dir = temp_dir("export");
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series = PriceSeries::from_daily_closes(start, &[10.0, 11.0, 12.0, 11.0, 13.0]).unwrap();
        let engine = ClassificationEngine::new(EngineConfig {
            trend_window: 3,
            oscillator_period: 2,
            volatility_window: 2,
            ..Default::default()
        })
        .unwrap();
        let classification = engine.classify(&series).unwrap();

        let path = export_csv(&classification, dir.join("out").join("TEST.csv")).unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        let lines: Vec<_> = contents.lines().collect();

        assert_eq!(lines.len(), 1 + classification.len());
        assert!(lines[0].starts_with("timestamp,close,volume,baseline,oscillator,phase"));
        assert!(lines[1].contains("Expansion") || lines[1].contains("Contraction"));
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(export_filename(&Symbol::new("nvda")), "NVDA_marketpulse_data.csv");
    }
}
