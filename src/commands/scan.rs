//! Scan command: classify many assets at once

use anyhow::{Context, Result};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use itertools::Itertools;
use market_pulse::data::{self, LoadReport};
use market_pulse::{AssetState, ClassificationEngine, Symbol};
use rayon::prelude::*;
use std::path::Path;
use tracing::{info, warn};

use super::{load_config, EngineOverrides};

pub struct ScanArgs {
    pub config: Option<String>,
    pub symbols: Option<String>,
    pub data_dir: Option<String>,
    pub overrides: EngineOverrides,
    pub export: bool,
    pub sequential: bool,
}

/// Parse comma-separated symbols
fn parse_symbols(s: &str) -> Vec<Symbol> {
    s.split(',')
        .map(str::trim)
        .filter(|sym| !sym.is_empty())
        .map(Symbol::new)
        .unique()
        .collect()
}

pub fn run(args: ScanArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref(), &args.overrides)?;
    if let Some(dir) = args.data_dir {
        info!("Overriding data directory to: {}", dir);
        config.data.data_dir = dir;
    }

    let symbols = match &args.symbols {
        Some(s) => parse_symbols(s),
        None => config.data.symbols(),
    };
    if symbols.is_empty() {
        anyhow::bail!("No symbols to scan");
    }

    println!("\n{}", "=".repeat(70));
    println!("MARKET SCAN");
    println!("{}", "=".repeat(70));
    println!("  Symbols:       {}", symbols.iter().join(", "));
    println!("  Data dir:      {}", config.data.data_dir);
    println!(
        "  Engine:        window={} period={} smoothing={}",
        config.engine.trend_window, config.engine.oscillator_period, config.engine.smoothing
    );
    println!(
        "  Mode:          {}",
        if args.sequential { "sequential" } else { "parallel" }
    );
    println!("{}\n", "=".repeat(70));

    let engine = ClassificationEngine::new(config.engine.clone())?;

    let report = load_assets(&config.data.data_dir, &symbols, args.sequential)?;
    let rows = scan_rows(&engine, &report, args.sequential);
    print_table(&rows);

    if report.is_empty() {
        anyhow::bail!("No data loaded for any symbol");
    }

    if args.export {
        for (symbol, series) in &report.loaded {
            match engine.classify(series) {
                Ok(classification) => {
                    let out = Path::new(&config.data.results_dir).join(data::export_filename(symbol));
                    data::export_csv(&classification, &out)
                        .with_context(|| format!("Failed to export {}", symbol))?;
                }
                Err(e) => warn!("Skipping export for {}: {}", symbol, e),
            }
        }
        println!("Exported results to {}", config.data.results_dir);
    }

    info!(
        "Scan completed: {} classified, {} failed to load",
        report.loaded.len(),
        report.failed.len()
    );

    Ok(())
}

/// One line of the scan table
#[derive(Debug)]
enum ScanRow {
    Classified(AssetState),
    LoadFailed { symbol: Symbol, reason: String },
}

impl ScanRow {
    fn symbol(&self) -> &Symbol {
        match self {
            ScanRow::Classified(asset) => &asset.symbol,
            ScanRow::LoadFailed { symbol, .. } => symbol,
        }
    }
}

/// Load every symbol's CSV. Missing or invalid files are reported, never fatal.
fn load_assets(data_dir: &str, symbols: &[Symbol], sequential: bool) -> Result<LoadReport> {
    if sequential {
        return Ok(data::load_multi_symbol(data_dir, symbols));
    }

    let pb = ProgressBar::new(symbols.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("⚡ {percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}] {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("█░ "),
    );
    pb.set_message("loading...");

    let outcomes: Vec<_> = symbols
        .par_iter()
        .progress_with(pb.clone())
        .map(|symbol| (symbol.clone(), data::load_symbol(data_dir, symbol)))
        .collect();
    let report = LoadReport::from_outcomes(outcomes);

    pb.finish_with_message(format!("{} loaded", report.loaded.len()));
    Ok(report)
}

/// Classify the loaded assets and merge in load failures, sorted by symbol
fn scan_rows(engine: &ClassificationEngine, report: &LoadReport, sequential: bool) -> Vec<ScanRow> {
    let states = if sequential {
        engine.classify_batch_sequential(&report.loaded)
    } else {
        engine.classify_batch(&report.loaded)
    };

    let mut rows: Vec<ScanRow> = states
        .into_iter()
        .map(ScanRow::Classified)
        .chain(
            report
                .failed
                .iter()
                .map(|(symbol, reason)| ScanRow::LoadFailed {
                    symbol: symbol.clone(),
                    reason: reason.clone(),
                }),
        )
        .collect();
    rows.sort_by(|a, b| a.symbol().cmp(b.symbol()));
    rows
}

fn print_table(rows: &[ScanRow]) {
    println!(
        "\n{:<8} {:>12} {:>9} {:>12} {:>7} {:>7}  {:<12} {:<8} {:<15}",
        "Symbol", "Close", "Chg %", "Baseline", "Osc", "Vol %", "Phase", "Sentiment", "Risk"
    );
    println!("{}", "-".repeat(100));

    for row in rows {
        match row {
            ScanRow::Classified(AssetState {
                symbol,
                state: Ok(state),
            }) => println!(
                "{:<8} {:>12.2} {:>+9.2} {:>12.2} {:>7.2} {:>7}  {:<12} {:<8} {:<15}",
                symbol,
                state.close,
                state.pct_change,
                state.baseline,
                state.oscillator,
                state
                    .volatility
                    .map(|v| format!("{:.2}", v))
                    .unwrap_or_else(|| "n/a".to_string()),
                format!("{:?}", state.phase),
                format!("{:?}", state.sentiment),
                state.risk.map(|r| r.headline()).unwrap_or("n/a"),
            ),
            ScanRow::Classified(AssetState {
                symbol,
                state: Err(e),
            }) => println!("{:<8} ⚠ {}", symbol, e),
            ScanRow::LoadFailed { symbol, reason } => {
                println!("{:<8} ⚠ load failed: {}", symbol, reason)
            }
        }
    }

    println!("{}", "=".repeat(100));
}
