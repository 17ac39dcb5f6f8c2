//! Classify command implementation

use anyhow::{Context, Result};
use market_pulse::{data, ClassificationEngine, CurrentState, Symbol};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{load_config, EngineOverrides};

pub struct ClassifyArgs {
    pub config: Option<String>,
    pub file: Option<String>,
    pub symbol: String,
    pub overrides: EngineOverrides,
    pub history: usize,
    pub export: bool,
    pub output: Option<String>,
}

pub fn run(args: ClassifyArgs) -> Result<()> {
    info!("Starting classification");

    let config = load_config(args.config.as_deref(), &args.overrides)?;
    let symbol = Symbol::new(&args.symbol);

    let path = match &args.file {
        Some(file) => PathBuf::from(file),
        None => data::symbol_path(&config.data.data_dir, &symbol),
    };
    info!("Loading data from: {}", path.display());

    let series = data::load_csv(&path)
        .with_context(|| format!("Failed to load price data for {}", symbol))?;
    debug!("Loaded {} observations", series.len());

    let engine = ClassificationEngine::new(config.engine.clone())?;
    let classification = engine
        .classify(&series)
        .with_context(|| format!("Failed to classify {}", symbol))?;
    let state = classification.current_state();

    print_state(&symbol, &state, engine.config().trend_window);

    if args.history > 0 {
        let skip = classification.len().saturating_sub(args.history);
        println!(
            "{:<20} {:>12} {:>12} {:>8}  {:<12} {:<8}",
            "Timestamp", "Close", "Baseline", "Osc", "Phase", "Sentiment"
        );
        println!("{}", "-".repeat(78));
        for point in classification.iter().skip(skip) {
            println!(
                "{:<20} {:>12.2} {:>12.2} {:>8.2}  {:<12} {:<8}",
                point.point.timestamp.format("%Y-%m-%d %H:%M"),
                point.point.close,
                point.baseline,
                point.oscillator,
                format!("{:?}", point.phase),
                format!("{:?}", point.sentiment),
            );
        }
        println!("{}", "=".repeat(78));
    }

    if args.export || args.output.is_some() {
        let out = match args.output {
            Some(out) => PathBuf::from(out),
            None => Path::new(&config.data.results_dir).join(data::export_filename(&symbol)),
        };
        let written = data::export_csv(&classification, &out)?;
        println!("Exported {} rows to {}", classification.len(), written.display());
    }

    info!("Classification completed successfully");

    Ok(())
}

fn print_state(symbol: &Symbol, state: &CurrentState, window: usize) {
    println!("\n{}", "=".repeat(60));
    println!("{} STRATEGIC OVERVIEW", symbol);
    println!("{}", "=".repeat(60));
    println!("As of:              {}", state.timestamp.format("%Y-%m-%d %H:%M"));
    println!(
        "Asset Price:        {:.2} ({:+.2}%)",
        state.close, state.pct_change
    );
    println!("{}-Period Baseline: {:.2}", window, state.baseline);
    println!("Sentiment Index:    {:.2}", state.oscillator);
    match state.volatility {
        Some(v) => println!("Volatility:         {:.2}%", v),
        None => println!("Volatility:         n/a"),
    }
    println!("{}", "-".repeat(60));
    println!("Structural Trend:   {}", state.phase.headline());
    println!("                    {}", state.phase.description());
    println!("Market Sentiment:   {}", state.sentiment.headline());
    println!("                    {}", state.sentiment.description());
    if let Some(risk) = state.risk {
        println!("Volatility Profile: {}", risk.headline());
    }
    println!("{}", "=".repeat(60));
}
