//! MarketPulse - main entry point
//!
//! This binary provides two subcommands:
//! - classify: Classify one asset's price history and print its current state
//! - scan: Classify many assets in parallel and print a summary table

use anyhow::Result;
use clap::{Parser, Subcommand};
use market_pulse::Smoothing;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::classify::ClassifyArgs;
use commands::scan::ScanArgs;
use commands::EngineOverrides;

#[derive(Parser, Debug)]
#[command(name = "market-pulse")]
#[command(about = "Business phase and sentiment classification for price series", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a single asset
    Classify {
        /// Ticker symbol (used to locate {data_dir}/{SYMBOL}.csv and name exports)
        #[arg(short, long, default_value = "NVDA")]
        symbol: String,

        /// CSV file to read instead of the data directory
        #[arg(short, long)]
        file: Option<String>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Trend baseline window (overrides config file)
        #[arg(long)]
        window: Option<usize>,

        /// Oscillator period (overrides config file)
        #[arg(long)]
        period: Option<usize>,

        /// Oscillator smoothing: simple, wilder or exponential
        #[arg(long)]
        smoothing: Option<Smoothing>,

        /// Print the last N classified points
        #[arg(long, default_value = "0")]
        history: usize,

        /// Export classified points to {results_dir}/{SYMBOL}_marketpulse_data.csv
        #[arg(long)]
        export: bool,

        /// Export to this path instead
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Classify many assets in parallel
    Scan {
        /// Symbols to scan (comma-separated). E.g., "NVDA,TSLA,AAPL"
        #[arg(long)]
        symbols: Option<String>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Data directory (overrides config file)
        #[arg(short, long)]
        data_dir: Option<String>,

        /// Trend baseline window (overrides config file)
        #[arg(long)]
        window: Option<usize>,

        /// Oscillator period (overrides config file)
        #[arg(long)]
        period: Option<usize>,

        /// Oscillator smoothing: simple, wilder or exponential
        #[arg(long)]
        smoothing: Option<Smoothing>,

        /// Export every asset's classified points to the results directory
        #[arg(long)]
        export: bool,

        /// Run sequentially instead of parallel
        #[arg(long)]
        sequential: bool,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Log file naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // Scan draws a progress bar, so keep the console clean
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Classify { .. } => ("classify", false),
        Commands::Scan { .. } => ("scan", true),
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    match cli.command {
        Commands::Classify {
            symbol,
            file,
            config,
            window,
            period,
            smoothing,
            history,
            export,
            output,
        } => commands::classify::run(ClassifyArgs {
            config,
            file,
            symbol,
            overrides: EngineOverrides {
                window,
                period,
                smoothing,
            },
            history,
            export,
            output,
        }),

        Commands::Scan {
            symbols,
            config,
            data_dir,
            window,
            period,
            smoothing,
            export,
            sequential,
        } => commands::scan::run(ScanArgs {
            config,
            symbols,
            data_dir,
            overrides: EngineOverrides {
                window,
                period,
                smoothing,
            },
            export,
            sequential,
        }),
    }
}
