//! Vantage CLI: signal, simulation and correlation commands over CSV data.
//!
//! Commands:
//! - `analyze`: full signal report for a bar file
//! - `simulate`: Monte Carlo risk simulation for a bar file
//! - `correlate`: sentiment→price correlation from sentiment and price files
//! - `config`: print the default configuration or validate a file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vantage_core::domain::{Direction, Timeframe};
use vantage_core::sentiment::SentimentCorrelationEngine;
use vantage_runner::{
    load_bars, load_prices, load_sentiment, AnalyticsConfig, CorrelationMonitor, MonteCarloSimulator,
    SignalPipeline, SignalReport, SimulationMode, SimulationRequest,
};

#[derive(Parser)]
#[command(
    name = "vantage",
    about = "Vantage: technical signal and risk analytics"
)]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Analytics configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score the latest bar of a window and attach risk, sizing and simulation.
    Analyze {
        /// Bars CSV: timestamp,open,high,low,close,volume.
        #[arg(long)]
        bars: PathBuf,

        #[arg(long)]
        symbol: String,

        /// 1m, 5m, 15m, 30m, 1h, 4h, 1d, 1w or 1M.
        #[arg(long, default_value = "1h")]
        timeframe: Timeframe,

        /// Sentiment CSV for the correlation enrichment (needs --prices).
        #[arg(long, requires = "prices")]
        sentiment: Option<PathBuf>,

        /// Price tick CSV: timestamp,price.
        #[arg(long, requires = "sentiment")]
        prices: Option<PathBuf>,

        /// Print the report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run a Monte Carlo risk simulation over the bar file's returns.
    Simulate {
        #[arg(long)]
        bars: PathBuf,

        #[arg(long)]
        symbol: String,

        #[arg(long, default_value = "1h")]
        timeframe: Timeframe,

        #[arg(long, value_enum, default_value_t = Side::Long)]
        side: Side,

        /// Override the configured master seed.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Correlate sentiment with forward price returns across the lag scan.
    Correlate {
        #[arg(long)]
        sentiment: PathBuf,

        #[arg(long)]
        prices: PathBuf,

        #[arg(long)]
        symbol: String,
    },
    /// Print the default configuration, or validate `--config`.
    Config {
        /// Validate the file given with --config instead of printing defaults.
        #[arg(long, default_value_t = false)]
        check: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    Long,
    Short,
}

impl From<Side> for Direction {
    fn from(side: Side) -> Self {
        match side {
            Side::Long => Direction::Long,
            Side::Short => Direction::Short,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Config { check } => run_config(cli.config.as_deref(), check),
        Commands::Analyze {
            bars,
            symbol,
            timeframe,
            sentiment,
            prices,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let inputs = sentiment.zip(prices);
            run_analyze(&config, &bars, &symbol, timeframe, inputs, json)
        }
        Commands::Simulate {
            bars,
            symbol,
            timeframe,
            side,
            seed,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_simulate(&config, &bars, &symbol, timeframe, side.into(), seed)
        }
        Commands::Correlate {
            sentiment,
            prices,
            symbol,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_correlate(&config, &sentiment, &prices, &symbol)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig> {
    match path {
        Some(path) => AnalyticsConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(AnalyticsConfig::default()),
    }
}

fn run_config(path: Option<&Path>, check: bool) -> Result<()> {
    if !check {
        print!("{}", AnalyticsConfig::default().to_toml()?);
        return Ok(());
    }
    let Some(path) = path else {
        bail!("--check needs --config <file>");
    };
    let config = load_config(Some(path))?;
    println!(
        "{} is valid (weights v{}, fingerprint {})",
        path.display(),
        config.weights.version,
        config.weights.fingerprint()
    );
    Ok(())
}

fn correlation_monitor(
    config: &AnalyticsConfig,
    symbol: &str,
    sentiment: &Path,
    prices: &Path,
) -> Result<CorrelationMonitor> {
    let monitor = CorrelationMonitor::new(SentimentCorrelationEngine::new(config.correlation.clone())?);
    for score in load_sentiment(sentiment)? {
        monitor.record_sentiment(symbol, score)?;
    }
    for tick in load_prices(prices)? {
        monitor.record_price(symbol, tick)?;
    }
    Ok(monitor)
}

fn run_analyze(
    config: &AnalyticsConfig,
    bars_path: &Path,
    symbol: &str,
    timeframe: Timeframe,
    sentiment_inputs: Option<(PathBuf, PathBuf)>,
    json: bool,
) -> Result<()> {
    let bars = load_bars(bars_path).with_context(|| format!("loading bars {}", bars_path.display()))?;
    info!(symbol, %timeframe, bars = bars.len(), "analyzing");

    let mut pipeline = SignalPipeline::from_config(config)?;
    if let Some((sentiment, prices)) = sentiment_inputs {
        let monitor = correlation_monitor(config, symbol, &sentiment, &prices)?;
        pipeline = pipeline.with_correlations(Arc::new(monitor));
    }

    let report = pipeline.analyze_with(symbol, timeframe, &bars, SimulationMode::Wait)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run_simulate(
    config: &AnalyticsConfig,
    bars_path: &Path,
    symbol: &str,
    timeframe: Timeframe,
    direction: Direction,
    seed: Option<u64>,
) -> Result<()> {
    let bars = load_bars(bars_path).with_context(|| format!("loading bars {}", bars_path.display()))?;
    let mut mc = config.monte_carlo.clone();
    if let Some(seed) = seed {
        mc.seed = seed;
    }
    info!(symbol, %timeframe, %direction, seed = mc.seed, "simulating");
    let simulator = MonteCarloSimulator::new(mc)?;
    let request = SimulationRequest::from_bars(symbol, timeframe, direction, &bars);
    let result = simulator.simulate(&request)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_correlate(config: &AnalyticsConfig, sentiment: &Path, prices: &Path, symbol: &str) -> Result<()> {
    let monitor = correlation_monitor(config, symbol, sentiment, prices)?;
    let result = monitor.correlate(symbol);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn print_report(report: &SignalReport) {
    let s = &report.signal;
    println!();
    println!("=== {} {} @ {} ===", s.symbol, s.timeframe, report.as_of);
    println!("Direction:      {}", s.direction);
    println!("Confidence:     {:.1}", s.confidence);
    println!("Confluence:     {:+.3}", s.confluence);
    println!("Entry:          {:.4}", s.entry_price);
    println!(
        "Volatility:     {} (ATR {:.2}% of price)",
        report.volatility.tier, report.volatility.atr_percentage
    );
    println!("Weights:        v{}", s.weights_version);

    match &report.risk_levels {
        Some(levels) => {
            println!();
            println!("Stop loss:      {:.4}", levels.stop_loss);
            println!("Take profit:    {:.4}", levels.take_profit);
            println!(
                "Risk/reward:    {:.2}{}",
                levels.risk_reward_ratio,
                if levels.actionable { "" } else { "  (below minimum, not actionable)" }
            );
        }
        None => println!("Risk levels:    n/a"),
    }

    match &report.position_sizing {
        Some(sizing) if sizing.not_actionable => {
            println!("Sizing:         none (levels not actionable)");
        }
        Some(sizing) if sizing.insufficient_statistics => {
            println!("Sizing:         insufficient trade statistics");
        }
        Some(sizing) => {
            println!(
                "Sizing:         kelly {:.3}, risk {:.2} ({:.2}% of account)",
                sizing.kelly_fraction, sizing.risk_amount, sizing.risk_percentage_of_account
            );
            if let Some(units) = sizing.units {
                println!("Units:          {units:.4}");
            }
        }
        None => println!("Sizing:         n/a"),
    }

    match &report.simulation {
        Some(sim) => {
            println!();
            println!(
                "Monte Carlo:    {} paths x {} bars",
                sim.paths, sim.horizon_bars
            );
            println!("Volatility:     {:.2}% annualised", sim.volatility_percent);
            println!("VaR:            {:.2}%", sim.value_at_risk);
            println!("Win prob:       {:.1}%", sim.win_probability);
            println!("Expected:       {:+.2}%", sim.expected_return);
        }
        None => println!("Monte Carlo:    n/a"),
    }

    match &report.correlation {
        Some(c) => {
            println!();
            println!(
                "Sentiment:      r {:+.3} at {} min lag ({} samples, confidence {:.2}){}",
                c.correlation,
                c.optimal_lag_millis / 60_000,
                c.sample_size,
                c.confidence_level,
                if c.is_leading_indicator { ", leading" } else { "" }
            );
        }
        None => println!("Sentiment:      n/a"),
    }
}
