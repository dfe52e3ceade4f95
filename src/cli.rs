//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::svg_chart::SvgChartAdapter;
use crate::domain::backtest::{
    BacktestConfig, BacktestResult, DEFAULT_FAST_SPAN, DEFAULT_INITIAL_CAPITAL, DEFAULT_QUANTITY,
    DEFAULT_SLOW_SPAN, run_backtest,
};
use crate::domain::config_validation::{parse_span, validate_backtest_config};
use crate::domain::error::EmacrossError;
use crate::domain::metrics::format_optional;
use crate::logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "emacross", about = "EMA crossover backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over a CSV file of bars
    Backtest(BacktestArgs),
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show bar count and date range of a CSV file
    Info {
        #[arg(short, long)]
        data: PathBuf,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct BacktestArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(short, long)]
    pub data: Option<PathBuf>,
    #[arg(short, long)]
    pub ticker: Option<String>,
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    #[arg(long)]
    pub fast: Option<usize>,
    #[arg(long)]
    pub slow: Option<usize>,
    #[arg(long)]
    pub quantity: Option<f64>,
    #[arg(long)]
    pub capital: Option<f64>,
    #[arg(long)]
    pub no_charts: bool,
    #[arg(long)]
    pub dry_run: bool,
}

/// Where a run reads from and writes to, after CLI overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub data_path: PathBuf,
    pub ticker: String,
    pub output_dir: PathBuf,
    pub charts: bool,
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(&cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn execute(command: &Command) -> Result<(), EmacrossError> {
    match command {
        Command::Backtest(args) if args.dry_run => run_dry_run(args),
        Command::Backtest(args) => run_backtest_command(args),
        Command::Validate { config } => run_validate(config),
        Command::Info { data } => run_info(data),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, EmacrossError> {
    FileConfigAdapter::from_file(path).map_err(|e| EmacrossError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Load the optional config file and start logging at its configured level.
fn load_and_init(path: Option<&Path>) -> Result<FileConfigAdapter, EmacrossError> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => FileConfigAdapter::empty(),
    };
    logging::init_logging(&logging::configured_level(&config));
    if let Some(path) = path {
        info!(path = %path.display(), "config loaded");
    }
    Ok(config)
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, EmacrossError> {
    validate_backtest_config(config)?;
    Ok(BacktestConfig {
        ema_fast_span: parse_span(config, "ema_fast_span", DEFAULT_FAST_SPAN)?,
        ema_slow_span: parse_span(config, "ema_slow_span", DEFAULT_SLOW_SPAN)?,
        quantity: config.get_double("backtest", "quantity", DEFAULT_QUANTITY),
        initial_capital: config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL),
    })
}

/// Command-line values win over file values.
pub fn apply_overrides(config: BacktestConfig, args: &BacktestArgs) -> BacktestConfig {
    BacktestConfig {
        ema_fast_span: args.fast.unwrap_or(config.ema_fast_span),
        ema_slow_span: args.slow.unwrap_or(config.ema_slow_span),
        quantity: args.quantity.unwrap_or(config.quantity),
        initial_capital: args.capital.unwrap_or(config.initial_capital),
    }
}

pub fn resolve_settings(
    args: &BacktestArgs,
    config: &dyn ConfigPort,
) -> Result<RunSettings, EmacrossError> {
    let data_path = match &args.data {
        Some(path) => path.clone(),
        None => config
            .get_string("data", "path")
            .map(PathBuf::from)
            .ok_or_else(|| EmacrossError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            })?,
    };

    let ticker = args
        .ticker
        .clone()
        .or_else(|| config.get_string("data", "ticker"))
        .unwrap_or_else(|| ticker_from_path(&data_path));

    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| config.get_string("report", "output_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    let charts = !args.no_charts && config.get_bool("report", "charts", true);

    Ok(RunSettings {
        data_path,
        ticker,
        output_dir,
        charts,
    })
}

/// File stem of the data file, e.g. `RELIANCE.NS` for `data/RELIANCE.NS.csv`.
pub fn ticker_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "data".to_string())
}

/// Fetch, backtest and hand the result to every reporter.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    ticker: &str,
    config: &BacktestConfig,
    output_dir: &Path,
    reporters: &[&dyn ReportPort],
) -> Result<(BacktestResult, Vec<PathBuf>), EmacrossError> {
    let bars = data_port.fetch_bars(ticker)?;
    info!(ticker, bars = bars.len(), "bars loaded");

    let result = run_backtest(&bars, config)?;

    let mut written = Vec::new();
    for reporter in reporters {
        written.extend(reporter.write(&result, ticker, output_dir)?);
    }
    Ok((result, written))
}

/// Human-facing summary of a run.
pub fn format_summary(result: &BacktestResult, ticker: &str) -> String {
    let mut lines = vec![
        String::new(),
        format!(
            "=== {} | {} / {} Crossover ===",
            ticker, result.ema_fast.indicator_type, result.ema_slow.indicator_type
        ),
    ];
    if let (Some(first), Some(last)) = (result.bars.first(), result.bars.last()) {
        lines.push(format!(
            "Bars:             {} ({} to {})",
            result.bars.len(),
            first.timestamp,
            last.timestamp
        ));
    }
    lines.push(format!("Trades:           {}", result.ledger.len()));
    lines.push(format!("Initial Capital:  {:.2}", result.initial_capital));
    lines.push(format!("Final Equity:     {:.2}", result.final_equity()));

    lines.push(String::new());
    lines.push(format!(
        "{:<8} {:>12} {:>10} {:>7} {:>5} {:>7} {:>11} {:>14} {:>10} {:>10}",
        "Category",
        "Net_PnL",
        "Net_PnL_%",
        "Trades",
        "Wins",
        "Losses",
        "Win_Rate_%",
        "Profit_Factor",
        "Max_Win",
        "Max_Loss"
    ));
    lines.extend(result.metrics.iter().map(|m| {
        format!(
            "{:<8} {:>12.2} {:>10.2} {:>7} {:>5} {:>7} {:>11.2} {:>14} {:>10} {:>10}",
            m.category,
            m.net_pnl,
            m.net_pnl_pct,
            m.trades,
            m.wins,
            m.losses,
            m.win_rate_pct,
            format_optional(m.profit_factor, 2),
            format_optional(m.max_win, 2),
            format_optional(m.max_loss, 2),
        )
    }));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn run_backtest_command(args: &BacktestArgs) -> Result<(), EmacrossError> {
    let config = load_and_init(args.config.as_deref())?;
    let bt_config = apply_overrides(build_backtest_config(&config)?, args);
    bt_config.validate()?;
    let settings = resolve_settings(args, &config)?;

    eprintln!(
        "Running {} / {} crossover on {}",
        bt_config.ema_fast_span,
        bt_config.ema_slow_span,
        settings.data_path.display()
    );

    let data_port = CsvAdapter::from_file(settings.data_path.clone());
    let csv_report = CsvReportAdapter::new();
    let svg_chart = SvgChartAdapter::new();
    let mut reporters: Vec<&dyn ReportPort> = vec![&csv_report];
    if settings.charts {
        reporters.push(&svg_chart);
    }

    let (result, written) = run_backtest_pipeline(
        &data_port,
        &settings.ticker,
        &bt_config,
        &settings.output_dir,
        &reporters,
    )?;

    eprint!("{}", format_summary(&result, &settings.ticker));
    eprintln!("\nReports written to: {}", settings.output_dir.display());
    for path in &written {
        eprintln!("  {}", path.display());
    }
    Ok(())
}

pub fn run_dry_run(args: &BacktestArgs) -> Result<(), EmacrossError> {
    let config = load_and_init(args.config.as_deref())?;
    let bt_config = apply_overrides(build_backtest_config(&config)?, args);
    bt_config.validate()?;
    let settings = resolve_settings(args, &config)?;
    eprintln!("Config validated successfully");

    eprintln!("\nParameters:");
    eprintln!("  ema_fast_span:   {}", bt_config.ema_fast_span);
    eprintln!("  ema_slow_span:   {}", bt_config.ema_slow_span);
    eprintln!("  quantity:        {}", bt_config.quantity);
    eprintln!("  initial_capital: {:.2}", bt_config.initial_capital);

    let data_port = CsvAdapter::from_file(settings.data_path.clone());
    let range = data_port
        .data_range(&settings.ticker)?
        .ok_or(EmacrossError::EmptySeries)?;

    eprintln!("\nData:");
    eprintln!("  file:    {}", settings.data_path.display());
    eprintln!("  ticker:  {}", settings.ticker);
    eprintln!("  bars:    {} ({} to {})", range.2, range.0, range.1);
    eprintln!("  reports: {}", settings.output_dir.display());
    eprintln!("  charts:  {}", settings.charts);

    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

pub fn run_validate(config_path: &Path) -> Result<(), EmacrossError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_and_init(Some(config_path))?;
    let bt_config = build_backtest_config(&config)?;

    eprintln!("  ema_fast_span:   {}", bt_config.ema_fast_span);
    eprintln!("  ema_slow_span:   {}", bt_config.ema_slow_span);
    eprintln!("  quantity:        {}", bt_config.quantity);
    eprintln!("  initial_capital: {:.2}", bt_config.initial_capital);
    if let Some(path) = config.get_string("data", "path") {
        eprintln!("  data path:       {}", path);
    }

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

pub fn run_info(data_path: &Path) -> Result<(), EmacrossError> {
    logging::init_logging(logging::DEFAULT_LOG_LEVEL);
    let ticker = ticker_from_path(data_path);
    let data_port = CsvAdapter::from_file(data_path.to_path_buf());

    match data_port.data_range(&ticker)? {
        Some((first, last, count)) => {
            println!("{}: {} bars, {} to {}", ticker, count, first, last);
        }
        None => {
            eprintln!("{}: no data found", ticker);
        }
    }
    Ok(())
}
