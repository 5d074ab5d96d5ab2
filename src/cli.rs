//! CLI definition and dispatch.
//!
//! The score and backtest pipelines are written against the port traits so
//! tests can drive them with in-memory ports.

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::basket::{validate_basket, BasketValidation};
use crate::domain::diagnostic::{Diagnostic, DiagnosticKind};
use crate::domain::error::ScoreTraderError;
use crate::domain::factor::FactorKind;
use crate::domain::metrics::Metrics;
use crate::domain::price_history::PriceHistory;
use crate::domain::run_config::{build_run_config, RunConfig};
use crate::domain::scorer::{score_stocks, ScoringOutcome};
use crate::domain::selector::select_top_n;
use crate::domain::simulator::{simulate, SimulationResult};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;
use crate::ports::score_store_port::ScoreStorePort;

#[derive(Parser, Debug)]
#[command(name = "scoretrader", about = "Multi-factor equity scoring and buy-and-hold backtest")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(short, long, default_value = "scoretrader.ini")]
    pub config: PathBuf,
    /// Run date (YYYY-MM-DD), overrides [run] run_date
    #[arg(long, value_parser = parse_date_arg)]
    pub date: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score the universe and write the factor score table
    Score(RunArgs),
    /// Replay the top-N basket picked on the rebalance date
    Backtest(RunArgs),
    /// Backtest, then score (daily job order)
    Run(RunArgs),
    /// Validate a configuration file
    Validate(RunArgs),
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);
    match cli.command {
        Command::Score(args) => run_score(&args),
        Command::Backtest(args) => run_backtest(&args),
        Command::Run(args) => run_daily(&args),
        Command::Validate(args) => run_validate(&args),
    }
}

/// Stderr subscriber; `RUST_LOG` takes precedence over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn report_error(err: &ScoreTraderError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ScoreTraderError> {
    tracing::info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Load and validate the configuration named by `args`.
pub fn load_run_config(args: &RunArgs) -> Result<RunConfig, ScoreTraderError> {
    let adapter = load_config(&args.config)?;
    build_run_config(&adapter, args.date)
}

fn run_score(args: &RunArgs) -> ExitCode {
    let outcome = load_run_config(args).and_then(|cfg| {
        let adapter = CsvAdapter::new(cfg.paths.clone());
        run_score_pipeline(&adapter, &adapter, &cfg).map(|report| (cfg, report))
    });
    match outcome {
        Ok((cfg, report)) => {
            print_score_summary(&cfg, &report);
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

fn run_backtest(args: &RunArgs) -> ExitCode {
    let outcome = load_run_config(args).and_then(|cfg| {
        let adapter = CsvAdapter::new(cfg.paths.clone());
        run_backtest_pipeline(&adapter, &adapter, &adapter, &cfg).map(|report| (cfg, report))
    });
    match outcome {
        Ok((cfg, report)) => {
            print_backtest_summary(&cfg, &report);
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

/// Backtest yesterday's pick, then score today. Scoring runs even when the
/// backtest fails; the exit code reports the first failure.
fn run_daily(args: &RunArgs) -> ExitCode {
    let cfg = match load_run_config(args) {
        Ok(c) => c,
        Err(e) => return report_error(&e),
    };
    let adapter = CsvAdapter::new(cfg.paths.clone());
    let daily = run_daily_pipeline(&adapter, &adapter, &adapter, &cfg);

    match &daily.backtest {
        Ok(report) => print_backtest_summary(&cfg, report),
        Err(e) => {
            report_error(e);
        }
    }
    match &daily.score {
        Ok(report) => print_score_summary(&cfg, report),
        Err(e) => {
            report_error(e);
        }
    }
    daily.exit_code()
}

/// Outcome of both stages of the daily job.
#[derive(Debug)]
pub struct DailyReport {
    pub backtest: Result<BacktestReport, ScoreTraderError>,
    pub score: Result<ScoreReport, ScoreTraderError>,
}

impl DailyReport {
    /// Failures in stage order.
    pub fn errors(&self) -> Vec<&ScoreTraderError> {
        [self.backtest.as_ref().err(), self.score.as_ref().err()]
            .into_iter()
            .flatten()
            .collect()
    }

    pub fn exit_code(&self) -> ExitCode {
        self.errors()
            .first()
            .map_or(ExitCode::SUCCESS, |e| ExitCode::from(*e))
    }
}

pub fn run_daily_pipeline(
    data: &dyn DataPort,
    store: &dyn ScoreStorePort,
    report: &dyn ReportPort,
    cfg: &RunConfig,
) -> DailyReport {
    let backtest = run_backtest_pipeline(data, store, report, cfg);
    let score = run_score_pipeline(data, store, cfg);
    DailyReport { backtest, score }
}

pub fn run_validate(args: &RunArgs) -> ExitCode {
    match load_run_config(args) {
        Ok(cfg) => {
            eprintln!("Config validated successfully");
            eprintln!("  Run date:      {}", cfg.run_date);
            eprintln!("  Tickers:       {}", cfg.tickers.join(", "));
            eprintln!(
                "  Factors:       {}",
                cfg.scoring
                    .factors
                    .iter()
                    .map(FactorKind::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            eprintln!(
                "  Rebalance:     {} (lookback {} days, top {})",
                cfg.rebalance_date(),
                cfg.lookback_days,
                cfg.top_n
            );
            eprintln!("  Initial cash:  {:.2}", cfg.initial_cash);
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

#[derive(Debug, Clone)]
pub struct ScoreReport {
    pub path: PathBuf,
    pub outcome: ScoringOutcome,
    pub top: Vec<String>,
}

/// Load today's inputs, score the universe and persist the score table.
pub fn run_score_pipeline(
    data: &dyn DataPort,
    store: &dyn ScoreStorePort,
    cfg: &RunConfig,
) -> Result<ScoreReport, ScoreTraderError> {
    let rows: Vec<_> = data
        .load_factor_table(cfg.run_date)?
        .into_iter()
        .filter(|r| cfg.tickers.contains(&r.ticker.to_uppercase()))
        .collect();

    let history = if cfg.scoring.factors.contains(&FactorKind::Momentum) {
        data.load_price_history(cfg.run_date)?
            .until(cfg.run_date)
            .select(&cfg.tickers)
    } else {
        PriceHistory::default()
    };

    let mut outcome = score_stocks(&rows, &history, &cfg.scoring)?;

    for ticker in &cfg.tickers {
        let in_table = rows.iter().any(|r| r.ticker.eq_ignore_ascii_case(ticker));
        let reported = outcome.diagnostics.iter().any(|d| &d.ticker == ticker);
        if !in_table && !reported {
            let diag = Diagnostic::new(ticker.clone(), DiagnosticKind::NotInFactorTable);
            tracing::warn!(%diag, "excluded from scoring");
            outcome.diagnostics.push(diag);
        }
    }

    let path = store.write_scores(cfg.run_date, &outcome.table)?;
    let top = select_top_n(&outcome.table.rows, cfg.top_n);
    tracing::info!(top = ?top, "selected");

    Ok(ScoreReport { path, outcome, top })
}

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub path: PathBuf,
    pub rebalance_date: NaiveDate,
    pub basket: Vec<String>,
    pub validation: BasketValidation,
    pub result: SimulationResult,
    pub metrics: Metrics,
}

/// Replay the top-N pick from `run_date - lookback_days` up to the day
/// before `run_date` and write the returns table.
pub fn run_backtest_pipeline(
    data: &dyn DataPort,
    store: &dyn ScoreStorePort,
    report: &dyn ReportPort,
    cfg: &RunConfig,
) -> Result<BacktestReport, ScoreTraderError> {
    let rebalance_date = cfg.rebalance_date();
    let table = store.read_scores(rebalance_date)?;
    let basket = select_top_n(&table.rows, cfg.top_n);
    if basket.is_empty() {
        return Err(ScoreTraderError::insufficient(
            format!("tickers in score table for {rebalance_date}"),
            0,
            1,
        ));
    }
    tracing::info!(%rebalance_date, basket = ?basket, "basket selected");

    let history = data.load_price_history(cfg.run_date)?;
    let window = history.window(rebalance_date, cfg.replay_end());
    tracing::debug!(days = window.day_count(), "replay window");

    let validation = validate_basket(&basket, &window, cfg.basket_policy)?;
    let result = simulate(
        cfg.initial_cash,
        &validation.tickers,
        &window,
        cfg.missing_price,
    )?;
    let metrics = Metrics::compute(&result, cfg.risk_free_rate);
    let path = report.write_returns(cfg.run_date, &result.series)?;

    Ok(BacktestReport {
        path,
        rebalance_date,
        basket,
        validation,
        result,
        metrics,
    })
}

fn format_score(score: Option<f64>) -> String {
    match score {
        Some(v) => format!("{v:>8.3}"),
        None => format!("{:>8}", "-"),
    }
}

pub fn print_score_summary(cfg: &RunConfig, report: &ScoreReport) {
    let table = &report.outcome.table;
    let ranked = select_top_n(&table.rows, table.len());

    eprintln!("\n=== Factor Scores {} ===", cfg.run_date);
    let header: String = table
        .factors
        .iter()
        .map(|f| format!("{:>8}", f.column()))
        .collect();
    eprintln!("  {:<8}{}{:>10}", "ticker", header, "total");
    for ticker in &ranked {
        if let Some(row) = table.get(ticker) {
            let cells: String = row.factor_scores.iter().map(|s| format_score(*s)).collect();
            eprintln!("  {:<8}{}{:>10.3}", row.ticker, cells, row.total_score);
        }
    }
    if !table.excluded.is_empty() {
        let names: Vec<String> = table.excluded.iter().map(FactorKind::to_string).collect();
        eprintln!("Excluded factors: {} (no cross-sectional variance)", names.join(", "));
    }
    if !report.outcome.diagnostics.is_empty() {
        eprintln!("Skipped: {} tickers", report.outcome.diagnostics.len());
    }
    eprintln!("Top {}: {}", cfg.top_n, report.top.join(", "));
    eprintln!("Scores written to: {}", report.path.display());
}

pub fn print_backtest_summary(cfg: &RunConfig, report: &BacktestReport) {
    let result = &report.result;
    let m = &report.metrics;

    eprintln!(
        "\n=== Backtest {} -> {} ===",
        report.rebalance_date,
        cfg.replay_end()
    );
    eprintln!("Basket:           {}", report.basket.join(", "));
    eprintln!("Entry Date:       {}", result.entry_date);
    for h in &result.holdings {
        match result.unrealized_pnl(h) {
            Some(pnl) => eprintln!(
                "  {}: {} shares @ {:.2}  P&L {:+.2}",
                h.ticker, h.shares, h.entry_price, pnl
            ),
            None => eprintln!("  {}: {} shares @ {:.2}", h.ticker, h.shares, h.entry_price),
        }
    }
    eprintln!("Idle Cash:        {:.2}", result.idle_cash);
    eprintln!("Final Value:      {:.2}", result.final_value());
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", m.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0);
    eprintln!("Trading Days:     {}", m.trading_days);

    let warnings = report.validation.diagnostics.len() + result.diagnostics.len();
    if warnings > 0 {
        eprintln!("Data warnings:    {warnings}");
    }
    eprintln!("\nReturns written to: {}", report.path.display());
}
