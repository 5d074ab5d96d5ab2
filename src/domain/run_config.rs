//! Run parameters resolved from configuration.

use crate::domain::basket::BasketPolicy;
use crate::domain::config_validation::{
    parse_choice, parse_double, parse_factors, parse_positive_int, parse_run_date, parse_tickers,
    validate_run_config, PATHS,
};
use crate::domain::error::ScoreTraderError;
use crate::domain::scorer::ScoringConfig;
use crate::domain::simulator::MissingPricePolicy;
use crate::ports::config_port::ConfigPort;
use chrono::{Duration, NaiveDate};
use std::path::PathBuf;

/// Input and output directories. Passed to adapters at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPaths {
    pub price_dir: PathBuf,
    pub fundamental_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        DataPaths {
            price_dir: PathBuf::from("data"),
            fundamental_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("docs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub run_date: NaiveDate,
    pub tickers: Vec<String>,
    pub lookback_days: usize,
    pub top_n: usize,
    pub initial_cash: f64,
    pub scoring: ScoringConfig,
    pub missing_price: MissingPricePolicy,
    pub basket_policy: BasketPolicy,
    pub risk_free_rate: f64,
    pub paths: DataPaths,
}

impl RunConfig {
    /// Date whose score table picks the basket: `run_date - lookback_days`.
    pub fn rebalance_date(&self) -> NaiveDate {
        self.run_date - Duration::days(self.lookback_days as i64)
    }

    /// Last replayed day; the run date itself is not replayed.
    pub fn replay_end(&self) -> NaiveDate {
        self.run_date - Duration::days(1)
    }
}

/// Validate and resolve the run configuration. `run_date_override` wins
/// over `[run] run_date`.
pub fn build_run_config(
    config: &dyn ConfigPort,
    run_date_override: Option<NaiveDate>,
) -> Result<RunConfig, ScoreTraderError> {
    validate_run_config(config, run_date_override)?;

    let run_date = match run_date_override {
        Some(date) => date,
        None => parse_run_date(config)?,
    };

    let path = |key: &str, default: &str| {
        PathBuf::from(
            config
                .get_string(PATHS, key)
                .unwrap_or_else(|| default.to_string()),
        )
    };

    Ok(RunConfig {
        run_date,
        tickers: parse_tickers(config)?,
        lookback_days: parse_positive_int(config, "lookback_days", 5)?,
        top_n: parse_positive_int(config, "top_n", 2)?,
        initial_cash: parse_double(config, "initial_cash", 1_000_000.0)?,
        scoring: ScoringConfig {
            factors: parse_factors(config)?,
            momentum_window: parse_positive_int(config, "momentum_window", 20)?,
            degenerate_policy: parse_choice(config, "degenerate_factor", "exclude")?,
        },
        missing_price: parse_choice(config, "missing_price", "carry_forward")?,
        basket_policy: parse_choice(config, "basket_policy", "partial")?,
        risk_free_rate: parse_double(config, "risk_free_rate", 0.0)?,
        paths: DataPaths {
            price_dir: path("price_dir", "data"),
            fundamental_dir: path("fundamental_dir", "data"),
            output_dir: path("output_dir", "docs"),
        },
    })
}
