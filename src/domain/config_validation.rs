//! Configuration validation.
//!
//! Checks every `[run]` and `[paths]` field before any pipeline stage runs.
//! Each failure names the offending section and key.

use crate::domain::basket::BasketPolicy;
use crate::domain::error::ScoreTraderError;
use crate::domain::factor::FactorKind;
use crate::domain::scorer::DegenerateFactorPolicy;
use crate::domain::simulator::MissingPricePolicy;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::str::FromStr;

pub const RUN: &str = "run";
pub const PATHS: &str = "paths";

/// Validate the whole run configuration. `run_date_override` stands in for
/// a missing or invalid `[run] run_date`.
pub fn validate_run_config(
    config: &dyn ConfigPort,
    run_date_override: Option<NaiveDate>,
) -> Result<(), ScoreTraderError> {
    if run_date_override.is_none() {
        parse_run_date(config)?;
    }
    parse_tickers(config)?;
    validate_positive_int(config, "lookback_days", 5)?;
    validate_positive_int(config, "top_n", 2)?;
    validate_positive_int(config, "momentum_window", 20)?;
    validate_initial_cash(config)?;
    validate_risk_free_rate(config)?;
    parse_factors(config)?;
    parse_choice::<DegenerateFactorPolicy>(config, "degenerate_factor", "exclude")?;
    parse_choice::<MissingPricePolicy>(config, "missing_price", "carry_forward")?;
    parse_choice::<BasketPolicy>(config, "basket_policy", "partial")?;
    validate_paths(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ScoreTraderError {
    ScoreTraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

pub fn parse_date(value: &str, key: &str) -> Result<NaiveDate, ScoreTraderError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| invalid(RUN, key, format!("invalid {key} format, expected YYYY-MM-DD")))
}

pub fn parse_run_date(config: &dyn ConfigPort) -> Result<NaiveDate, ScoreTraderError> {
    match config.get_string(RUN, "run_date") {
        None => Err(ScoreTraderError::ConfigMissing {
            section: RUN.to_string(),
            key: "run_date".to_string(),
        }),
        Some(s) => parse_date(&s, "run_date"),
    }
}

/// Upper-cased ticker universe; empty entries and repeats are rejected.
pub fn parse_tickers(config: &dyn ConfigPort) -> Result<Vec<String>, ScoreTraderError> {
    let items = config
        .get_list(RUN, "tickers")
        .ok_or_else(|| ScoreTraderError::ConfigMissing {
            section: RUN.to_string(),
            key: "tickers".to_string(),
        })?;

    let mut tickers = Vec::with_capacity(items.len());
    let mut seen = HashSet::new();
    for item in items {
        if item.is_empty() {
            return Err(invalid(RUN, "tickers", "empty token in ticker list"));
        }
        let ticker = item.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(invalid(RUN, "tickers", format!("duplicate ticker: {ticker}")));
        }
        tickers.push(ticker);
    }
    Ok(tickers)
}

/// Configured factor set, in the order given. Defaults to the four core
/// factors.
pub fn parse_factors(config: &dyn ConfigPort) -> Result<Vec<FactorKind>, ScoreTraderError> {
    let Some(items) = config.get_list(RUN, "factors") else {
        return Ok(FactorKind::DEFAULT_SET.to_vec());
    };

    let mut factors = Vec::with_capacity(items.len());
    for item in items {
        let kind: FactorKind = item.parse().map_err(|e: String| invalid(RUN, "factors", e))?;
        if factors.contains(&kind) {
            return Err(invalid(RUN, "factors", format!("duplicate factor: {kind}")));
        }
        factors.push(kind);
    }
    if factors.is_empty() {
        return Err(invalid(RUN, "factors", "at least one factor is required"));
    }
    Ok(factors)
}

pub fn parse_choice<T>(config: &dyn ConfigPort, key: &str, default: &str) -> Result<T, ScoreTraderError>
where
    T: FromStr<Err = String>,
{
    let value = config
        .get_string(RUN, key)
        .unwrap_or_else(|| default.to_string());
    value.parse().map_err(|e: String| invalid(RUN, key, e))
}

pub fn parse_positive_int(
    config: &dyn ConfigPort,
    key: &str,
    default: i64,
) -> Result<usize, ScoreTraderError> {
    if let Some(raw) = config.get_string(RUN, key) {
        if raw.trim().parse::<i64>().is_err() {
            return Err(invalid(RUN, key, format!("{key} must be an integer")));
        }
    }
    let value = config.get_int(RUN, key, default);
    if value < 1 {
        return Err(invalid(RUN, key, format!("{key} must be at least 1")));
    }
    Ok(value as usize)
}

pub fn parse_double(
    config: &dyn ConfigPort,
    key: &str,
    default: f64,
) -> Result<f64, ScoreTraderError> {
    if let Some(raw) = config.get_string(RUN, key) {
        if raw.trim().parse::<f64>().is_err() {
            return Err(invalid(RUN, key, format!("{key} must be a number")));
        }
    }
    Ok(config.get_double(RUN, key, default))
}

fn validate_positive_int(
    config: &dyn ConfigPort,
    key: &str,
    default: i64,
) -> Result<(), ScoreTraderError> {
    parse_positive_int(config, key, default).map(|_| ())
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), ScoreTraderError> {
    let value = parse_double(config, "initial_cash", 1_000_000.0)?;
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(RUN, "initial_cash", "initial_cash must be positive"));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), ScoreTraderError> {
    let value = parse_double(config, "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            RUN,
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_paths(config: &dyn ConfigPort) -> Result<(), ScoreTraderError> {
    for key in ["price_dir", "fundamental_dir", "output_dir"] {
        if let Some(v) = config.get_string(PATHS, key) {
            if v.trim().is_empty() {
                return Err(invalid(PATHS, key, format!("{key} must not be empty")));
            }
        }
    }
    Ok(())
}
