//! Basket validation against the replay window.
//!
//! Each selected ticker is checked for a price column and for observed
//! closes inside the window before any cash is committed.

use crate::domain::diagnostic::{Diagnostic, DiagnosticKind};
use crate::domain::error::ScoreTraderError;
use crate::domain::price_history::PriceHistory;
use std::collections::HashSet;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasketPolicy {
    /// Continue with the tickers that have data.
    Partial,
    /// Reject the basket when any ticker is unusable.
    FailFast,
}

impl FromStr for BasketPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "partial" => Ok(BasketPolicy::Partial),
            "fail_fast" => Ok(BasketPolicy::FailFast),
            other => Err(format!("unknown basket policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasketValidation {
    pub tickers: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BasketValidation {
    pub fn rejected(&self) -> Vec<&str> {
        self.diagnostics
            .iter()
            .filter(|d| d.excludes_ticker())
            .map(|d| d.ticker.as_str())
            .collect()
    }
}

/// Split `basket` into usable and unusable tickers for `window`.
///
/// Tickers are upper-cased and repeats dropped. Gaps inside the window are
/// reported but do not make a ticker unusable.
pub fn validate_basket(
    basket: &[String],
    window: &PriceHistory,
    policy: BasketPolicy,
) -> Result<BasketValidation, ScoreTraderError> {
    let mut tickers = Vec::new();
    let mut diagnostics = Vec::new();
    let mut seen = HashSet::new();

    for raw in basket {
        let ticker = raw.trim().to_uppercase();
        if !seen.insert(ticker.clone()) {
            continue;
        }

        let Some(series) = window.series(&ticker) else {
            diagnostics.push(Diagnostic::new(ticker, DiagnosticKind::NotInPriceHistory));
            continue;
        };

        if series.is_empty() {
            diagnostics.push(Diagnostic::new(ticker, DiagnosticKind::NoPricesInWindow));
            continue;
        }

        let missing_days = window.day_count() - series.len();
        if missing_days > 0 {
            diagnostics.push(Diagnostic::new(
                ticker.clone(),
                DiagnosticKind::GapsInWindow { missing_days },
            ));
        }
        tracing::debug!(%ticker, closes = series.len(), "basket ticker ok");
        tickers.push(ticker);
    }

    let validation = BasketValidation {
        tickers,
        diagnostics,
    };

    for diag in &validation.diagnostics {
        tracing::warn!(%diag, "basket");
    }

    let rejected = validation.rejected();
    if policy == BasketPolicy::FailFast && !rejected.is_empty() {
        return Err(ScoreTraderError::BasketRejected {
            tickers: rejected.into_iter().map(String::from).collect(),
        });
    }

    if validation.tickers.is_empty() {
        return Err(ScoreTraderError::insufficient(
            "basket tickers with prices in the replay window",
            0,
            1,
        ));
    }

    Ok(validation)
}
