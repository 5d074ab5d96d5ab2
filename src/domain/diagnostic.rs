//! Typed data-quality diagnostics.
//!
//! Scoring, basket validation and replay report every skipped ticker or
//! patched price here instead of dropping it silently. Callers decide
//! whether a diagnostic list is acceptable.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub ticker: String,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    /// A factor input field is empty or not finite.
    MissingField { field: &'static str },
    /// A divisor or momentum base price that cannot be used.
    InvalidField { field: &'static str, value: f64 },
    /// Fewer observed closes than momentum needs.
    InsufficientHistory { have: usize, need: usize },
    /// Ticker is absent from the factor table.
    NotInFactorTable,
    /// Ticker has no column in the price history.
    NotInPriceHistory,
    /// Ticker has a column but no close inside the replay window.
    NoPricesInWindow,
    /// Some days in the replay window lack a close.
    GapsInWindow { missing_days: usize },
    /// Close on the entry day is absent or not strictly positive.
    InvalidEntryPrice,
    /// Target value buys less than one share.
    ZeroShares { price: f64, target_value: f64 },
    /// Held ticker has no close on a replay day.
    StalePrice { date: NaiveDate },
}

impl Diagnostic {
    pub fn new(ticker: impl Into<String>, kind: DiagnosticKind) -> Self {
        Diagnostic {
            ticker: ticker.into(),
            kind,
        }
    }

    /// True when the ticker was dropped from the cross-section or basket.
    pub fn excludes_ticker(&self) -> bool {
        !matches!(
            self.kind,
            DiagnosticKind::GapsInWindow { .. } | DiagnosticKind::StalePrice { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.ticker;
        match &self.kind {
            DiagnosticKind::MissingField { field } => write!(f, "{t}: missing {field}"),
            DiagnosticKind::InvalidField { field, value } => {
                write!(f, "{t}: {field} is unusable ({value})")
            }
            DiagnosticKind::InsufficientHistory { have, need } => {
                write!(f, "{t}: {have} closes, momentum needs {need}")
            }
            DiagnosticKind::NotInFactorTable => write!(f, "{t}: not in factor table"),
            DiagnosticKind::NotInPriceHistory => write!(f, "{t}: no price column"),
            DiagnosticKind::NoPricesInWindow => write!(f, "{t}: no prices in window"),
            DiagnosticKind::GapsInWindow { missing_days } => {
                write!(f, "{t}: {missing_days} days without a close")
            }
            DiagnosticKind::InvalidEntryPrice => write!(f, "{t}: no valid entry price"),
            DiagnosticKind::ZeroShares {
                price,
                target_value,
            } => write!(
                f,
                "{t}: target {target_value:.2} buys no shares at {price:.2}"
            ),
            DiagnosticKind::StalePrice { date } => write!(f, "{t}: no close on {date}"),
        }
    }
}
