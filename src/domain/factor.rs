//! Factor library: per-ticker raw factor values.
//!
//! Every function here is pure and assumes its inputs were already cleaned
//! by the scorer's alignment pass. Higher values are better for all factors.

use crate::domain::factor_row::FactorRow;
use crate::domain::price_history::PriceSeries;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactorKind {
    PeInverse,
    PbInverse,
    DividendYield,
    Momentum,
    Roe,
}

impl FactorKind {
    pub const DEFAULT_SET: [FactorKind; 4] = [
        FactorKind::PeInverse,
        FactorKind::PbInverse,
        FactorKind::DividendYield,
        FactorKind::Momentum,
    ];

    /// Column name in the score table.
    pub fn column(&self) -> &'static str {
        match self {
            FactorKind::PeInverse => "pe",
            FactorKind::PbInverse => "pb",
            FactorKind::DividendYield => "div",
            FactorKind::Momentum => "mom",
            FactorKind::Roe => "roe",
        }
    }

    /// Factor-table field the factor is computed from, if any.
    pub fn source_field(&self) -> Option<&'static str> {
        match self {
            FactorKind::PeInverse => Some("pe_ttm"),
            FactorKind::PbInverse => Some("pb"),
            FactorKind::DividendYield => Some("dividendyield"),
            FactorKind::Roe => Some("roe"),
            FactorKind::Momentum => None,
        }
    }

    /// Raw field value for fundamental factors.
    pub fn field_value(&self, row: &FactorRow) -> Option<f64> {
        match self {
            FactorKind::PeInverse => row.pe_ttm,
            FactorKind::PbInverse => row.pb,
            FactorKind::DividendYield => row.dividend_yield,
            FactorKind::Roe => row.roe,
            FactorKind::Momentum => None,
        }
    }

    /// Whether the source field is used as a divisor.
    pub fn inverts_field(&self) -> bool {
        matches!(self, FactorKind::PeInverse | FactorKind::PbInverse)
    }
}

impl fmt::Display for FactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for FactorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pe" | "pe_inverse" => Ok(FactorKind::PeInverse),
            "pb" | "pb_inverse" => Ok(FactorKind::PbInverse),
            "div" | "dividend_yield" => Ok(FactorKind::DividendYield),
            "mom" | "momentum" => Ok(FactorKind::Momentum),
            "roe" => Ok(FactorKind::Roe),
            other => Err(format!("unknown factor '{other}'")),
        }
    }
}

/// 1 / pe_ttm. Not finite when pe_ttm is zero.
pub fn pe_inverse(row: &FactorRow) -> Option<f64> {
    row.pe_ttm.map(|pe| 1.0 / pe)
}

/// 1 / pb. Not finite when pb is zero.
pub fn pb_inverse(row: &FactorRow) -> Option<f64> {
    row.pb.map(|pb| 1.0 / pb)
}

pub fn dividend_yield(row: &FactorRow) -> Option<f64> {
    row.dividend_yield
}

pub fn roe(row: &FactorRow) -> Option<f64> {
    row.roe
}

/// (P_t - P_{t-window}) / P_{t-window} over the last `window + 1` points.
///
/// Points are taken as consecutive periods, so callers pass a date-aligned
/// series (see `PriceHistory::filled_series`). Returns `None` when the series
/// holds fewer than `window + 1` points; a shorter history never falls back
/// to the change over what is available.
pub fn momentum(series: &PriceSeries, window: usize) -> Option<f64> {
    let n = series.len();
    if window == 0 || n < window + 1 {
        return None;
    }
    let current = series.points[n - 1].close;
    let base = series.points[n - 1 - window].close;
    Some((current - base) / base)
}

/// Fundamental factor value for `kind`; `None` for momentum.
pub fn fundamental(kind: FactorKind, row: &FactorRow) -> Option<f64> {
    match kind {
        FactorKind::PeInverse => pe_inverse(row),
        FactorKind::PbInverse => pb_inverse(row),
        FactorKind::DividendYield => dividend_yield(row),
        FactorKind::Roe => roe(row),
        FactorKind::Momentum => None,
    }
}
