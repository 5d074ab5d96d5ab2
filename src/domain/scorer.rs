//! Cross-sectional z-scoring and composite ranking.
//!
//! `score_stocks` first aligns the cross-section (tickers with every input
//! the configured factors need), then z-scores each factor independently
//! over that one ticker set and sums the z-scores into `total_score`.
//! The sum is unweighted: each factor has equal influence whatever its units.

use crate::domain::diagnostic::{Diagnostic, DiagnosticKind};
use crate::domain::error::ScoreTraderError;
use crate::domain::factor::{self, FactorKind};
use crate::domain::factor_row::FactorRow;
use crate::domain::price_history::PriceHistory;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Standard deviations at or below this (relative to the mean's magnitude)
/// count as zero variance.
const DEGENERATE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegenerateFactorPolicy {
    /// Drop the factor for this run; it contributes nothing to `total_score`.
    Exclude,
    /// Keep the factor with an all-zero z-score column.
    Zero,
    /// Abort scoring with `DegenerateFactor`.
    Fail,
}

impl FromStr for DegenerateFactorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exclude" => Ok(DegenerateFactorPolicy::Exclude),
            "zero" => Ok(DegenerateFactorPolicy::Zero),
            "fail" => Ok(DegenerateFactorPolicy::Fail),
            other => Err(format!("unknown degenerate factor policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub factors: Vec<FactorKind>,
    pub momentum_window: usize,
    pub degenerate_policy: DegenerateFactorPolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            factors: FactorKind::DEFAULT_SET.to_vec(),
            momentum_window: 20,
            degenerate_policy: DegenerateFactorPolicy::Exclude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZScoreError {
    TooFew { have: usize },
    ZeroVariance,
    NonFinite,
}

impl fmt::Display for ZScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZScoreError::TooFew { have } => write!(f, "{have} values, need at least 2"),
            ZScoreError::ZeroVariance => f.write_str("zero variance"),
            ZScoreError::NonFinite => f.write_str("non-finite value"),
        }
    }
}

/// (x - mean) / sample_std over exactly the values passed in.
pub fn zscore(values: &[f64]) -> Result<Vec<f64>, ZScoreError> {
    let n = values.len();
    if n < 2 {
        return Err(ZScoreError::TooFew { have: n });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ZScoreError::NonFinite);
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = variance.sqrt();

    if std <= DEGENERATE_TOLERANCE * mean.abs().max(1.0) {
        return Err(ZScoreError::ZeroVariance);
    }

    Ok(values.iter().map(|v| (v - mean) / std).collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub ticker: String,
    /// One entry per `FactorScoreTable::factors`; `None` for an excluded factor.
    pub factor_scores: Vec<Option<f64>>,
    pub total_score: f64,
}

/// Per-ticker factor z-scores and composite score, in factor-table order.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorScoreTable {
    pub factors: Vec<FactorKind>,
    pub excluded: Vec<FactorKind>,
    pub rows: Vec<ScoreRow>,
}

impl FactorScoreTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, ticker: &str) -> Option<&ScoreRow> {
        self.rows.iter().find(|r| r.ticker == ticker)
    }

    pub fn factor_score(&self, ticker: &str, kind: FactorKind) -> Option<f64> {
        let col = self.factors.iter().position(|&f| f == kind)?;
        self.get(ticker).and_then(|r| r.factor_scores[col])
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.ticker.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOutcome {
    pub table: FactorScoreTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// A ticker that survived alignment, with one raw value per configured factor.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTicker {
    pub ticker: String,
    pub raw: Vec<f64>,
}

/// Restrict the cross-section to tickers with every required input.
///
/// Tickers are visited in factor-table order; repeated tickers keep their
/// first row.
pub fn align_cross_section(
    rows: &[FactorRow],
    history: &PriceHistory,
    config: &ScoringConfig,
) -> (Vec<AlignedTicker>, Vec<Diagnostic>) {
    let mut aligned = Vec::new();
    let mut diagnostics = Vec::new();
    let mut seen = HashSet::new();

    for row in rows {
        let ticker = row.ticker.to_uppercase();
        if !seen.insert(ticker.clone()) {
            continue;
        }

        let mut raw = Vec::with_capacity(config.factors.len());
        let mut rejected: Option<DiagnosticKind> = None;

        for &kind in &config.factors {
            let value = match kind {
                FactorKind::Momentum => momentum_value(&ticker, history, config.momentum_window),
                _ => fundamental_value(kind, row),
            };
            match value {
                Ok(v) => raw.push(v),
                Err(reason) => {
                    rejected = Some(reason);
                    break;
                }
            }
        }

        match rejected {
            Some(kind) => diagnostics.push(Diagnostic::new(ticker, kind)),
            None => aligned.push(AlignedTicker { ticker, raw }),
        }
    }

    if config.factors.contains(&FactorKind::Momentum) {
        for ticker in history.tickers() {
            if !seen.contains(ticker) {
                diagnostics.push(Diagnostic::new(
                    ticker.clone(),
                    DiagnosticKind::NotInFactorTable,
                ));
            }
        }
    }

    (aligned, diagnostics)
}

fn fundamental_value(kind: FactorKind, row: &FactorRow) -> Result<f64, DiagnosticKind> {
    let field = kind.source_field().unwrap_or("unknown");
    let input = kind
        .field_value(row)
        .filter(|v| v.is_finite())
        .ok_or(DiagnosticKind::MissingField { field })?;
    if kind.inverts_field() && input == 0.0 {
        return Err(DiagnosticKind::InvalidField {
            field,
            value: input,
        });
    }
    factor::fundamental(kind, row)
        .filter(|v| v.is_finite())
        .ok_or(DiagnosticKind::MissingField { field })
}

fn momentum_value(
    ticker: &str,
    history: &PriceHistory,
    window: usize,
) -> Result<f64, DiagnosticKind> {
    let series = history
        .filled_series(ticker)
        .ok_or(DiagnosticKind::NotInPriceHistory)?;
    let need = window + 1;
    if series.len() < need {
        return Err(DiagnosticKind::InsufficientHistory {
            have: series.len(),
            need,
        });
    }
    let base = series.points[series.len() - need].close;
    if base <= 0.0 {
        return Err(DiagnosticKind::InvalidField {
            field: "close",
            value: base,
        });
    }
    factor::momentum(&series, window).ok_or(DiagnosticKind::InsufficientHistory {
        have: series.len(),
        need,
    })
}

/// Score the aligned cross-section of `rows` against `history`.
pub fn score_stocks(
    rows: &[FactorRow],
    history: &PriceHistory,
    config: &ScoringConfig,
) -> Result<ScoringOutcome, ScoreTraderError> {
    let (aligned, diagnostics) = align_cross_section(rows, history, config);
    for diag in &diagnostics {
        tracing::warn!(%diag, "excluded from scoring");
    }

    if aligned.len() < 2 {
        return Err(ScoreTraderError::insufficient(
            "tickers in scoring cross-section",
            aligned.len(),
            2,
        ));
    }

    let mut columns: Vec<Option<Vec<f64>>> = Vec::with_capacity(config.factors.len());
    let mut excluded = Vec::new();

    for (col, &kind) in config.factors.iter().enumerate() {
        let raw: Vec<f64> = aligned.iter().map(|t| t.raw[col]).collect();
        match zscore(&raw) {
            Ok(z) => columns.push(Some(z)),
            Err(ZScoreError::ZeroVariance) => match config.degenerate_policy {
                DegenerateFactorPolicy::Exclude => {
                    tracing::warn!(factor = %kind, "zero variance, factor excluded");
                    excluded.push(kind);
                    columns.push(None);
                }
                DegenerateFactorPolicy::Zero => {
                    tracing::warn!(factor = %kind, "zero variance, scored as zero");
                    columns.push(Some(vec![0.0; aligned.len()]));
                }
                DegenerateFactorPolicy::Fail => {
                    return Err(ScoreTraderError::DegenerateFactor {
                        factor: kind.to_string(),
                    });
                }
            },
            Err(ZScoreError::TooFew { have }) => {
                return Err(ScoreTraderError::insufficient(
                    format!("tickers to z-score for {kind}"),
                    have,
                    2,
                ));
            }
            Err(ZScoreError::NonFinite) => {
                return Err(ScoreTraderError::DegenerateFactor {
                    factor: kind.to_string(),
                });
            }
        }
    }

    if columns.iter().all(Option::is_none) {
        return Err(ScoreTraderError::insufficient(
            "factors with cross-sectional variance",
            0,
            1,
        ));
    }

    let rows = aligned
        .into_iter()
        .enumerate()
        .map(|(i, t)| {
            let factor_scores: Vec<Option<f64>> = columns
                .iter()
                .map(|c| c.as_ref().map(|z| z[i]))
                .collect();
            let total_score = factor_scores.iter().flatten().sum();
            ScoreRow {
                ticker: t.ticker,
                factor_scores,
                total_score,
            }
        })
        .collect();

    Ok(ScoringOutcome {
        table: FactorScoreTable {
            factors: config.factors.clone(),
            excluded,
            rows,
        },
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    fn fr(ticker: &str, pe: f64, pb: f64, dy: f64) -> FactorRow {
        FactorRow::new(ticker, d(16)).with_valuation(pe, pb, dy)
    }

    /// Two-day history giving each ticker momentum `(last - first) / first`.
    fn history(entries: &[(&str, f64, f64)]) -> PriceHistory {
        let mut h = PriceHistory::new(entries.iter().map(|e| e.0.to_string()).collect());
        h.push_row(d(14), entries.iter().map(|e| Some(e.1)).collect())
            .unwrap();
        h.push_row(d(15), entries.iter().map(|e| Some(e.2)).collect())
            .unwrap();
        h
    }

    fn config(window: usize) -> ScoringConfig {
        ScoringConfig {
            momentum_window: window,
            ..ScoringConfig::default()
        }
    }

    fn mean_and_sample_std(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        (mean, var.sqrt())
    }

    #[test]
    fn zscore_known_values() {
        let z = zscore(&[1.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(z[0], -1.0);
        assert_relative_eq!(z[1], 0.0);
        assert_relative_eq!(z[2], 1.0);
    }

    #[test]
    fn zscore_two_values_are_plus_minus_sqrt_half() {
        let z = zscore(&[10.0, 20.0]).unwrap();
        assert_relative_eq!(z[0], -(0.5_f64.sqrt()), epsilon = 1e-12);
        assert_relative_eq!(z[1], 0.5_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn zscore_rejects_too_few() {
        assert_eq!(zscore(&[]), Err(ZScoreError::TooFew { have: 0 }));
        assert_eq!(zscore(&[1.0]), Err(ZScoreError::TooFew { have: 1 }));
    }

    #[test]
    fn zscore_rejects_constant_series() {
        assert_eq!(zscore(&[0.1, 0.1, 0.1]), Err(ZScoreError::ZeroVariance));
        assert_eq!(zscore(&[5.0, 5.0]), Err(ZScoreError::ZeroVariance));
    }

    #[test]
    fn zscore_rejects_non_finite() {
        assert_eq!(zscore(&[1.0, f64::NAN]), Err(ZScoreError::NonFinite));
        assert_eq!(zscore(&[1.0, f64::INFINITY]), Err(ZScoreError::NonFinite));
    }

    proptest! {
        #[test]
        fn zscore_has_zero_mean_and_unit_sample_std(
            values in prop::collection::vec(-1.0e3_f64..1.0e3, 2..30)
        ) {
            let (_, std) = mean_and_sample_std(&values);
            prop_assume!(std > 1e-6);
            let z = zscore(&values).unwrap();
            let (m, s) = mean_and_sample_std(&z);
            prop_assert!(m.abs() < 1e-9);
            prop_assert!((s - 1.0).abs() < 1e-9);
        }

        #[test]
        fn total_score_is_exact_sum_of_factor_scores(
            pes in prop::collection::vec(1.0_f64..100.0, 3..8),
            seed in 0u64..1000
        ) {
            let n = pes.len();
            let rows: Vec<FactorRow> = pes
                .iter()
                .enumerate()
                .map(|(i, &pe)| {
                    let k = ((seed as usize + i * 7) % 13) as f64;
                    fr(&format!("T{i}"), pe, 1.0 + k, 0.001 * (k + i as f64))
                })
                .collect();
            let entries: Vec<(String, f64, f64)> = (0..n)
                .map(|i| (format!("T{i}"), 100.0, 100.0 + ((seed as usize * 3 + i * 11) % 17) as f64))
                .collect();
            let refs: Vec<(&str, f64, f64)> =
                entries.iter().map(|e| (e.0.as_str(), e.1, e.2)).collect();
            let outcome = score_stocks(&rows, &history(&refs), &config(1)).unwrap();
            for row in &outcome.table.rows {
                let sum: f64 = row.factor_scores.iter().flatten().sum();
                prop_assert_eq!(row.total_score, sum);
            }
        }
    }

    #[test]
    fn cheaper_higher_yield_positive_momentum_ranks_first() {
        let rows = vec![fr("A", 10.0, 2.0, 0.01), fr("B", 20.0, 4.0, 0.02)];
        let h = history(&[("A", 100.0, 105.0), ("B", 100.0, 98.0)]);
        let outcome = score_stocks(&rows, &h, &config(1)).unwrap();
        let table = outcome.table;

        assert_relative_eq!(
            table.factor_score("A", FactorKind::Momentum).unwrap(),
            0.5_f64.sqrt(),
            epsilon = 1e-12
        );
        let a = table.get("A").unwrap().total_score;
        let b = table.get("B").unwrap().total_score;
        assert!(a > b);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn table_keeps_factor_table_order() {
        let rows = vec![
            fr("MSFT", 35.0, 12.0, 0.007),
            fr("AAPL", 33.0, 50.0, 0.005),
            fr("GOOGL", 20.0, 6.5, 0.004),
        ];
        let h = history(&[
            ("AAPL", 200.0, 210.0),
            ("MSFT", 500.0, 505.0),
            ("GOOGL", 180.0, 175.0),
        ]);
        let outcome = score_stocks(&rows, &h, &config(1)).unwrap();
        assert_eq!(outcome.table.tickers(), vec!["MSFT", "AAPL", "GOOGL"]);
    }

    #[test]
    fn alignment_excludes_invalid_tickers() {
        let mut missing_pb = fr("C", 15.0, 1.0, 0.03);
        missing_pb.pb = None;
        let rows = vec![
            fr("A", 10.0, 2.0, 0.01),
            fr("B", 20.0, 4.0, 0.02),
            missing_pb,
            fr("D", 0.0, 3.0, 0.01),
            fr("E", 12.0, 3.0, 0.01),
        ];
        let h = history(&[
            ("A", 100.0, 101.0),
            ("B", 100.0, 99.0),
            ("C", 100.0, 102.0),
            ("D", 100.0, 103.0),
        ]);
        let outcome = score_stocks(&rows, &h, &config(1)).unwrap();

        assert_eq!(outcome.table.tickers(), vec!["A", "B"]);
        let kinds: Vec<_> = outcome
            .diagnostics
            .iter()
            .map(|d| (d.ticker.as_str(), d.kind.clone()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("C", DiagnosticKind::MissingField { field: "pb" }),
                (
                    "D",
                    DiagnosticKind::InvalidField {
                        field: "pe_ttm",
                        value: 0.0
                    }
                ),
                ("E", DiagnosticKind::NotInPriceHistory),
            ]
        );
    }

    #[test]
    fn momentum_needs_window_plus_one_closes() {
        let rows = vec![
            fr("A", 10.0, 2.0, 0.01),
            fr("B", 20.0, 4.0, 0.02),
            fr("C", 30.0, 5.0, 0.03),
        ];
        let mut h = PriceHistory::new(vec!["A".into(), "B".into(), "C".into()]);
        h.push_row(d(10), vec![Some(100.0), Some(50.0), None]).unwrap();
        h.push_row(d(11), vec![Some(101.0), Some(51.0), Some(20.0)])
            .unwrap();
        h.push_row(d(14), vec![Some(102.0), Some(49.0), Some(21.0)])
            .unwrap();

        let outcome = score_stocks(&rows, &h, &config(2)).unwrap();
        assert_eq!(outcome.table.tickers(), vec!["A", "B"]);
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::new(
                "C",
                DiagnosticKind::InsufficientHistory { have: 2, need: 3 }
            )]
        );
    }

    #[test]
    fn momentum_counts_date_rows_across_gaps() {
        let rows = vec![fr("A", 10.0, 2.0, 0.01), fr("B", 20.0, 4.0, 0.02)];
        let mut h = PriceHistory::new(vec!["A".into(), "B".into()]);
        h.push_row(d(9), vec![Some(100.0), Some(50.0)]).unwrap();
        h.push_row(d(10), vec![Some(105.0), Some(50.0)]).unwrap();
        h.push_row(d(11), vec![None, Some(51.0)]).unwrap();
        h.push_row(d(14), vec![Some(120.0), Some(52.0)]).unwrap();

        let (aligned, diagnostics) = align_cross_section(&rows, &h, &config(2));
        assert!(diagnostics.is_empty());
        assert_relative_eq!(aligned[0].raw[3], 15.0 / 105.0, epsilon = 1e-12);
        assert_relative_eq!(aligned[1].raw[3], 2.0 / 50.0, epsilon = 1e-12);
    }

    #[test]
    fn price_only_tickers_are_reported() {
        let rows = vec![fr("A", 10.0, 2.0, 0.01), fr("B", 20.0, 4.0, 0.02)];
        let h = history(&[("A", 1.0, 2.0), ("B", 2.0, 1.0), ("ZZZ", 1.0, 1.0)]);
        let outcome = score_stocks(&rows, &h, &config(1)).unwrap();
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::new("ZZZ", DiagnosticKind::NotInFactorTable)]
        );
    }

    #[test]
    fn fewer_than_two_tickers_is_insufficient() {
        let rows = vec![fr("A", 10.0, 2.0, 0.01)];
        let h = history(&[("A", 100.0, 101.0)]);
        let err = score_stocks(&rows, &h, &config(1)).unwrap_err();
        assert!(matches!(
            err,
            ScoreTraderError::InsufficientData { have: 1, need: 2, .. }
        ));
    }

    #[test]
    fn degenerate_factor_excluded_by_default() {
        let rows = vec![
            fr("A", 10.0, 2.0, 0.02),
            fr("B", 20.0, 4.0, 0.02),
            fr("C", 15.0, 1.0, 0.02),
        ];
        let h = history(&[("A", 100.0, 101.0), ("B", 100.0, 99.0), ("C", 100.0, 100.0)]);
        let outcome = score_stocks(&rows, &h, &config(1)).unwrap();
        let table = outcome.table;

        assert_eq!(table.excluded, vec![FactorKind::DividendYield]);
        assert_eq!(table.factor_score("A", FactorKind::DividendYield), None);
        for row in &table.rows {
            let expected: f64 = row.factor_scores.iter().flatten().sum();
            assert_eq!(row.total_score, expected);
            assert_eq!(row.factor_scores.iter().filter(|s| s.is_some()).count(), 3);
        }
    }

    #[test]
    fn degenerate_factor_zero_policy() {
        let rows = vec![fr("A", 10.0, 2.0, 0.02), fr("B", 20.0, 4.0, 0.02)];
        let h = history(&[("A", 100.0, 101.0), ("B", 100.0, 99.0)]);
        let cfg = ScoringConfig {
            degenerate_policy: DegenerateFactorPolicy::Zero,
            ..config(1)
        };
        let table = score_stocks(&rows, &h, &cfg).unwrap().table;
        assert!(table.excluded.is_empty());
        assert_eq!(table.factor_score("A", FactorKind::DividendYield), Some(0.0));
        assert_eq!(table.factor_score("B", FactorKind::DividendYield), Some(0.0));
    }

    #[test]
    fn degenerate_factor_fail_policy() {
        let rows = vec![fr("A", 10.0, 2.0, 0.02), fr("B", 20.0, 4.0, 0.02)];
        let h = history(&[("A", 100.0, 101.0), ("B", 100.0, 99.0)]);
        let cfg = ScoringConfig {
            degenerate_policy: DegenerateFactorPolicy::Fail,
            ..config(1)
        };
        let err = score_stocks(&rows, &h, &cfg).unwrap_err();
        assert!(matches!(err, ScoreTraderError::DegenerateFactor { factor } if factor == "div"));
    }

    #[test]
    fn all_factors_degenerate_is_an_error() {
        let rows = vec![fr("A", 10.0, 2.0, 0.02), fr("B", 10.0, 2.0, 0.02)];
        let h = history(&[("A", 100.0, 101.0), ("B", 100.0, 101.0)]);
        let err = score_stocks(&rows, &h, &config(1)).unwrap_err();
        assert!(matches!(err, ScoreTraderError::InsufficientData { have: 0, .. }));
    }

    #[test]
    fn fundamental_only_scoring_ignores_prices() {
        let rows = vec![
            fr("A", 10.0, 2.0, 0.01).with_roe(0.3),
            fr("B", 20.0, 4.0, 0.02).with_roe(0.1),
        ];
        let cfg = ScoringConfig {
            factors: vec![FactorKind::PeInverse, FactorKind::Roe],
            ..ScoringConfig::default()
        };
        let outcome = score_stocks(&rows, &PriceHistory::default(), &cfg).unwrap();
        assert!(outcome.diagnostics.is_empty());
        assert!(outcome.table.get("A").unwrap().total_score > 0.0);
        assert_eq!(outcome.table.factors, vec![FactorKind::PeInverse, FactorKind::Roe]);
    }

    #[test]
    fn degenerate_policy_parsing() {
        assert_eq!(
            "Exclude".parse::<DegenerateFactorPolicy>(),
            Ok(DegenerateFactorPolicy::Exclude)
        );
        assert_eq!(
            "zero".parse::<DegenerateFactorPolicy>(),
            Ok(DegenerateFactorPolicy::Zero)
        );
        assert_eq!(
            "fail".parse::<DegenerateFactorPolicy>(),
            Ok(DegenerateFactorPolicy::Fail)
        );
        assert!("drop".parse::<DegenerateFactorPolicy>().is_err());
    }
}
