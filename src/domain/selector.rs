//! Top-N selection by composite score.

use std::cmp::Ordering;

/// Anything that can be ranked: a ticker with a composite score.
pub trait Scored {
    fn ticker(&self) -> &str;
    fn total_score(&self) -> f64;
}

impl Scored for crate::domain::scorer::ScoreRow {
    fn ticker(&self) -> &str {
        &self.ticker
    }

    fn total_score(&self) -> f64 {
        self.total_score
    }
}

/// Up to `n` tickers by `total_score` descending; ties keep input order.
///
/// Rows whose score is not finite never rank above a finite one.
pub fn select_top_n<S: Scored>(rows: &[S], n: usize) -> Vec<String> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| {
        let sa = finite_or_min(rows[a].total_score());
        let sb = finite_or_min(rows[b].total_score());
        sb.partial_cmp(&sa).unwrap_or(Ordering::Equal)
    });
    order
        .into_iter()
        .take(n)
        .map(|i| rows[i].ticker().to_string())
        .collect()
}

fn finite_or_min(score: f64) -> f64 {
    if score.is_finite() {
        score
    } else {
        f64::NEG_INFINITY
    }
}
