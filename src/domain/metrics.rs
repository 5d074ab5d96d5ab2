//! Summary statistics over a simulated value series.

use super::simulator::{PerformancePoint, SimulationResult};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
    pub trading_days: usize,
}

impl Metrics {
    pub fn compute(result: &SimulationResult, risk_free_rate: f64) -> Self {
        let points = &result.series.points;
        let total_return = if result.initial_cash > 0.0 {
            result.total_return()
        } else {
            0.0
        };

        let trading_days = points.len();
        let years = trading_days as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return.is_finite() && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(points);

        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(points, daily_rf);

        Metrics {
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            trading_days,
        }
    }
}

fn compute_drawdown(points: &[PerformancePoint]) -> (f64, i64) {
    let Some(first) = points.first() else {
        return (0.0, 0);
    };

    let mut peak = first.total_value;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for point in points {
        if point.total_value > peak {
            peak = point.total_value;
            current_dd_duration = 0;
        } else if peak > 0.0 && point.total_value < peak {
            let dd = (peak - point.total_value) / peak;
            max_dd = max_dd.max(dd);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

/// Sharpe and Sortino from daily returns; the entry day carries no return
/// and is skipped.
fn compute_risk_adjusted(points: &[PerformancePoint], daily_rf: f64) -> (f64, f64) {
    if points.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = points[1..].iter().map(|p| p.daily_return).collect();
    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;

    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let excess_return = mean - daily_rf;

    let sharpe = if stddev > 0.0 {
        (excess_return / stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside: f64 = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum();
    let downside_stddev = (downside / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        (excess_return / downside_stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}
