//! Buy-and-hold position taken once on the entry day.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub ticker: String,
    pub shares: u64,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
}

impl Holding {
    /// Whole shares affordable with `target_value` at `price`.
    ///
    /// Returns `None` when the price is not strictly positive and finite.
    pub fn affordable_shares(target_value: f64, price: f64) -> Option<u64> {
        if !(price.is_finite() && price > 0.0) || !target_value.is_finite() {
            return None;
        }
        let shares = (target_value / price).floor();
        Some(if shares > 0.0 { shares as u64 } else { 0 })
    }

    pub fn entry_value(&self) -> f64 {
        self.shares as f64 * self.entry_price
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.shares as f64 * (price - self.entry_price)
    }
}
