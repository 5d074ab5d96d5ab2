//! Market data input port.

use crate::domain::error::ScoreTraderError;
use crate::domain::factor_row::FactorRow;
use crate::domain::price_history::PriceHistory;
use chrono::NaiveDate;

pub trait DataPort {
    /// Fundamental snapshot published for `date`, in file row order.
    fn load_factor_table(&self, date: NaiveDate) -> Result<Vec<FactorRow>, ScoreTraderError>;

    /// Daily close matrix published for `date`, sorted by date.
    fn load_price_history(&self, date: NaiveDate) -> Result<PriceHistory, ScoreTraderError>;
}
