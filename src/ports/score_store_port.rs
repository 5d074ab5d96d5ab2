//! Score table persistence port.

use crate::domain::error::ScoreTraderError;
use crate::domain::scorer::FactorScoreTable;
use chrono::NaiveDate;
use std::path::PathBuf;

pub trait ScoreStorePort {
    /// Persist the score table for `date`; returns where it was written.
    fn write_scores(
        &self,
        date: NaiveDate,
        table: &FactorScoreTable,
    ) -> Result<PathBuf, ScoreTraderError>;

    /// Score table previously written for `date`, rows in file order.
    fn read_scores(&self, date: NaiveDate) -> Result<FactorScoreTable, ScoreTraderError>;
}
