//! Returns table output port.

use crate::domain::error::ScoreTraderError;
use crate::domain::simulator::PerformanceSeries;
use chrono::NaiveDate;
use std::path::PathBuf;

pub trait ReportPort {
    /// Write the daily performance series for the run on `run_date`.
    fn write_returns(
        &self,
        run_date: NaiveDate,
        series: &PerformanceSeries,
    ) -> Result<PathBuf, ScoreTraderError>;
}
