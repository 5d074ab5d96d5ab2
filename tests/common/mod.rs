#![allow(dead_code)]

use chrono::NaiveDate;
use scoretrader::domain::error::ScoreTraderError;
pub use scoretrader::domain::factor_row::FactorRow;
pub use scoretrader::domain::price_history::PriceHistory;
use scoretrader::domain::scorer::FactorScoreTable;
use scoretrader::domain::simulator::PerformanceSeries;
use scoretrader::ports::data_port::DataPort;
use scoretrader::ports::report_port::ReportPort;
use scoretrader::ports::score_store_port::ScoreStorePort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub struct MockDataPort {
    pub factor_tables: HashMap<NaiveDate, Vec<FactorRow>>,
    pub price_histories: HashMap<NaiveDate, PriceHistory>,
    pub errors: HashMap<NaiveDate, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            factor_tables: HashMap::new(),
            price_histories: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_factor_table(mut self, as_of: &str, rows: Vec<FactorRow>) -> Self {
        self.factor_tables.insert(date(as_of), rows);
        self
    }

    pub fn with_prices(mut self, as_of: &str, history: PriceHistory) -> Self {
        self.price_histories.insert(date(as_of), history);
        self
    }

    pub fn with_error(mut self, as_of: &str, reason: &str) -> Self {
        self.errors.insert(date(as_of), reason.to_string());
        self
    }

    fn missing(kind: &str, as_of: NaiveDate) -> ScoreTraderError {
        ScoreTraderError::MissingInput {
            path: PathBuf::from(format!("{kind}_{as_of}.csv")),
        }
    }
}

impl DataPort for MockDataPort {
    fn load_factor_table(&self, as_of: NaiveDate) -> Result<Vec<FactorRow>, ScoreTraderError> {
        if let Some(reason) = self.errors.get(&as_of) {
            return Err(ScoreTraderError::MalformedInput {
                path: PathBuf::from("mock"),
                reason: reason.clone(),
            });
        }
        self.factor_tables
            .get(&as_of)
            .cloned()
            .ok_or_else(|| Self::missing("fundamentals", as_of))
    }

    fn load_price_history(&self, as_of: NaiveDate) -> Result<PriceHistory, ScoreTraderError> {
        if let Some(reason) = self.errors.get(&as_of) {
            return Err(ScoreTraderError::MalformedInput {
                path: PathBuf::from("mock"),
                reason: reason.clone(),
            });
        }
        self.price_histories
            .get(&as_of)
            .cloned()
            .ok_or_else(|| Self::missing("close_prices", as_of))
    }
}

/// In-memory score store; written tables can be read back.
pub struct MockScoreStore {
    pub tables: RefCell<HashMap<NaiveDate, FactorScoreTable>>,
}

impl MockScoreStore {
    pub fn new() -> Self {
        Self {
            tables: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_table(self, as_of: &str, table: FactorScoreTable) -> Self {
        self.tables.borrow_mut().insert(date(as_of), table);
        self
    }
}

impl ScoreStorePort for MockScoreStore {
    fn write_scores(
        &self,
        as_of: NaiveDate,
        table: &FactorScoreTable,
    ) -> Result<PathBuf, ScoreTraderError> {
        self.tables.borrow_mut().insert(as_of, table.clone());
        Ok(PathBuf::from(format!("factor_scores_{as_of}.csv")))
    }

    fn read_scores(&self, as_of: NaiveDate) -> Result<FactorScoreTable, ScoreTraderError> {
        self.tables
            .borrow()
            .get(&as_of)
            .cloned()
            .ok_or_else(|| ScoreTraderError::MissingInput {
                path: PathBuf::from(format!("factor_scores_{as_of}.csv")),
            })
    }
}

pub struct MockReportPort {
    pub calls: RefCell<Vec<(NaiveDate, PerformanceSeries)>>,
}

impl MockReportPort {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl ReportPort for MockReportPort {
    fn write_returns(
        &self,
        run_date: NaiveDate,
        series: &PerformanceSeries,
    ) -> Result<PathBuf, ScoreTraderError> {
        self.calls.borrow_mut().push((run_date, series.clone()));
        Ok(PathBuf::from(format!("returns_{run_date}.csv")))
    }
}

pub fn make_row(ticker: &str, pe_ttm: f64, pb: f64, dividend_yield: f64) -> FactorRow {
    FactorRow::new(ticker, date("2025-07-16")).with_valuation(pe_ttm, pb, dividend_yield)
}

/// Consecutive calendar days from `start`, one column per ticker.
pub fn make_history(tickers: &[&str], start: &str, closes: &[Vec<Option<f64>>]) -> PriceHistory {
    let mut history = PriceHistory::new(tickers.iter().map(|t| t.to_string()).collect());
    let first = date(start);
    for (i, row) in closes.iter().enumerate() {
        history
            .push_row(first + chrono::Duration::days(i as i64), row.clone())
            .unwrap();
    }
    history
}

/// Linear close path from `from` to `to` over `days` observations.
pub fn ramp(from: f64, to: f64, days: usize) -> Vec<f64> {
    if days == 1 {
        return vec![to];
    }
    (0..days)
        .map(|i| from + (to - from) * i as f64 / (days - 1) as f64)
        .collect()
}
