//! Fundamental snapshot per ticker per as-of date.

use chrono::NaiveDate;

/// One row of the factor table. Missing cells are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorRow {
    pub ticker: String,
    pub date: NaiveDate,
    pub pe_ttm: Option<f64>,
    pub pb: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub close: Option<f64>,
    pub roe: Option<f64>,
}

impl FactorRow {
    pub fn new(ticker: impl Into<String>, date: NaiveDate) -> Self {
        FactorRow {
            ticker: ticker.into(),
            date,
            pe_ttm: None,
            pb: None,
            dividend_yield: None,
            close: None,
            roe: None,
        }
    }

    pub fn with_valuation(mut self, pe_ttm: f64, pb: f64, dividend_yield: f64) -> Self {
        self.pe_ttm = Some(pe_ttm);
        self.pb = Some(pb);
        self.dividend_yield = Some(dividend_yield);
        self
    }

    pub fn with_close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    pub fn with_roe(mut self, roe: f64) -> Self {
        self.roe = Some(roe);
        self
    }
}
