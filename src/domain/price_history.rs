//! Close-price history: per-ticker series and the date-aligned matrix
//! they are loaded from.
//!
//! The matrix keeps one row per date and one column per ticker; a cell is
//! `None` when the close is absent. Dates are strictly increasing.

use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Observed closes of one ticker in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub ticker: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PriceHistoryError {
    #[error("dates not strictly increasing at {0}")]
    Unordered(NaiveDate),

    #[error("row for {date} has {got} cells, expected {expected}")]
    RowWidth {
        date: NaiveDate,
        got: usize,
        expected: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceHistory {
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<Option<f64>>>,
    column_index: HashMap<String, usize>,
}

impl PriceHistory {
    /// Column names are matched case-insensitively; they are stored upper-cased.
    pub fn new(tickers: Vec<String>) -> Self {
        let tickers: Vec<String> = tickers.into_iter().map(|t| t.to_uppercase()).collect();
        let column_index = tickers
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        PriceHistory {
            tickers,
            dates: Vec::new(),
            rows: Vec::new(),
            column_index,
        }
    }

    pub fn push_row(
        &mut self,
        date: NaiveDate,
        closes: Vec<Option<f64>>,
    ) -> Result<(), PriceHistoryError> {
        if let Some(&last) = self.dates.last() {
            if date <= last {
                return Err(PriceHistoryError::Unordered(date));
            }
        }
        if closes.len() != self.tickers.len() {
            return Err(PriceHistoryError::RowWidth {
                date,
                got: closes.len(),
                expected: self.tickers.len(),
            });
        }
        self.dates.push(date);
        self.rows.push(closes);
        Ok(())
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn day_count(&self) -> usize {
        self.dates.len()
    }

    pub fn has_ticker(&self, ticker: &str) -> bool {
        self.column_index.contains_key(&ticker.to_uppercase())
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Close for `ticker` on the `day`-th row. Non-finite cells read as absent.
    pub fn close_at(&self, day: usize, ticker: &str) -> Option<f64> {
        let col = *self.column_index.get(&ticker.to_uppercase())?;
        self.rows
            .get(day)
            .and_then(|row| row[col])
            .filter(|c| c.is_finite())
    }

    /// Observed closes of one ticker, skipping absent cells.
    pub fn series(&self, ticker: &str) -> Option<PriceSeries> {
        let col = *self.column_index.get(&ticker.to_uppercase())?;
        let points = self
            .dates
            .iter()
            .zip(&self.rows)
            .filter_map(|(&date, row)| {
                row[col]
                    .filter(|c| c.is_finite())
                    .map(|close| PricePoint { date, close })
            })
            .collect();
        Some(PriceSeries {
            ticker: self.tickers[col].clone(),
            points,
        })
    }

    /// One point per date row from the ticker's first observed close on.
    /// Absent cells repeat the previous close, so `points[i]` and
    /// `points[i + k]` are always `k` rows apart.
    pub fn filled_series(&self, ticker: &str) -> Option<PriceSeries> {
        let col = *self.column_index.get(&ticker.to_uppercase())?;
        let mut last: Option<f64> = None;
        let mut points = Vec::with_capacity(self.rows.len());
        for (&date, row) in self.dates.iter().zip(&self.rows) {
            if let Some(close) = row[col].filter(|c| c.is_finite()) {
                last = Some(close);
            }
            if let Some(close) = last {
                points.push(PricePoint { date, close });
            }
        }
        Some(PriceSeries {
            ticker: self.tickers[col].clone(),
            points,
        })
    }

    /// Rows with `start <= date <= end`, all columns kept.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> PriceHistory {
        let mut out = PriceHistory::new(self.tickers.clone());
        for (date, row) in self.dates.iter().zip(&self.rows) {
            if *date >= start && *date <= end {
                out.dates.push(*date);
                out.rows.push(row.clone());
            }
        }
        out
    }

    /// Only the columns named in `tickers` that exist here, in that order.
    pub fn select(&self, tickers: &[String]) -> PriceHistory {
        let cols: Vec<usize> = tickers
            .iter()
            .filter_map(|t| self.column_index.get(&t.to_uppercase()).copied())
            .collect();
        let mut out = PriceHistory::new(cols.iter().map(|&c| self.tickers[c].clone()).collect());
        out.dates = self.dates.clone();
        out.rows = self
            .rows
            .iter()
            .map(|row| cols.iter().map(|&c| row[c]).collect())
            .collect();
        out
    }

    /// Rows up to and including `as_of`.
    pub fn until(&self, as_of: NaiveDate) -> PriceHistory {
        match self.dates.first() {
            Some(&first) => self.window(first, as_of),
            None => self.clone(),
        }
    }
}
