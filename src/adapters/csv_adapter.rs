//! CSV file adapter for factor tables, price history, score tables and
//! returns tables.

use crate::domain::error::ScoreTraderError;
use crate::domain::factor::FactorKind;
use crate::domain::factor_row::FactorRow;
use crate::domain::price_history::PriceHistory;
use crate::domain::run_config::DataPaths;
use crate::domain::scorer::{FactorScoreTable, ScoreRow};
use crate::domain::simulator::PerformanceSeries;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;
use crate::ports::score_store_port::ScoreStorePort;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    paths: DataPaths,
}

#[derive(Debug, Deserialize)]
struct FundamentalRecord {
    ticker: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pe_ttm: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pb: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    dividendyield: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    roe: Option<f64>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReturnRecord {
    date: String,
    total_value: f64,
    daily_return: f64,
    cum_return: f64,
}

impl CsvAdapter {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }

    pub fn fundamentals_path(&self, date: NaiveDate) -> PathBuf {
        self.paths
            .fundamental_dir
            .join(format!("fundamentals_{}.csv", date.format("%Y-%m-%d")))
    }

    pub fn prices_path(&self, date: NaiveDate) -> PathBuf {
        self.paths
            .price_dir
            .join(format!("close_prices_{}.csv", date.format("%Y-%m-%d")))
    }

    pub fn scores_path(&self, date: NaiveDate) -> PathBuf {
        self.paths
            .output_dir
            .join(format!("factor_scores_{}.csv", date.format("%Y-%m-%d")))
    }

    pub fn returns_path(&self, date: NaiveDate) -> PathBuf {
        self.paths
            .output_dir
            .join(format!("returns_{}.csv", date.format("%Y-%m-%d")))
    }

    fn open_input(path: &Path) -> Result<csv::Reader<File>, ScoreTraderError> {
        match File::open(path) {
            Ok(file) => Ok(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ScoreTraderError::MissingInput {
                path: path.to_path_buf(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn create_output(&self, path: &Path) -> Result<csv::Writer<File>, ScoreTraderError> {
        fs::create_dir_all(&self.paths.output_dir)?;
        Ok(csv::Writer::from_path(path)?)
    }
}

fn malformed(path: &Path, reason: impl Into<String>) -> ScoreTraderError {
    ScoreTraderError::MalformedInput {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Date from the first ten characters, so `2025-07-16 00:00:00-04:00` reads
/// as 2025-07-16.
fn parse_date_prefix(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let prefix = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

fn parse_cell(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        value.parse::<f64>().ok()
    }
}

impl DataPort for CsvAdapter {
    fn load_factor_table(&self, date: NaiveDate) -> Result<Vec<FactorRow>, ScoreTraderError> {
        let path = self.fundamentals_path(date);
        let mut rdr = Self::open_input(&path)?;

        let mut rows = Vec::new();
        for result in rdr.deserialize() {
            let record: FundamentalRecord = result?;
            let ticker = record.ticker.trim().to_uppercase();
            if ticker.is_empty() {
                return Err(malformed(&path, "row without ticker"));
            }
            let row_date = match record.date.as_deref().filter(|d| !d.trim().is_empty()) {
                Some(raw) => parse_date_prefix(raw)
                    .ok_or_else(|| malformed(&path, format!("invalid date '{raw}' for {ticker}")))?,
                None => date,
            };
            rows.push(FactorRow {
                ticker,
                date: row_date,
                pe_ttm: record.pe_ttm,
                pb: record.pb,
                dividend_yield: record.dividendyield,
                close: record.close,
                roe: record.roe,
            });
        }

        tracing::info!(path = %path.display(), rows = rows.len(), "loaded factor table");
        Ok(rows)
    }

    fn load_price_history(&self, date: NaiveDate) -> Result<PriceHistory, ScoreTraderError> {
        let path = self.prices_path(date);
        let mut rdr = Self::open_input(&path)?;

        let headers = rdr.headers()?.clone();
        match headers.get(0) {
            Some(h) if h.eq_ignore_ascii_case("date") => {}
            _ => return Err(malformed(&path, "first column must be the date")),
        }
        let tickers: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut rows: Vec<(NaiveDate, Vec<Option<f64>>)> = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let raw_date = record.get(0).unwrap_or_default();
            let day = parse_date_prefix(raw_date)
                .ok_or_else(|| malformed(&path, format!("invalid date '{raw_date}'")))?;
            let closes = (1..=tickers.len())
                .map(|i| record.get(i).and_then(parse_cell))
                .collect();
            rows.push((day, closes));
        }

        rows.sort_by_key(|(day, _)| *day);
        if let Some(w) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(malformed(&path, format!("duplicate date {}", w[0].0)));
        }

        let mut history = PriceHistory::new(tickers);
        for (day, closes) in rows {
            history
                .push_row(day, closes)
                .map_err(|e| malformed(&path, e.to_string()))?;
        }

        tracing::info!(
            path = %path.display(),
            days = history.day_count(),
            tickers = history.tickers().len(),
            "loaded price history"
        );
        Ok(history)
    }
}

impl ScoreStorePort for CsvAdapter {
    fn write_scores(
        &self,
        date: NaiveDate,
        table: &FactorScoreTable,
    ) -> Result<PathBuf, ScoreTraderError> {
        let path = self.scores_path(date);
        let mut wtr = self.create_output(&path)?;

        let mut header = vec!["ticker".to_string()];
        header.extend(table.factors.iter().map(|f| f.column().to_string()));
        header.push("total_score".to_string());
        wtr.write_record(&header)?;

        for row in &table.rows {
            let mut record = vec![row.ticker.clone()];
            record.extend(
                row.factor_scores
                    .iter()
                    .map(|s| s.map(|v| v.to_string()).unwrap_or_default()),
            );
            record.push(row.total_score.to_string());
            wtr.write_record(&record)?;
        }
        wtr.flush()?;

        tracing::info!(path = %path.display(), rows = table.len(), "wrote score table");
        Ok(path)
    }

    fn read_scores(&self, date: NaiveDate) -> Result<FactorScoreTable, ScoreTraderError> {
        let path = self.scores_path(date);
        let mut rdr = Self::open_input(&path)?;

        let headers = rdr.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let ticker_col = column("ticker").ok_or_else(|| malformed(&path, "missing ticker column"))?;
        let total_col =
            column("total_score").ok_or_else(|| malformed(&path, "missing total_score column"))?;

        let factor_cols: Vec<(usize, FactorKind)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != ticker_col && *i != total_col)
            .filter_map(|(i, h)| h.parse::<FactorKind>().ok().map(|k| (i, k)))
            .collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let ticker = record.get(ticker_col).unwrap_or_default().to_uppercase();
            let raw_total = record.get(total_col).unwrap_or_default();
            let total_score = parse_cell(raw_total).ok_or_else(|| {
                malformed(&path, format!("invalid total_score '{raw_total}' for {ticker}"))
            })?;
            let factor_scores = factor_cols
                .iter()
                .map(|(i, _)| record.get(*i).and_then(parse_cell))
                .collect();
            rows.push(ScoreRow {
                ticker,
                factor_scores,
                total_score,
            });
        }

        let factors: Vec<FactorKind> = factor_cols.iter().map(|(_, k)| *k).collect();
        // A factor written as empty cells for every ticker was excluded.
        let excluded = factors
            .iter()
            .enumerate()
            .filter(|(col, _)| {
                !rows.is_empty() && rows.iter().all(|r| r.factor_scores[*col].is_none())
            })
            .map(|(_, k)| *k)
            .collect();

        tracing::info!(path = %path.display(), rows = rows.len(), "read score table");
        Ok(FactorScoreTable {
            factors,
            excluded,
            rows,
        })
    }
}

impl ReportPort for CsvAdapter {
    fn write_returns(
        &self,
        run_date: NaiveDate,
        series: &PerformanceSeries,
    ) -> Result<PathBuf, ScoreTraderError> {
        let path = self.returns_path(run_date);
        let mut wtr = self.create_output(&path)?;

        for p in &series.points {
            wtr.serialize(ReturnRecord {
                date: p.date.format("%Y-%m-%d").to_string(),
                total_value: p.total_value,
                daily_return: p.daily_return,
                cum_return: p.cum_return,
            })?;
        }
        wtr.flush()?;

        tracing::info!(path = %path.display(), days = series.len(), "wrote returns table");
        Ok(path)
    }
}
