//! Buy-and-hold replay of a fixed basket.
//!
//! The simulator is fed one trading day at a time. On the first day with at
//! least one usable close it splits cash equally across the tickers priced
//! that day and buys whole shares; afterwards it only revalues. Cash that
//! integer rounding leaves unspent stays idle. Calling [`Simulator::finish`]
//! consumes the simulator and ends the replay.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use super::diagnostic::{Diagnostic, DiagnosticKind};
use super::error::ScoreTraderError;
use super::holding::Holding;
use super::portfolio::{PortfolioState, ValuePoint};
use super::price_history::PriceHistory;

/// What a held ticker contributes on a day it has no close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPricePolicy {
    /// Value the holding at its last known close.
    CarryForward,
    /// The holding contributes nothing that day.
    Exclude,
}

impl FromStr for MissingPricePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "carry_forward" => Ok(MissingPricePolicy::CarryForward),
            "exclude" => Ok(MissingPricePolicy::Exclude),
            other => Err(format!("unknown missing price policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Unfunded,
    Entered,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformancePoint {
    pub date: NaiveDate,
    pub total_value: f64,
    pub daily_return: f64,
    pub cum_return: f64,
}

/// Daily value series with derived returns. The first point has zero daily
/// and cumulative return.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PerformanceSeries {
    pub points: Vec<PerformancePoint>,
}

impl PerformanceSeries {
    pub fn from_values(values: &[ValuePoint]) -> Self {
        let mut points = Vec::with_capacity(values.len());
        let mut growth = 1.0_f64;
        for (i, v) in values.iter().enumerate() {
            let daily_return = if i == 0 {
                0.0
            } else {
                let prev = values[i - 1].total_value;
                if prev > 0.0 {
                    (v.total_value - prev) / prev
                } else {
                    0.0
                }
            };
            growth *= 1.0 + daily_return;
            points.push(PerformancePoint {
                date: v.date,
                total_value: v.total_value,
                daily_return,
                cum_return: growth - 1.0,
            });
        }
        PerformanceSeries { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn final_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.total_value)
    }

    pub fn daily_returns(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.daily_return).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub initial_cash: f64,
    pub entry_date: NaiveDate,
    /// Cash left after entry; unchanged for the rest of the replay.
    pub idle_cash: f64,
    pub holdings: Vec<Holding>,
    /// Last known close of each holding at the end of the replay.
    pub final_closes: BTreeMap<String, f64>,
    pub series: PerformanceSeries,
    pub diagnostics: Vec<Diagnostic>,
}

impl SimulationResult {
    pub fn final_value(&self) -> f64 {
        self.series.final_value().unwrap_or(self.initial_cash)
    }

    /// (final_value - initial_cash) / initial_cash
    pub fn total_return(&self) -> f64 {
        (self.final_value() - self.initial_cash) / self.initial_cash
    }

    pub fn unrealized_pnl(&self, holding: &Holding) -> Option<f64> {
        self.final_closes
            .get(&holding.ticker)
            .map(|&close| holding.unrealized_pnl(close))
    }
}

#[derive(Debug, Clone)]
pub struct Simulator {
    basket: Vec<String>,
    policy: MissingPricePolicy,
    state: SimulationState,
    portfolio: PortfolioState,
    entry_date: Option<NaiveDate>,
    last_close: HashMap<String, f64>,
    diagnostics: Vec<Diagnostic>,
}

impl Simulator {
    /// Repeated tickers in `basket` are held once.
    pub fn new(initial_cash: f64, basket: Vec<String>, policy: MissingPricePolicy) -> Self {
        let mut seen = HashSet::new();
        let basket = basket.into_iter().filter(|t| seen.insert(t.clone())).collect();
        Simulator {
            basket,
            policy,
            state: SimulationState::Unfunded,
            portfolio: PortfolioState::new(initial_cash),
            entry_date: None,
            last_close: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn portfolio(&self) -> &PortfolioState {
        &self.portfolio
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Feed one trading day. `closes` maps ticker to that day's close;
    /// absent or non-positive entries count as missing.
    pub fn on_day(&mut self, date: NaiveDate, closes: &HashMap<String, f64>) {
        match self.state {
            SimulationState::Unfunded => self.try_enter(date, closes),
            SimulationState::Entered => self.revalue(date, closes),
        }
    }

    fn try_enter(&mut self, date: NaiveDate, closes: &HashMap<String, f64>) {
        let priced: Vec<(String, f64)> = self
            .basket
            .iter()
            .filter_map(|t| usable(closes.get(t).copied()).map(|p| (t.clone(), p)))
            .collect();
        if priced.is_empty() {
            tracing::debug!(%date, "no basket prices, still unfunded");
            return;
        }

        let unpriced: Vec<String> = self
            .basket
            .iter()
            .filter(|ticker| !priced.iter().any(|(t, _)| t == *ticker))
            .cloned()
            .collect();
        for ticker in unpriced {
            self.note(Diagnostic::new(ticker, DiagnosticKind::InvalidEntryPrice));
        }

        let total_value = self.portfolio.cash;
        let weight = 1.0 / priced.len() as f64;
        let target_value = total_value * weight;
        tracing::info!(%date, total_value, weight, "entering basket");

        for (ticker, price) in priced {
            let shares = Holding::affordable_shares(target_value, price).unwrap_or(0);
            if shares == 0 {
                self.note(Diagnostic::new(
                    ticker,
                    DiagnosticKind::ZeroShares {
                        price,
                        target_value,
                    },
                ));
                continue;
            }
            tracing::debug!(%ticker, price, shares, value = shares as f64 * price, "buy");
            self.last_close.insert(ticker.clone(), price);
            self.portfolio.open(Holding {
                ticker,
                shares,
                entry_price: price,
                entry_date: date,
            });
        }

        self.entry_date = Some(date);
        self.state = SimulationState::Entered;
        let value = self.mark(date, closes);
        self.portfolio.record_value(date, value);
    }

    fn revalue(&mut self, date: NaiveDate, closes: &HashMap<String, f64>) {
        let value = self.mark(date, closes);
        tracing::debug!(%date, total_value = value, cash = self.portfolio.cash, "revalued");
        self.portfolio.record_value(date, value);
    }

    /// Price every holding for `date`, applying the missing-price policy.
    fn mark(&mut self, date: NaiveDate, closes: &HashMap<String, f64>) -> f64 {
        let mut marks = HashMap::with_capacity(self.portfolio.holding_count());
        let mut stale = Vec::new();

        for ticker in self.portfolio.holdings.keys() {
            match usable(closes.get(ticker).copied()) {
                Some(price) => {
                    self.last_close.insert(ticker.clone(), price);
                    marks.insert(ticker.clone(), price);
                }
                None => {
                    stale.push(ticker.clone());
                    if self.policy == MissingPricePolicy::CarryForward {
                        if let Some(&last) = self.last_close.get(ticker) {
                            marks.insert(ticker.clone(), last);
                        }
                    }
                }
            }
        }

        for ticker in stale {
            self.note(Diagnostic::new(ticker, DiagnosticKind::StalePrice { date }));
        }
        self.portfolio.total_value(&marks)
    }

    fn note(&mut self, diag: Diagnostic) {
        tracing::warn!(%diag, "simulation");
        self.diagnostics.push(diag);
    }

    /// End the replay. Fails when no day ever had a usable basket price.
    pub fn finish(self) -> Result<SimulationResult, ScoreTraderError> {
        let entry_date = match (self.state, self.entry_date) {
            (SimulationState::Entered, Some(date)) => date,
            _ => {
                return Err(ScoreTraderError::insufficient(
                    format!(
                        "basket tickers with a valid entry price ({})",
                        self.basket.join(", ")
                    ),
                    0,
                    1,
                ));
            }
        };

        let final_closes = self
            .portfolio
            .holdings
            .keys()
            .filter_map(|t| self.last_close.get(t).map(|&c| (t.clone(), c)))
            .collect();

        Ok(SimulationResult {
            initial_cash: self.portfolio.initial_cash,
            entry_date,
            idle_cash: self.portfolio.cash,
            holdings: self.portfolio.holdings.into_values().collect(),
            final_closes,
            series: PerformanceSeries::from_values(&self.portfolio.value_curve),
            diagnostics: self.diagnostics,
        })
    }
}

fn usable(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

/// Replay `basket` over every day of `window`.
///
/// `window` must already be restricted to the replay dates; tickers are
/// matched case-insensitively against its columns.
pub fn simulate(
    initial_cash: f64,
    basket: &[String],
    window: &PriceHistory,
    policy: MissingPricePolicy,
) -> Result<SimulationResult, ScoreTraderError> {
    let basket: Vec<String> = basket.iter().map(|t| t.to_uppercase()).collect();
    let mut sim = Simulator::new(initial_cash, basket, policy);
    let basket = sim.basket.clone();

    for (day, &date) in window.dates().iter().enumerate() {
        let closes: HashMap<String, f64> = basket
            .iter()
            .filter_map(|t| window.close_at(day, t).map(|c| (t.clone(), c)))
            .collect();
        sim.on_day(date, &closes);
    }

    sim.finish()
}
