//! Portfolio state and value tracking.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use super::holding::Holding;

#[derive(Debug, Clone, PartialEq)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub total_value: f64,
}

/// Cash plus holdings. Holdings are keyed by ticker in sorted order so
/// valuations sum in a fixed order.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub cash: f64,
    pub initial_cash: f64,
    pub holdings: BTreeMap<String, Holding>,
    pub value_curve: Vec<ValuePoint>,
}

impl PortfolioState {
    pub fn new(initial_cash: f64) -> Self {
        PortfolioState {
            cash: initial_cash,
            initial_cash,
            holdings: BTreeMap::new(),
            value_curve: Vec::new(),
        }
    }

    /// Adds the holding and debits its entry value from cash.
    pub fn open(&mut self, holding: Holding) {
        self.cash -= holding.entry_value();
        self.holdings.insert(holding.ticker.clone(), holding);
    }

    pub fn holding(&self, ticker: &str) -> Option<&Holding> {
        self.holdings.get(ticker)
    }

    pub fn has_holding(&self, ticker: &str) -> bool {
        self.holdings.contains_key(ticker)
    }

    pub fn holding_count(&self) -> usize {
        self.holdings.len()
    }

    pub fn invested_value(&self) -> f64 {
        self.holdings.values().map(Holding::entry_value).sum()
    }

    pub fn record_value(&mut self, date: NaiveDate, total_value: f64) {
        self.value_curve.push(ValuePoint { date, total_value });
    }

    /// Cash plus marked holdings; holdings without a price contribute nothing.
    pub fn total_value(&self, price_map: &HashMap<String, f64>) -> f64 {
        let holdings_value: f64 = self
            .holdings
            .values()
            .filter_map(|h| price_map.get(&h.ticker).map(|&p| h.market_value(p)))
            .sum();
        self.cash + holdings_value
    }
}
