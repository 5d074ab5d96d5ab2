//! Core domain types and logic.

pub mod basket;
pub mod config_validation;
pub mod diagnostic;
pub mod error;
pub mod factor;
pub mod factor_row;
pub mod holding;
pub mod metrics;
pub mod portfolio;
pub mod price_history;
pub mod run_config;
pub mod scorer;
pub mod selector;
pub mod simulator;
