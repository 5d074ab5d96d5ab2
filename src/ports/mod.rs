//! Port traits the domain pipelines are written against.

pub mod config_port;
pub mod data_port;
pub mod report_port;
pub mod score_store_port;
