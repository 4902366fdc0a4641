//! Station air-quality loading and date-range queries.
//!
//! Loads hourly PRSA-style measurement files (CSV, JSON records or Parquet)
//! into cleaned, timestamp-ordered station datasets and answers date-range
//! queries with a monthly PM2.5 trend and a correlation matrix.

pub mod catalog;
pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod state;
