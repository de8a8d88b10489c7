//! CLI module
//!
//! Command-line interface for running conversion jobs.
//!
//! # Commands
//!
//! - `json-to-ndjson` - JSON array to NDJSON
//! - `ndjson-to-json` - NDJSON to JSON array
//! - `flatten` - JSON records to CSV
//! - `convert` - any supported input to NDJSON, JSON, CSV or Parquet
//! - `columnar` - NDJSON to Parquet or Avro through DuckDB
//! - `prune-columns` - drop empty CSV columns

mod commands;
mod logging;
mod runner;

pub use commands::{Cli, Commands, DecimalMode};
pub use logging::{LevelPrefix, LogLevel, LogSettings};
pub use runner::Runner;
