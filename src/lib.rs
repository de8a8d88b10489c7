//! # streamconv
//!
//! Streaming, precision-preserving conversion of record data between NDJSON,
//! JSON arrays, CSV and columnar formats.
//!
//! ## Features
//!
//! - **Exact decimals**: fractional literals keep their original digits from
//!   input to output; binary columnar output needs an explicit decimal policy
//! - **Bounded memory**: records are pulled lazily and written in fixed-size
//!   batches
//! - **Error isolation**: a bad NDJSON line is logged and skipped, a broken
//!   JSON array stops the job with everything already written left readable
//! - **Columnar output**: native Parquet through Arrow, or Parquet and Avro
//!   through DuckDB
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use streamconv::engine::{ConversionPipeline, PipelineConfig, SinkConfig, SourceConfig};
//! use streamconv::output::SinkFormat;
//! use streamconv::source::SourceFormat;
//!
//! let mut pipeline = ConversionPipeline::new(PipelineConfig::default().with_batch_size(500));
//! let stats = pipeline.run(
//!     &SourceConfig::new("events.json", SourceFormat::Auto),
//!     &SinkConfig::new("events.csv", SinkFormat::Csv),
//! )?;
//! println!("{} records", stats.records_succeeded);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────────────────┐
//! │ RecordSource │ → │ BatchAccumulator │ → │ RecordSink               │
//! │ NDJSON       │   │ batch_size       │   │ NDJSON / JSON array      │
//! │ JSON array   │   │                  │   │ CSV (SchemaTracker)      │
//! └──────────────┘   └──────────────────┘   │ Parquet (SchemaTracker)  │
//!         └────────── ConversionPipeline ───┴──────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Values, exact decimals and scalar encoding
pub mod codec;

/// Lazy record sources (NDJSON, JSON array)
pub mod source;

/// Fixed-size batching
pub mod batch;

/// Output header tracking and object flattening
pub mod schema;

/// Record sinks (NDJSON, JSON array, CSV, Parquet)
pub mod output;

/// Conversion pipeline
pub mod engine;

/// Columnar engine support via DuckDB
pub mod database;

/// Job configuration file
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{DecimalPolicy, ExactDecimal, Record, Value};
pub use engine::{ConversionPipeline, JobStats, PipelineConfig};
pub use error::{Error, ErrorClass, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
