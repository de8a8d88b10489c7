//! Sink types and traits

use super::columnar::ParquetWriterConfig;
use crate::batch::Batch;
use crate::codec::DecimalPolicy;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Target layout of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SinkFormat {
    /// One compact JSON object per line
    Ndjson,
    /// A single JSON array, one indented object per line
    #[value(name = "json")]
    #[serde(rename = "json")]
    JsonArray,
    /// Header row followed by one row per record
    Csv,
    /// Apache Parquet written through Arrow
    Parquet,
}

impl SinkFormat {
    /// Whether records are laid out as rows under a fixed header
    pub fn is_tabular(&self) -> bool {
        matches!(self, SinkFormat::Csv | SinkFormat::Parquet)
    }
}

/// Outcome of writing one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Rows that reached the output
    pub rows_written: usize,
    /// Rows refused by the sink (counted as failed records)
    pub rows_rejected: usize,
    /// Dropped fields and values that did not fit their column
    pub anomalies: usize,
}

/// Destination for batches of records
///
/// Records arrive in input order and are written in that order. `finish`
/// writes any closing syntax and flushes; it is called once, on success and
/// after a fatal source error alike, so flushed records always form a
/// readable document.
pub trait RecordSink {
    fn write_batch(&mut self, batch: &Batch) -> Result<BatchReport>;

    /// Push buffered bytes to the underlying writer
    fn flush(&mut self) -> Result<()>;

    /// Close the document
    fn finish(&mut self) -> Result<()>;

    fn format(&self) -> SinkFormat;
}

/// Options shared by all sinks
#[derive(Debug, Clone)]
pub struct SinkOptions {
    /// Write decimals into JSON as strings instead of number literals
    pub quote_decimals: bool,
    /// Spaces before each object in a JSON array
    pub json_indent: usize,
    pub csv_delimiter: u8,
    /// Decimal storage in binary columnar output
    pub decimal_policy: DecimalPolicy,
    pub parquet: ParquetWriterConfig,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            quote_decimals: false,
            json_indent: 4,
            csv_delimiter: b',',
            decimal_policy: DecimalPolicy::default(),
            parquet: ParquetWriterConfig::default(),
        }
    }
}

impl SinkOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_quote_decimals(mut self, enabled: bool) -> Self {
        self.quote_decimals = enabled;
        self
    }

    #[must_use]
    pub fn with_json_indent(mut self, indent: usize) -> Self {
        self.json_indent = indent;
        self
    }

    #[must_use]
    pub fn with_csv_delimiter(mut self, delimiter: u8) -> Self {
        self.csv_delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn with_decimal_policy(mut self, policy: DecimalPolicy) -> Self {
        self.decimal_policy = policy;
        self
    }

    #[must_use]
    pub fn with_parquet(mut self, config: ParquetWriterConfig) -> Self {
        self.parquet = config;
        self
    }
}
