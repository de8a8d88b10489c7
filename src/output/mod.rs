//! Output module
//!
//! Record sinks for every target layout.
//!
//! # Overview
//!
//! This module provides:
//! - NDJSON and JSON array writers that keep decimal digits exact
//! - A CSV writer with a header frozen from the first record
//! - A native Parquet writer built on Arrow arrays

mod columnar;
mod json;
mod tabular;
mod types;

pub use columnar::{ParquetSink, ParquetWriterConfig};
pub use json::{JsonArraySink, NdjsonSink};
pub use tabular::CsvSink;
pub use types::{BatchReport, RecordSink, SinkFormat, SinkOptions};

use std::io::Write;

/// Open a sink of the given format over `writer`
pub fn open_sink<'a, W: Write + Send + 'a>(
    writer: W,
    format: SinkFormat,
    options: &SinkOptions,
) -> Box<dyn RecordSink + 'a> {
    match format {
        SinkFormat::Ndjson => Box::new(NdjsonSink::new(writer, options.quote_decimals)),
        SinkFormat::JsonArray => Box::new(JsonArraySink::new(
            writer,
            options.quote_decimals,
            options.json_indent,
        )),
        SinkFormat::Csv => Box::new(CsvSink::new(writer, options.csv_delimiter)),
        SinkFormat::Parquet => Box::new(ParquetSink::new(
            writer,
            options.decimal_policy,
            options.parquet.clone(),
        )),
    }
}

#[cfg(test)]
mod tests;
