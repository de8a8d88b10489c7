//! Tabular (CSV) sink

use super::types::{BatchReport, RecordSink, SinkFormat};
use crate::batch::Batch;
use crate::codec::{encode_scalar, TargetFormat};
use crate::error::{Error, Result};
use crate::schema::SchemaTracker;
use csv::{QuoteStyle, WriterBuilder};
use std::io::Write;
use tracing::warn;

/// Writes a header row and one row per record
///
/// The header comes from the first record (see [`SchemaTracker`]). Missing
/// fields become empty cells; decimals keep their exact digits; nested values
/// are written as compact JSON text. Empty input produces an empty file, and
/// so does a first record without fields; records after it are rejected.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    tracker: SchemaTracker,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W, delimiter: u8) -> Self {
        let writer = WriterBuilder::new()
            .delimiter(delimiter)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(writer);
        Self {
            writer,
            tracker: SchemaTracker::new(),
        }
    }

    /// Header fixed so far (empty before the first record)
    pub fn header(&self) -> &[String] {
        self.tracker.header()
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| Error::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn write_batch(&mut self, batch: &Batch) -> Result<BatchReport> {
        let mut report = BatchReport::default();

        for record in batch {
            let first = !self.tracker.is_frozen();
            report.anomalies += self.tracker.observe(record).len();

            if first {
                if self.tracker.header().is_empty() {
                    warn!("First record has no fields; CSV output will have no columns");
                } else {
                    self.writer.write_record(self.tracker.header())?;
                }
            }

            if self.tracker.header().is_empty() {
                // nothing to write under an empty header
                report.rows_rejected += 1;
            } else {
                let cells = self
                    .tracker
                    .project(record)
                    .into_iter()
                    .map(|cell| match cell {
                        Some(value) => encode_scalar(value, TargetFormat::Csv),
                        None => Ok(String::new()),
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.writer.write_record(&cells)?;
                report.rows_written += 1;
            }
        }

        Ok(report)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.flush()
    }

    fn format(&self) -> SinkFormat {
        SinkFormat::Csv
    }
}
