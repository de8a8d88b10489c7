//! JSON text sinks

use super::types::{BatchReport, RecordSink, SinkFormat};
use crate::batch::Batch;
use crate::error::Result;
use std::io::Write;

/// Writes one compact JSON object per line
pub struct NdjsonSink<W: Write> {
    writer: W,
    quote_decimals: bool,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(writer: W, quote_decimals: bool) -> Self {
        Self {
            writer,
            quote_decimals,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for NdjsonSink<W> {
    fn write_batch(&mut self, batch: &Batch) -> Result<BatchReport> {
        for record in batch {
            serde_json::to_writer(&mut self.writer, &record.to_json(self.quote_decimals))?;
            self.writer.write_all(b"\n")?;
        }
        Ok(BatchReport {
            rows_written: batch.len(),
            ..BatchReport::default()
        })
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.flush()
    }

    fn format(&self) -> SinkFormat {
        SinkFormat::Ndjson
    }
}

/// Writes a single JSON array
///
/// Layout: `[` on its own line, then one indented compact object per line
/// separated by `,`, then `]`. An empty input still produces `[` and `]`.
pub struct JsonArraySink<W: Write> {
    writer: W,
    quote_decimals: bool,
    indent: String,
    opened: bool,
    first: bool,
    closed: bool,
}

impl<W: Write> JsonArraySink<W> {
    pub fn new(writer: W, quote_decimals: bool, indent: usize) -> Self {
        Self {
            writer,
            quote_decimals,
            indent: " ".repeat(indent),
            opened: false,
            first: true,
            closed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn open(&mut self) -> Result<()> {
        if !self.opened {
            self.writer.write_all(b"[\n")?;
            self.opened = true;
        }
        Ok(())
    }
}

impl<W: Write> RecordSink for JsonArraySink<W> {
    fn write_batch(&mut self, batch: &Batch) -> Result<BatchReport> {
        self.open()?;
        for record in batch {
            if !self.first {
                self.writer.write_all(b",\n")?;
            }
            self.first = false;
            self.writer.write_all(self.indent.as_bytes())?;
            serde_json::to_writer(&mut self.writer, &record.to_json(self.quote_decimals))?;
        }
        Ok(BatchReport {
            rows_written: batch.len(),
            ..BatchReport::default()
        })
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if !self.closed {
            self.open()?;
            self.writer.write_all(b"\n]")?;
            self.closed = true;
        }
        self.flush()
    }

    fn format(&self) -> SinkFormat {
        SinkFormat::JsonArray
    }
}
