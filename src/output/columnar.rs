//! Native Parquet sink
//!
//! Batches are converted to Arrow arrays and written through an
//! [`ArrowWriter`]. The column set comes from the first record and the column
//! types from the first batch; both are frozen for the rest of the job.

use super::types::{BatchReport, RecordSink, SinkFormat};
use crate::batch::Batch;
use crate::codec::{encode_scalar, DecimalPolicy, ExactDecimal, TargetFormat, Value};
use crate::error::{Error, Result};
use crate::schema::SchemaTracker;
use arrow::array::{
    ArrayRef, BooleanBuilder, Decimal128Builder, Float64Builder, Int64Builder, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Configuration for the Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024, // 1M rows
        }
    }
}

impl ParquetWriterConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression algorithm
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set compression by name: `snappy`, `zstd`, `gzip` or `none`
    pub fn with_compression_name(self, name: &str) -> Result<Self> {
        let compression = match name.to_ascii_lowercase().as_str() {
            "snappy" => Compression::SNAPPY,
            "zstd" => Compression::ZSTD(ZstdLevel::default()),
            "gzip" => Compression::GZIP(GzipLevel::default()),
            "none" | "uncompressed" => Compression::UNCOMPRESSED,
            other => {
                return Err(Error::invalid_value(
                    "parquet.compression",
                    format!("unknown codec '{other}'"),
                ))
            }
        };
        Ok(self.with_compression(compression))
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    #[must_use]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    #[must_use]
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

/// Value class of a column, fixed from the first batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Boolean,
    Integer,
    Decimal,
    Text,
}

/// A value converted for its column
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Fixed(i128),
    Float(f64),
    Text(String),
}

enum WriterState<W: Write + Send> {
    /// No batch seen yet; the schema is not known
    Pending(W),
    Writing(ArrowWriter<W>),
    Closed,
}

/// Writes batches into a Parquet file
///
/// Decimal columns follow the [`DecimalPolicy`]: strings, `Decimal128`, or
/// `Float64`. Under the fixed policy a row holding a value that would need
/// rounding is rejected as a whole. A value whose type does not match its
/// frozen column is written as null and counted as an anomaly.
pub struct ParquetSink<W: Write + Send> {
    state: WriterState<W>,
    config: ParquetWriterConfig,
    policy: DecimalPolicy,
    tracker: SchemaTracker,
    kinds: Vec<ColumnKind>,
    schema: Option<SchemaRef>,
}

impl<W: Write + Send> ParquetSink<W> {
    pub fn new(writer: W, policy: DecimalPolicy, config: ParquetWriterConfig) -> Self {
        Self {
            state: WriterState::Pending(writer),
            config,
            policy,
            tracker: SchemaTracker::new(),
            kinds: Vec::new(),
            schema: None,
        }
    }

    /// Arrow schema in use, once the first batch has been written
    pub fn schema(&self) -> Option<&SchemaRef> {
        self.schema.as_ref()
    }

    fn decimal_type(&self) -> DataType {
        match self.policy {
            DecimalPolicy::String => DataType::Utf8,
            DecimalPolicy::Fixed { precision, scale } => DataType::Decimal128(precision, scale),
            DecimalPolicy::Approximate => DataType::Float64,
        }
    }

    /// Freeze column types from the first batch and open the Arrow writer
    fn start(&mut self, rows: &[Vec<Option<&Value>>]) -> Result<()> {
        let header = self.tracker.header();
        self.kinds = (0..header.len())
            .map(|col| infer_kind(rows.iter().filter_map(|row| row[col])))
            .collect();

        let fields: Vec<Field> = header
            .iter()
            .zip(&self.kinds)
            .map(|(name, kind)| {
                let data_type = match kind {
                    ColumnKind::Boolean => DataType::Boolean,
                    ColumnKind::Integer => DataType::Int64,
                    ColumnKind::Decimal => self.decimal_type(),
                    ColumnKind::Text => DataType::Utf8,
                };
                Field::new(name, data_type, true) // All fields nullable
            })
            .collect();
        let schema: SchemaRef = Arc::new(Schema::new(fields));

        if self.policy == DecimalPolicy::Approximate && self.kinds.contains(&ColumnKind::Decimal) {
            info!("Decimal columns are written as approximate binary doubles");
        }

        let writer = match std::mem::replace(&mut self.state, WriterState::Closed) {
            WriterState::Pending(writer) => writer,
            _ => return Err(Error::Other("Parquet sink is already closed".to_string())),
        };
        let props = self.config.build_properties();
        let arrow_writer = ArrowWriter::try_new(writer, Arc::clone(&schema), Some(props))?;

        debug!(columns = schema.fields().len(), "Parquet schema fixed");
        self.state = WriterState::Writing(arrow_writer);
        self.schema = Some(schema);
        Ok(())
    }

    /// Convert one projected row; `Err` rejects the row
    fn to_cells(&self, row: &[Option<&Value>], anomalies: &mut usize) -> Result<Vec<Cell>> {
        row.iter()
            .zip(&self.kinds)
            .map(|(value, kind)| {
                let value = match value {
                    None | Some(Value::Null) => return Ok(Cell::Null),
                    Some(v) => *v,
                };
                let cell = match (kind, value) {
                    (ColumnKind::Boolean, Value::Bool(b)) => Cell::Bool(*b),
                    (ColumnKind::Integer, Value::Integer(i)) => Cell::Int(*i),
                    (ColumnKind::Decimal, Value::Integer(i)) => {
                        self.decimal_cell(&ExactDecimal::from(*i))?
                    }
                    (ColumnKind::Decimal, Value::Decimal(d)) => self.decimal_cell(d)?,
                    (ColumnKind::Text, Value::Text(s)) => Cell::Text(s.clone()),
                    (ColumnKind::Text, other) => {
                        Cell::Text(encode_scalar(other, TargetFormat::Csv)?)
                    }
                    _ => Cell::Null,
                };
                if cell == Cell::Null {
                    *anomalies += 1;
                }
                Ok(cell)
            })
            .collect()
    }

    fn decimal_cell(&self, value: &ExactDecimal) -> Result<Cell> {
        Ok(match self.policy {
            DecimalPolicy::String => Cell::Text(value.to_string()),
            DecimalPolicy::Fixed { precision, scale } => {
                Cell::Fixed(value.to_fixed_point(precision, scale)?)
            }
            DecimalPolicy::Approximate => value.to_f64().map_or(Cell::Null, Cell::Float),
        })
    }

    fn build_columns(&self, rows: &[Vec<Cell>]) -> Result<Vec<ArrayRef>> {
        let Some(schema) = &self.schema else {
            return Err(Error::Other("Parquet schema is not initialized".to_string()));
        };

        schema
            .fields()
            .iter()
            .enumerate()
            .map(|(col, field)| build_array(rows.iter().map(|row| &row[col]), field.data_type()))
            .collect()
    }
}

impl<W: Write + Send> RecordSink for ParquetSink<W> {
    fn write_batch(&mut self, batch: &Batch) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        if batch.is_empty() {
            return Ok(report);
        }

        let first = !self.tracker.is_frozen();
        let mut projected = Vec::with_capacity(batch.len());
        for record in batch {
            report.anomalies += self.tracker.observe(record).len();
            projected.push(self.tracker.project(record));
        }

        // a Parquet file needs at least one column
        if self.tracker.header().is_empty() {
            if first {
                warn!("First record has no fields; Parquet output will have no rows");
            }
            report.rows_rejected = batch.len();
            return Ok(report);
        }

        if self.schema.is_none() {
            self.start(&projected)?;
        }

        let mut rows = Vec::with_capacity(projected.len());
        for (row, record) in projected.iter().zip(batch) {
            match self.to_cells(row, &mut report.anomalies) {
                Ok(cells) => rows.push(cells),
                Err(e) if e.is_recoverable() => {
                    error!(error = %e, fields = record.len(), "Rejecting row for Parquet output");
                    report.rows_rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if rows.is_empty() {
            return Ok(report);
        }

        let columns = self.build_columns(&rows)?;
        let schema = self
            .schema
            .clone()
            .ok_or_else(|| Error::Other("Parquet schema is not initialized".to_string()))?;
        let record_batch = RecordBatch::try_new(schema, columns)?;

        match &mut self.state {
            WriterState::Writing(writer) => writer.write(&record_batch)?,
            _ => return Err(Error::Other("Parquet sink is already closed".to_string())),
        }

        report.rows_written = rows.len();
        Ok(report)
    }

    fn flush(&mut self) -> Result<()> {
        match &mut self.state {
            WriterState::Writing(writer) => writer.flush()?,
            WriterState::Pending(writer) => writer.flush()?,
            WriterState::Closed => {}
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, WriterState::Closed) {
            WriterState::Writing(writer) => {
                let metadata = writer.close()?;
                debug!(rows = metadata.num_rows, "Parquet file closed");
            }
            WriterState::Pending(mut writer) => {
                warn!("No records reached the Parquet sink; output is empty");
                writer.flush()?;
            }
            WriterState::Closed => {}
        }
        Ok(())
    }

    fn format(&self) -> SinkFormat {
        SinkFormat::Parquet
    }
}

/// Widest kind that covers every non-null value in a column
fn infer_kind<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnKind {
    let mut kind = None;
    for value in values {
        let next = match value {
            Value::Null => continue,
            Value::Bool(_) => ColumnKind::Boolean,
            Value::Integer(_) => ColumnKind::Integer,
            Value::Decimal(_) => ColumnKind::Decimal,
            Value::Text(_) | Value::Array(_) | Value::Record(_) => ColumnKind::Text,
        };
        kind = Some(match (kind, next) {
            (None, next) => next,
            (Some(current), next) if current == next => current,
            (Some(ColumnKind::Integer), ColumnKind::Decimal)
            | (Some(ColumnKind::Decimal), ColumnKind::Integer) => ColumnKind::Decimal,
            _ => ColumnKind::Text,
        });
    }
    // all-null columns default to text
    kind.unwrap_or(ColumnKind::Text)
}

fn build_array<'a>(cells: impl Iterator<Item = &'a Cell>, data_type: &DataType) -> Result<ArrayRef> {
    let array: ArrayRef = match data_type {
        DataType::Boolean => {
            let mut builder = BooleanBuilder::new();
            for cell in cells {
                builder.append_option(match cell {
                    Cell::Bool(b) => Some(*b),
                    _ => None,
                });
            }
            Arc::new(builder.finish())
        }
        DataType::Int64 => {
            let mut builder = Int64Builder::new();
            for cell in cells {
                builder.append_option(match cell {
                    Cell::Int(i) => Some(*i),
                    _ => None,
                });
            }
            Arc::new(builder.finish())
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::new();
            for cell in cells {
                builder.append_option(match cell {
                    Cell::Float(f) => Some(*f),
                    _ => None,
                });
            }
            Arc::new(builder.finish())
        }
        DataType::Decimal128(precision, scale) => {
            let mut builder =
                Decimal128Builder::new().with_precision_and_scale(*precision, *scale)?;
            for cell in cells {
                builder.append_option(match cell {
                    Cell::Fixed(v) => Some(*v),
                    _ => None,
                });
            }
            Arc::new(builder.finish())
        }
        _ => {
            let mut builder = StringBuilder::new();
            for cell in cells {
                builder.append_option(match cell {
                    Cell::Text(s) => Some(s.as_str()),
                    _ => None,
                });
            }
            Arc::new(builder.finish())
        }
    };
    Ok(array)
}
