//! Avro schema inference and writing
//!
//! The schema is derived from the engine's column types. Rows are produced by
//! streaming the NDJSON input again, so memory stays bounded by one record.

use super::engine::{ColumnSpec, ColumnarReport};
use crate::codec::{encode_scalar, DecimalPolicy, ExactDecimal, Record, TargetFormat, Value};
use crate::error::{Error, Result};
use crate::source::{NdjsonSource, RecordSource};
use apache_avro::types::Value as AvroValue;
use apache_avro::{Decimal, Schema, Writer};
use chrono::NaiveDate;
use regex::Regex;
use serde_json::json;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, error, info};

/// Characters not allowed in Avro names
static INVALID_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Name of the generated record type
pub const RECORD_NAME: &str = "InferredSchema";

/// Avro type of one field, before the null union is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvroKind {
    String,
    Long,
    Double,
    /// `bytes` with the decimal logical type
    Decimal { precision: u8, scale: i8 },
    Boolean,
    Date,
}

impl AvroKind {
    /// Map an engine type to an Avro type
    ///
    /// The engine reads fractional literals as binary floating point, so
    /// DOUBLE and FLOAT columns follow the decimal policy: a string, a fixed
    /// point decimal, or a double only when approximation was asked for.
    /// Engine DECIMAL columns are always demoted to strings.
    pub fn from_engine_type(column: &ColumnSpec, policy: DecimalPolicy) -> Self {
        match column.base_type() {
            "VARCHAR" => AvroKind::String,
            "BIGINT" | "INTEGER" | "SMALLINT" | "TINYINT" | "UINTEGER" | "USMALLINT"
            | "UTINYINT" => AvroKind::Long,
            "DOUBLE" | "FLOAT" => match policy {
                DecimalPolicy::String => AvroKind::String,
                DecimalPolicy::Fixed { precision, scale } => AvroKind::Decimal { precision, scale },
                DecimalPolicy::Approximate => AvroKind::Double,
            },
            "BOOLEAN" => AvroKind::Boolean,
            "DATE" => AvroKind::Date,
            _ => AvroKind::String,
        }
    }

    fn schema(&self) -> serde_json::Value {
        match self {
            AvroKind::String => json!("string"),
            AvroKind::Long => json!("long"),
            AvroKind::Double => json!("double"),
            AvroKind::Decimal { precision, scale } => json!({
                "type": "bytes",
                "logicalType": "decimal",
                "precision": precision,
                "scale": scale,
            }),
            AvroKind::Boolean => json!("boolean"),
            AvroKind::Date => json!({"type": "int", "logicalType": "date"}),
        }
    }
}

/// One output field: source column, Avro name and type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvroField {
    pub column: String,
    pub name: String,
    pub kind: AvroKind,
}

/// Make a name valid under Avro naming rules
pub fn sanitize_name(name: &str) -> String {
    let mut clean = INVALID_NAME_CHARS.replace_all(name, "_").into_owned();
    if clean.is_empty() || clean.starts_with(|c: char| c.is_ascii_digit()) {
        clean.insert(0, '_');
    }
    clean
}

/// Plan the Avro fields for a set of engine columns
///
/// Names that collide after sanitizing get a numeric suffix.
pub fn plan_fields(columns: &[ColumnSpec], policy: DecimalPolicy) -> Vec<AvroField> {
    let mut used = HashSet::new();
    columns
        .iter()
        .map(|column| {
            let base = sanitize_name(&column.name);
            let mut name = base.clone();
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{base}_{n}");
                n += 1;
            }
            AvroField {
                column: column.name.clone(),
                name,
                kind: AvroKind::from_engine_type(column, policy),
            }
        })
        .collect()
}

/// Build the record schema; every field is nullable
pub fn build_schema(fields: &[AvroField]) -> Result<Schema> {
    let fields: Vec<serde_json::Value> = fields
        .iter()
        .map(|f| json!({"name": f.name, "type": ["null", f.kind.schema()], "default": null}))
        .collect();
    let schema = json!({
        "type": "record",
        "name": RECORD_NAME,
        "fields": fields,
    });
    Ok(Schema::parse(&schema)?)
}

/// Convert one value for an Avro field; `None` means it did not fit
///
/// A decimal that would need rounding for a fixed-point field is a
/// `PrecisionLoss` error, which rejects the whole row.
fn to_avro(value: &Value, kind: AvroKind) -> Result<Option<AvroValue>> {
    let converted = match (kind, value) {
        (_, Value::Null) => Some(AvroValue::Null),
        (AvroKind::String, Value::Text(s)) => Some(AvroValue::String(s.clone())),
        (AvroKind::String, other) => {
            Some(AvroValue::String(encode_scalar(other, TargetFormat::Csv)?))
        }
        (AvroKind::Long, Value::Integer(i)) => Some(AvroValue::Long(*i)),
        (AvroKind::Double, Value::Integer(i)) => Some(AvroValue::Double(*i as f64)),
        (AvroKind::Double, Value::Decimal(d)) => d.to_f64().map(AvroValue::Double),
        (AvroKind::Decimal { precision, scale }, Value::Integer(i)) => {
            Some(fixed_point(&ExactDecimal::from(*i), precision, scale)?)
        }
        (AvroKind::Decimal { precision, scale }, Value::Decimal(d)) => {
            Some(fixed_point(d, precision, scale)?)
        }
        (AvroKind::Boolean, Value::Bool(b)) => Some(AvroValue::Boolean(*b)),
        (AvroKind::Date, Value::Text(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(days_since_epoch)
            .map(AvroValue::Date),
        _ => None,
    };
    Ok(converted)
}

/// Big-endian two's complement unscaled value
fn fixed_point(value: &ExactDecimal, precision: u8, scale: i8) -> Result<AvroValue> {
    let unscaled = value.to_fixed_point(precision, scale)?;
    Ok(AvroValue::Decimal(Decimal::from(unscaled.to_be_bytes().to_vec())))
}

fn days_since_epoch(date: NaiveDate) -> Option<i32> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    i32::try_from((date - epoch).num_days()).ok()
}

fn to_avro_record(
    record: &Record,
    fields: &[AvroField],
    anomalies: &mut usize,
) -> Result<AvroValue> {
    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        let value = record.get(&field.column).unwrap_or(&Value::Null);
        let union = match to_avro(value, field.kind)? {
            Some(AvroValue::Null) => AvroValue::Union(0, Box::new(AvroValue::Null)),
            Some(v) => AvroValue::Union(1, Box::new(v)),
            None => {
                *anomalies += 1;
                debug!(
                    field = %field.column,
                    kind = value.kind(),
                    "Value does not fit Avro field"
                );
                AvroValue::Union(0, Box::new(AvroValue::Null))
            }
        };
        values.push((field.name.clone(), union));
    }
    Ok(AvroValue::Record(values))
}

/// Stream an NDJSON file into an Avro container file
pub fn write_avro(
    columns: &[ColumnSpec],
    input: &Path,
    output: &Path,
    policy: DecimalPolicy,
) -> Result<ColumnarReport> {
    let fields = plan_fields(columns, policy);
    let schema = build_schema(&fields)?;

    let reader = File::open(input).map_err(|e| Error::resource(input, e))?;
    let file = File::create(output).map_err(|e| Error::resource(output, e))?;
    let mut writer = Writer::new(&schema, BufWriter::new(file));
    let mut source = NdjsonSource::new(BufReader::new(reader));
    let mut report = ColumnarReport::default();

    if fields.iter().any(|f| f.kind == AvroKind::Double) {
        info!("Fractional columns are written as approximate binary doubles");
    }

    while let Some(item) = source.next() {
        match item {
            Ok(record) => {
                let mut anomalies = 0;
                match to_avro_record(&record, &fields, &mut anomalies) {
                    Ok(value) => {
                        writer.append(value)?;
                        report.rows_written += 1;
                        report.anomalies += anomalies;
                    }
                    Err(e) if e.is_recoverable() => {
                        error!(error = %e, line = source.line(), "Rejecting row for Avro output");
                        report.rows_failed += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) if e.is_recoverable() => {
                error!("Skipping line for Avro output: {e}");
                report.rows_failed += 1;
            }
            Err(e) => return Err(e),
        }
    }

    let mut out = writer.into_inner()?;
    out.flush()?;
    info!(
        rows = report.rows_written,
        failed = report.rows_failed,
        skipped_lines = source.lines_skipped(),
        "Avro file written"
    );
    Ok(report)
}
