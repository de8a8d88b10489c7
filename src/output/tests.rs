//! Output module tests

use super::*;
use crate::batch::Batch;
use crate::codec::{decode_record, DecimalPolicy, Record};
use arrow::array::{Array, BooleanArray, Decimal128Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pretty_assertions::assert_eq;
use std::fs::File;
use tempfile::TempDir;

fn rec(json: &str) -> Record {
    decode_record(json.as_bytes(), 1).unwrap()
}

fn batch(lines: &[&str]) -> Batch {
    Batch::new(lines.iter().map(|l| rec(l)).collect())
}

fn read_parquet(path: &std::path::Path) -> arrow::record_batch::RecordBatch {
    let file = File::open(path).unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap();
    let batches: Vec<_> = reader.map(|b| b.unwrap()).collect();
    arrow::compute::concat_batches(&batches[0].schema(), &batches).unwrap()
}

// ============================================================================
// NDJSON Sink
// ============================================================================

#[test]
fn test_ndjson_sink_compact_lines() {
    let mut sink = NdjsonSink::new(Vec::new(), false);
    sink.write_batch(&batch(&[r#"{"a": 1, "price": 16000.50}"#, r#"{"a": 2}"#]))
        .unwrap();
    sink.finish().unwrap();

    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(out, "{\"a\":1,\"price\":16000.50}\n{\"a\":2}\n");
}

#[test]
fn test_ndjson_sink_quoted_decimals() {
    let mut sink = NdjsonSink::new(Vec::new(), true);
    sink.write_batch(&batch(&[r#"{"price": 16000.50}"#])).unwrap();

    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(out, "{\"price\":\"16000.50\"}\n");
}

// ============================================================================
// JSON Array Sink
// ============================================================================

#[test]
fn test_json_array_sink_layout_across_batches() {
    let mut sink = JsonArraySink::new(Vec::new(), false, 4);
    sink.write_batch(&batch(&[r#"{"id": 1}"#, r#"{"id": 2}"#]))
        .unwrap();
    sink.write_batch(&batch(&[r#"{"id": 3}"#])).unwrap();
    sink.finish().unwrap();

    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(
        out,
        "[\n    {\"id\":1},\n    {\"id\":2},\n    {\"id\":3}\n]"
    );

    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 3);
}

#[test]
fn test_json_array_sink_empty() {
    let mut sink = JsonArraySink::new(Vec::new(), false, 4);
    sink.finish().unwrap();
    sink.finish().unwrap();

    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(out, "[\n\n]");
}

// ============================================================================
// CSV Sink
// ============================================================================

#[test]
fn test_csv_sink_header_freeze() {
    let mut sink = CsvSink::new(Vec::new(), b',');
    let report = sink
        .write_batch(&batch(&[r#"{"a": 1, "b": 2}"#, r#"{"a": 3, "c": 4}"#]))
        .unwrap();
    sink.finish().unwrap();

    assert_eq!(report.rows_written, 2);
    assert_eq!(report.anomalies, 1);
    assert_eq!(sink.header(), &["a".to_string(), "b".to_string()]);

    let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    assert_eq!(out, "a,b\n1,2\n3,\n");
}

#[test]
fn test_csv_sink_quoting_and_values() {
    let mut sink = CsvSink::new(Vec::new(), b',');
    sink.write_batch(&batch(&[
        r#"{"name": "Smith, J", "amount": 16000.50, "ok": true, "tags": ["x", 1], "note": null}"#,
    ]))
    .unwrap();
    sink.finish().unwrap();

    let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    assert_eq!(
        out,
        "name,amount,ok,tags,note\n\"Smith, J\",16000.50,true,\"[\"\"x\"\",1]\",\n"
    );
}

#[test]
fn test_csv_sink_custom_delimiter() {
    let mut sink = CsvSink::new(Vec::new(), b';');
    sink.write_batch(&batch(&[r#"{"a": "x;y", "b": 1}"#])).unwrap();
    sink.finish().unwrap();

    let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    assert_eq!(out, "a;b\n\"x;y\";1\n");
}

#[test]
fn test_csv_sink_empty_input() {
    let mut sink = CsvSink::new(Vec::new(), b',');
    sink.finish().unwrap();
    assert!(sink.into_inner().unwrap().is_empty());
}

#[test]
fn test_csv_sink_empty_first_record_rejects_rows() {
    let mut sink = CsvSink::new(Vec::new(), b',');
    let report = sink
        .write_batch(&batch(&["{}", r#"{"a": 1}"#, r#"{"a": 2}"#]))
        .unwrap();
    sink.finish().unwrap();

    assert_eq!(report.rows_written, 0);
    assert_eq!(report.rows_rejected, 3);
    assert_eq!(report.anomalies, 2);
    assert!(sink.header().is_empty());
    assert!(sink.into_inner().unwrap().is_empty());
}

// ============================================================================
// Parquet Sink
// ============================================================================

#[test]
fn test_parquet_sink_string_decimals() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.parquet");

    let mut sink = ParquetSink::new(
        File::create(&path).unwrap(),
        DecimalPolicy::String,
        ParquetWriterConfig::new(),
    );
    let report = sink
        .write_batch(&batch(&[
            r#"{"id": 1, "price": 16000.50, "ok": true, "name": "a"}"#,
            r#"{"id": 2, "price": 3, "ok": false, "name": null}"#,
        ]))
        .unwrap();
    sink.finish().unwrap();

    assert_eq!(report.rows_written, 2);
    assert_eq!(report.anomalies, 0);

    let data = read_parquet(&path);
    assert_eq!(data.num_rows(), 2);
    assert_eq!(data.schema().field(1).data_type(), &DataType::Utf8);

    let ids = data.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
    assert_eq!(ids.value(1), 2);

    let prices = data.column(1).as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(prices.value(0), "16000.50");
    assert_eq!(prices.value(1), "3");

    let ok = data.column(2).as_any().downcast_ref::<BooleanArray>().unwrap();
    assert!(ok.value(0));

    let names = data.column(3).as_any().downcast_ref::<StringArray>().unwrap();
    assert!(names.is_null(1));
}

#[test]
fn test_parquet_sink_fixed_decimals_reject_rounding() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixed.parquet");

    let mut sink = ParquetSink::new(
        File::create(&path).unwrap(),
        DecimalPolicy::Fixed {
            precision: 10,
            scale: 2,
        },
        ParquetWriterConfig::new(),
    );
    let report = sink
        .write_batch(&batch(&[
            r#"{"price": 16000.50}"#,
            r#"{"price": 1.234}"#,
            r#"{"price": 7}"#,
        ]))
        .unwrap();
    sink.finish().unwrap();

    assert_eq!(report.rows_written, 2);
    assert_eq!(report.rows_rejected, 1);

    let data = read_parquet(&path);
    assert_eq!(data.schema().field(0).data_type(), &DataType::Decimal128(10, 2));
    let prices = data
        .column(0)
        .as_any()
        .downcast_ref::<Decimal128Array>()
        .unwrap();
    assert_eq!(prices.value(0), 1_600_050);
    assert_eq!(prices.value(1), 700);
}

#[test]
fn test_parquet_sink_approximate_decimals() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("approx.parquet");

    let mut sink = ParquetSink::new(
        File::create(&path).unwrap(),
        DecimalPolicy::Approximate,
        ParquetWriterConfig::new().with_compression_name("zstd").unwrap(),
    );
    sink.write_batch(&batch(&[r#"{"x": 0.5}"#])).unwrap();
    sink.finish().unwrap();

    let data = read_parquet(&path);
    let xs = data.column(0).as_any().downcast_ref::<Float64Array>().unwrap();
    assert_eq!(xs.value(0), 0.5);
}

#[test]
fn test_parquet_sink_frozen_types_and_columns() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("frozen.parquet");

    let mut sink = ParquetSink::new(
        File::create(&path).unwrap(),
        DecimalPolicy::String,
        ParquetWriterConfig::new(),
    );
    sink.write_batch(&batch(&[r#"{"n": 1, "s": "a"}"#])).unwrap();
    let report = sink
        .write_batch(&batch(&[r#"{"n": "two", "s": "b", "extra": 1}"#]))
        .unwrap();
    sink.finish().unwrap();

    // one dropped field, one value that does not fit Int64
    assert_eq!(report.anomalies, 2);
    assert_eq!(report.rows_written, 1);

    let data = read_parquet(&path);
    assert_eq!(data.num_columns(), 2);
    assert_eq!(data.num_rows(), 2);
    assert!(data.column(0).is_null(1));
}

#[test]
fn test_parquet_sink_empty_first_record() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.parquet");

    let mut sink = ParquetSink::new(
        File::create(&path).unwrap(),
        DecimalPolicy::String,
        ParquetWriterConfig::new(),
    );
    let first = sink.write_batch(&batch(&["{}", r#"{"a": 1}"#])).unwrap();
    let second = sink.write_batch(&batch(&[r#"{"a": 2}"#])).unwrap();
    sink.flush().unwrap();
    sink.finish().unwrap();

    assert_eq!(first.rows_written, 0);
    assert_eq!(first.rows_rejected, 2);
    assert_eq!(first.anomalies, 1);
    assert_eq!(second.rows_rejected, 1);
    assert!(sink.schema().is_none());
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
}

#[test]
fn test_parquet_compression_name_rejects_unknown() {
    assert!(ParquetWriterConfig::new()
        .with_compression_name("lz77")
        .is_err());
}

// ============================================================================
// Sink Factory
// ============================================================================

#[test]
fn test_open_sink_formats() {
    let options = SinkOptions::default();
    for format in [
        SinkFormat::Ndjson,
        SinkFormat::JsonArray,
        SinkFormat::Csv,
        SinkFormat::Parquet,
    ] {
        let sink = open_sink(Vec::new(), format, &options);
        assert_eq!(sink.format(), format);
    }
    assert!(SinkFormat::Csv.is_tabular());
    assert!(!SinkFormat::JsonArray.is_tabular());
}
