//! Columnar engine integration tests with an in-memory DuckDB
//!
//! The bundled DuckDB build needs no external service, so these always run.

use apache_avro::types::Value as AvroValue;
use apache_avro::Reader;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pretty_assertions::assert_eq;
use std::fs::File;
use std::path::PathBuf;
use streamconv::database::{
    prune_empty_columns, ColumnarEngine, ColumnarFormat, DuckDbEngine,
};
use streamconv::{DecimalPolicy, ErrorClass};
use tempfile::TempDir;

fn ndjson_input(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("in.ndjson");
    std::fs::write(
        &path,
        concat!(
            r#"{"id": 1, "price": 16000.50, "name": "a"}"#,
            "\n",
            r#"{"id": 2, "price": 0.25, "name": null}"#,
            "\n",
        ),
    )
    .unwrap();
    path
}

// ============================================================================
// Schema Inference
// ============================================================================

#[test]
fn test_duckdb_infer_schema() {
    let dir = TempDir::new().unwrap();
    let engine = DuckDbEngine::open(ndjson_input(&dir)).unwrap();

    let columns = engine.infer_schema().unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "price", "name"]);
    assert_eq!(columns[0].base_type(), "BIGINT");
    assert_eq!(columns[2].base_type(), "VARCHAR");
    assert_eq!(engine.row_count().unwrap(), 2);
}

#[test]
fn test_duckdb_missing_input() {
    let dir = TempDir::new().unwrap();
    let err = DuckDbEngine::open(dir.path().join("missing.ndjson"))
        .err()
        .unwrap();
    assert_eq!(err.class(), ErrorClass::Resource);
}

// ============================================================================
// Columnar Output
// ============================================================================

#[test]
fn test_duckdb_parquet_copy() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.parquet");
    let engine = DuckDbEngine::open(ndjson_input(&dir)).unwrap();

    let report = engine
        .write_columnar(ColumnarFormat::Parquet, &output)
        .unwrap();
    assert_eq!(report.rows_written, 2);

    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&output).unwrap())
        .unwrap()
        .build()
        .unwrap();
    let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
    assert_eq!(rows, 2);
}

#[test]
fn test_duckdb_avro_keeps_decimal_text() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.avro");
    let engine = DuckDbEngine::open(ndjson_input(&dir))
        .unwrap()
        .with_decimal_policy(DecimalPolicy::String);

    let report = engine.write_columnar(ColumnarFormat::Avro, &output).unwrap();
    assert_eq!(report.rows_written, 2);
    assert_eq!(report.rows_failed, 0);

    let reader = Reader::new(File::open(&output).unwrap()).unwrap();
    let prices: Vec<AvroValue> = reader
        .map(|row| match row.unwrap() {
            AvroValue::Record(fields) => fields
                .into_iter()
                .find(|(name, _)| name == "price")
                .map(|(_, v)| v)
                .unwrap(),
            other => panic!("expected a record, got {other:?}"),
        })
        .collect();
    assert_eq!(
        prices,
        vec![
            AvroValue::Union(1, Box::new(AvroValue::String("16000.50".to_string()))),
            AvroValue::Union(1, Box::new(AvroValue::String("0.25".to_string()))),
        ]
    );
}

// ============================================================================
// Column Pruning
// ============================================================================

#[test]
fn test_prune_empty_columns() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.csv");
    std::fs::write(&input, "a,b,c\n1,,x\n2,,y\n").unwrap();

    let report = prune_empty_columns(&input, &output).unwrap();
    assert_eq!(report.kept, vec!["a".to_string(), "c".to_string()]);
    assert_eq!(report.removed, vec!["b".to_string()]);

    let out = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec!["a,c", "1,x", "2,y"]);
}

#[test]
fn test_prune_without_empty_columns_copies() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.csv");
    std::fs::write(&input, "a,b\n1,2\n").unwrap();

    let report = prune_empty_columns(&input, &output).unwrap();
    assert!(report.removed.is_empty());
    assert_eq!(
        std::fs::read_to_string(&output).unwrap().lines().next(),
        Some("a,b")
    );
}
