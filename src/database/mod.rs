//! Columnar engine support via DuckDB
//!
//! DuckDB stands in for the external tabular-query engine: it infers column
//! types from NDJSON, writes Parquet, and prunes empty CSV columns. Avro files
//! are written from the inferred column types with `apache-avro`.

mod avro;
mod engine;
mod prune;

pub use avro::{
    build_schema, plan_fields, sanitize_name, write_avro, AvroField, AvroKind, RECORD_NAME,
};
pub use engine::{ColumnSpec, ColumnarEngine, ColumnarFormat, ColumnarReport, DuckDbEngine};
pub use prune::{prune_empty_columns, PruneReport};
