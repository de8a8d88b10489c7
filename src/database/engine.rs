//! DuckDB-backed columnar engine
//!
//! DuckDB reads the NDJSON input with `read_json_auto`, reports the column
//! types it inferred, and writes Parquet directly with `COPY`. Avro output is
//! written from those column types by [`super::avro`].

use super::avro::write_avro;
use crate::codec::DecimalPolicy;
use crate::error::{Error, Result};
use duckdb::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Binary columnar output formats handled by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColumnarFormat {
    Parquet,
    Avro,
}

/// One column as the engine sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    /// Engine type name, e.g. `VARCHAR`, `BIGINT`, `DECIMAL(18,3)`
    pub engine_type: String,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, engine_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            engine_type: engine_type.into(),
        }
    }

    /// Type name without parameters (`DECIMAL(18,3)` -> `DECIMAL`)
    pub fn base_type(&self) -> &str {
        self.engine_type
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
    }
}

/// Outcome of a columnar write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnarReport {
    pub rows_written: usize,
    /// Input lines that could not be decoded
    pub rows_failed: usize,
    /// Values that did not fit their column and were written as null
    pub anomalies: usize,
}

/// External tabular engine that transcodes a well-formed NDJSON input
pub trait ColumnarEngine {
    /// Column names and engine types, in input order
    fn infer_schema(&self) -> Result<Vec<ColumnSpec>>;

    /// Write the whole input to `path` in `format`
    fn write_columnar(&self, format: ColumnarFormat, path: &Path) -> Result<ColumnarReport>;
}

/// Columnar engine using an in-memory DuckDB connection
pub struct DuckDbEngine {
    /// DuckDB connection
    conn: Connection,
    /// NDJSON input file
    input: PathBuf,
    decimal_policy: DecimalPolicy,
}

impl DuckDbEngine {
    /// Open an engine over an NDJSON file
    pub fn open(input: impl AsRef<Path>) -> Result<Self> {
        let input = input.as_ref().to_path_buf();
        if !input.is_file() {
            return Err(Error::resource(&input, "file not found"));
        }

        let conn = Connection::open_in_memory()?;
        debug!(input = %input.display(), "Opened in-memory DuckDB connection");

        Ok(Self {
            conn,
            input,
            decimal_policy: DecimalPolicy::default(),
        })
    }

    /// Set the decimal policy applied to Avro columns
    #[must_use]
    pub fn with_decimal_policy(mut self, policy: DecimalPolicy) -> Self {
        self.decimal_policy = policy;
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    /// `read_json_auto(...)` over the input file
    fn source_sql(&self) -> String {
        format!("read_json_auto({})", sql_string(&self.input.to_string_lossy()))
    }

    /// Number of rows the engine reads from the input
    pub fn row_count(&self) -> Result<usize> {
        let sql = format!("SELECT count(*) FROM {}", self.source_sql());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn write_parquet(&self, path: &Path) -> Result<ColumnarReport> {
        let columns = self.infer_schema()?;
        if columns
            .iter()
            .any(|c| matches!(c.base_type(), "DOUBLE" | "FLOAT"))
        {
            warn!("The engine reads fractional numbers as DOUBLE; use the native Parquet sink to keep exact decimals");
        }

        let copy_sql = format!(
            "COPY (SELECT * FROM {}) TO {} (FORMAT PARQUET, COMPRESSION 'SNAPPY');",
            self.source_sql(),
            sql_string(&path.to_string_lossy())
        );
        debug!("Executing: {}", copy_sql);
        self.conn.execute_batch(&copy_sql)?;

        Ok(ColumnarReport {
            rows_written: self.row_count()?,
            ..ColumnarReport::default()
        })
    }
}

impl ColumnarEngine for DuckDbEngine {
    fn infer_schema(&self) -> Result<Vec<ColumnSpec>> {
        let sql = format!("DESCRIBE SELECT * FROM {}", self.source_sql());
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnSpec {
                    name: row.get(0)?,
                    engine_type: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(columns = columns.len(), "Inferred engine schema");
        Ok(columns)
    }

    fn write_columnar(&self, format: ColumnarFormat, path: &Path) -> Result<ColumnarReport> {
        info!(
            input = %self.input.display(),
            output = %path.display(),
            format = ?format,
            "Writing columnar output"
        );
        match format {
            ColumnarFormat::Parquet => self.write_parquet(path),
            ColumnarFormat::Avro => {
                let columns = self.infer_schema()?;
                write_avro(&columns, &self.input, path, self.decimal_policy)
            }
        }
    }
}

/// Quote a string literal for SQL
pub(crate) fn sql_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote an identifier for SQL
pub(crate) fn sql_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
