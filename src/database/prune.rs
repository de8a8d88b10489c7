//! Empty-column pruning for CSV files

use super::engine::{sql_ident, sql_string};
use crate::error::{Error, Result};
use duckdb::Connection;
use std::path::Path;
use tracing::{debug, info};

/// Columns kept and removed by [`prune_empty_columns`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub kept: Vec<String>,
    pub removed: Vec<String>,
}

/// Copy a CSV file without the columns that hold no values at all
///
/// A column is empty when its non-null count is zero. The output is written
/// even when nothing is removed.
pub fn prune_empty_columns(input: &Path, output: &Path) -> Result<PruneReport> {
    if !input.is_file() {
        return Err(Error::resource(input, "file not found"));
    }

    let conn = Connection::open_in_memory()?;
    let source = format!("read_csv_auto({})", sql_string(&input.to_string_lossy()));

    let mut stmt = conn.prepare(&format!("DESCRIBE SELECT * FROM {source}"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if columns.is_empty() {
        return Err(Error::Other(format!(
            "'{}' has no columns",
            input.display()
        )));
    }

    let counts_sql = format!(
        "SELECT {} FROM {source}",
        columns
            .iter()
            .map(|c| format!("count({})", sql_ident(c)))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let counts: Vec<i64> = conn.query_row(&counts_sql, [], |row| {
        (0..columns.len()).map(|i| row.get(i)).collect()
    })?;

    let mut report = PruneReport::default();
    for (column, count) in columns.into_iter().zip(counts) {
        debug!(column = %column, non_null = count, "Column value count");
        if count == 0 {
            report.removed.push(column);
        } else {
            report.kept.push(column);
        }
    }

    if report.kept.is_empty() {
        return Err(Error::Other(format!(
            "every column in '{}' is empty",
            input.display()
        )));
    }

    if report.removed.is_empty() {
        info!("No completely empty columns found; copying file unchanged");
    } else {
        info!(removed = ?report.removed, "Removing completely empty columns");
    }

    let select = report
        .kept
        .iter()
        .map(|c| sql_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    conn.execute_batch(&format!(
        "COPY (SELECT {select} FROM {source}) TO {} (HEADER, DELIMITER ',');",
        sql_string(&output.to_string_lossy())
    ))?;

    info!(kept = ?report.kept, output = %output.display(), "Cleaned CSV written");
    Ok(report)
}
