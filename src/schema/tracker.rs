//! Output column discovery

use crate::codec::{Record, Value};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Tracks the tabular header for one job
///
/// The first observed record fixes the header: its field names, in order.
/// The header is never widened afterwards. Later records that lack a column
/// produce an empty cell; fields outside the header are dropped from that
/// row and counted as schema anomalies.
///
/// Each distinct dropped field name is logged at warning the first time it
/// appears and at debug after that, so a wide stream of drifting records
/// does not flood the log. Every occurrence is counted.
#[derive(Debug, Default)]
pub struct SchemaTracker {
    header: Vec<String>,
    index: HashMap<String, usize>,
    frozen: bool,
    anomalies: usize,
    reported: HashSet<String>,
}

impl SchemaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a record, freezing the header on the first call
    ///
    /// Returns the names of fields that fall outside the header.
    pub fn observe(&mut self, record: &Record) -> Vec<String> {
        if !self.frozen {
            for name in record.keys() {
                self.index.insert(name.to_string(), self.header.len());
                self.header.push(name.to_string());
            }
            self.frozen = true;
            debug!(columns = self.header.len(), "Header fixed from first record");
            return Vec::new();
        }

        let extras: Vec<String> = record
            .keys()
            .filter(|name| !self.index.contains_key(*name))
            .map(str::to_string)
            .collect();

        for field in &extras {
            self.anomalies += 1;
            if self.reported.insert(field.clone()) {
                warn!(field = %field, "Field is not in the header; dropping it from the row");
            } else {
                debug!(field = %field, "Dropping field outside the header");
            }
        }
        extras
    }

    /// The frozen header, empty until the first record is observed
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Dropped-field occurrences so far
    pub fn anomalies(&self) -> usize {
        self.anomalies
    }

    /// Lay a record out in header order; missing columns are `None`
    pub fn project<'r>(&self, record: &'r Record) -> Vec<Option<&'r Value>> {
        let mut row = vec![None; self.header.len()];
        for (name, value) in record.iter() {
            if let Some(&pos) = self.index.get(name) {
                row[pos] = Some(value);
            }
        }
        row
    }
}
