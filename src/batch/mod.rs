//! Bounded batch accumulation
//!
//! Records are buffered until `batch_size` is reached and then handed out as
//! one [`Batch`]. Whatever is left at end of input is handed out once by
//! [`BatchAccumulator::flush_remainder`], which consumes the accumulator.

use crate::codec::Record;
use crate::error::{Error, Result};

/// Default number of records per batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// An ordered, non-empty group of records consumed by one sink write
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch {
    records: Vec<Record>,
}

impl Batch {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Buffers records into batches of a fixed size
#[derive(Debug)]
pub struct BatchAccumulator {
    batch_size: usize,
    pending: Vec<Record>,
}

impl BatchAccumulator {
    /// Create an accumulator; a zero batch size is a configuration error
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::invalid_value(
                "batch_size",
                "must be a positive integer",
            ));
        }
        Ok(Self {
            batch_size,
            pending: Vec::with_capacity(batch_size.min(DEFAULT_BATCH_SIZE)),
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Records buffered but not yet handed out
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn push(&mut self, record: Record) {
        self.pending.push(record);
    }

    /// Hand out a batch once exactly `batch_size` records are buffered
    pub fn flush_if_full(&mut self) -> Option<Batch> {
        if self.pending.len() < self.batch_size {
            return None;
        }
        let capacity = self.batch_size.min(DEFAULT_BATCH_SIZE);
        let records = std::mem::replace(&mut self.pending, Vec::with_capacity(capacity));
        Some(Batch::new(records))
    }

    /// Hand out the final partial batch, if any
    pub fn flush_remainder(self) -> Option<Batch> {
        (!self.pending.is_empty()).then(|| Batch::new(self.pending))
    }
}
