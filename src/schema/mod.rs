//! Tabular schema module
//!
//! Decides which columns a tabular sink writes.
//!
//! # Features
//!
//! - **First-Record Header**: the first record's field names, in order
//! - **Frozen Header**: later records never add columns
//! - **Anomaly Counting**: fields outside the header are dropped and counted
//! - **Flattening**: optional `parent.child` expansion of nested objects

mod flatten;
mod tracker;

pub use flatten::flatten_record;
pub use tracker::SchemaTracker;
