//! Engine types
//!
//! Job configuration, resource descriptions and run statistics.

use crate::batch::DEFAULT_BATCH_SIZE;
use crate::codec::DecimalPolicy;
use crate::error::{Error, Result};
use crate::output::{open_sink, RecordSink, SinkFormat, SinkOptions};
use crate::source::{open_source, RecordSource, SourceFormat};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Read buffer size for input files
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Lifecycle of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Init,
    /// Pulling records and writing full batches
    Streaming,
    /// Writing the final partial batch and closing the sink
    Flushing,
    Done,
    /// Ended by an unopenable resource or a fatal error
    Failed,
}

/// Configuration for a conversion job
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Records per batch
    pub batch_size: usize,
    /// Expand nested objects into `parent.child` columns for tabular sinks
    pub flatten_objects: bool,
    pub flatten_separator: String,
    /// Options handed to the sink
    pub sink: SinkOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flatten_objects: false,
            flatten_separator: ".".to_string(),
            sink: SinkOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set batch size
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Enable nested object flattening
    #[must_use]
    pub fn with_flatten_objects(mut self, enabled: bool) -> Self {
        self.flatten_objects = enabled;
        self
    }

    #[must_use]
    pub fn with_flatten_separator(mut self, separator: impl Into<String>) -> Self {
        self.flatten_separator = separator.into();
        self
    }

    /// Set the decimal policy for columnar output
    #[must_use]
    pub fn with_decimal_policy(mut self, policy: DecimalPolicy) -> Self {
        self.sink.decimal_policy = policy;
        self
    }

    /// Set sink options
    #[must_use]
    pub fn with_sink_options(mut self, options: SinkOptions) -> Self {
        self.sink = options;
        self
    }

    /// Check values that would make a job fail before it starts
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::invalid_value(
                "batch_size",
                "must be a positive integer",
            ));
        }
        if self.flatten_separator.is_empty() {
            return Err(Error::invalid_value(
                "flatten_separator",
                "must not be empty",
            ));
        }
        self.sink.decimal_policy.validate()
    }
}

/// Where records come from
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub format: SourceFormat,
}

impl SourceConfig {
    pub fn new(path: impl Into<PathBuf>, format: SourceFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Open the input file as a record source
    pub fn open(&self) -> Result<Box<dyn RecordSource>> {
        let file = File::open(&self.path).map_err(|e| Error::resource(&self.path, e))?;
        let reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
        open_source(reader, self.format).map_err(|e| Error::resource(&self.path, e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Where records go
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub path: PathBuf,
    pub format: SinkFormat,
}

impl SinkConfig {
    pub fn new(path: impl Into<PathBuf>, format: SinkFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Create the output file and wrap it in a sink
    pub fn open(&self, options: &SinkOptions) -> Result<Box<dyn RecordSink>> {
        let file = File::create(&self.path).map_err(|e| Error::resource(&self.path, e))?;
        Ok(open_sink(BufWriter::new(file), self.format, options))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Statistics from one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStats {
    /// Records written to the sink
    pub records_succeeded: usize,
    /// Records skipped by decode errors or rejected by the sink
    pub records_failed: usize,
    /// Blank input lines skipped
    pub lines_skipped: usize,
    /// Fields dropped or values nulled to fit the output schema
    pub schema_anomalies: usize,
    pub batches_written: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl JobStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_succeeded(&mut self, count: usize) {
        self.records_succeeded += count;
    }

    pub fn add_failed(&mut self, count: usize) {
        self.records_failed += count;
    }

    pub fn add_anomalies(&mut self, count: usize) {
        self.schema_anomalies += count;
    }

    pub fn add_batch(&mut self) {
        self.batches_written += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
