//! Execution engine module
//!
//! Main read loop and batch orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `ConversionPipeline` - pulls records, batches them and drives a sink
//! - `PipelineConfig` - configuration for a conversion job
//! - `JobStats` - per-run counters
//!
//! A run moves through `Init -> Streaming -> Flushing -> Done`. It ends in
//! `Failed` when a resource cannot be opened or the source breaks
//! structurally. Per-record decode errors are counted and logged and the run
//! stays in `Streaming`.

mod types;

pub use types::{JobStats, PipelineConfig, PipelineState, SinkConfig, SourceConfig};

use crate::batch::{Batch, BatchAccumulator};
use crate::error::{Error, Result};
use crate::output::RecordSink;
use crate::schema::flatten_record;
use crate::source::RecordSource;
use std::time::Instant;
use tracing::{debug, dispatcher, error, info, warn, Dispatch};

/// Orchestrates one conversion from a record source into a sink
///
/// Log output goes to the [`Dispatch`] held by the pipeline, not to a
/// process-wide logger.
pub struct ConversionPipeline {
    config: PipelineConfig,
    state: PipelineState,
    stats: JobStats,
    dispatch: Dispatch,
}

impl ConversionPipeline {
    /// Create a pipeline logging to the dispatcher current at this call
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: PipelineState::Init,
            stats: JobStats::default(),
            dispatch: dispatcher::get_default(Dispatch::clone),
        }
    }

    /// Set the logging sink
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Statistics of the current or last run
    pub fn stats(&self) -> &JobStats {
        &self.stats
    }

    /// Open both resources and convert in batches of `config().batch_size`
    ///
    /// Nothing is created on disk when the input cannot be opened.
    pub fn run(&mut self, source: &SourceConfig, sink: &SinkConfig) -> Result<JobStats> {
        let dispatch = self.dispatch.clone();
        let batch_size = self.config.batch_size;
        dispatcher::with_default(&dispatch, || {
            self.reset();
            info!(
                input = %source.path().display(),
                output = %sink.path().display(),
                batch_size,
                "Starting conversion"
            );

            let opened = BatchAccumulator::new(batch_size).and_then(|acc| {
                let records = source.open()?;
                let writer = sink.open(&self.config.sink)?;
                Ok((acc, records, writer))
            });

            match opened {
                Ok((acc, mut records, mut writer)) => {
                    self.stream(acc, records.as_mut(), writer.as_mut())
                }
                Err(e) => Err(self.fail(e)),
            }
        })
    }

    /// Convert from an already-open source into an already-open sink
    pub fn convert(
        &mut self,
        source: &mut dyn RecordSource,
        sink: &mut dyn RecordSink,
    ) -> Result<JobStats> {
        let dispatch = self.dispatch.clone();
        let batch_size = self.config.batch_size;
        dispatcher::with_default(&dispatch, || {
            self.reset();
            match BatchAccumulator::new(batch_size) {
                Ok(acc) => self.stream(acc, source, sink),
                Err(e) => Err(self.fail(e)),
            }
        })
    }

    fn reset(&mut self) {
        self.state = PipelineState::Init;
        self.stats = JobStats::new();
    }

    fn stream(
        &mut self,
        acc: BatchAccumulator,
        source: &mut dyn RecordSource,
        sink: &mut dyn RecordSink,
    ) -> Result<JobStats> {
        let started = Instant::now();
        let outcome = self.pump(acc, source, sink);

        self.stats.lines_skipped = source.lines_skipped();
        self.stats
            .set_duration(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));

        match outcome {
            Ok(()) => {
                self.state = PipelineState::Done;
                info!(
                    succeeded = self.stats.records_succeeded,
                    failed = self.stats.records_failed,
                    skipped_lines = self.stats.lines_skipped,
                    anomalies = self.stats.schema_anomalies,
                    duration_ms = self.stats.duration_ms,
                    "Conversion complete! Successfully processed {} records",
                    self.stats.records_succeeded
                );
                Ok(self.stats.clone())
            }
            Err(e) => {
                // records already flushed stay readable
                if let Err(close_err) = sink.finish() {
                    warn!(error = %close_err, "Failed to close output after a fatal error");
                }
                Err(self.fail(e))
            }
        }
    }

    /// Streaming and Flushing; the partial batch is dropped on a fatal error
    fn pump(
        &mut self,
        mut acc: BatchAccumulator,
        source: &mut dyn RecordSource,
        sink: &mut dyn RecordSink,
    ) -> Result<()> {
        self.state = PipelineState::Streaming;
        let flatten = self.config.flatten_objects && sink.format().is_tabular();
        let label = source.format().position_label();

        while let Some(item) = source.next() {
            match item {
                Ok(record) => {
                    let record = if flatten {
                        flatten_record(record, &self.config.flatten_separator)
                    } else {
                        record
                    };
                    acc.push(record);
                    if let Some(batch) = acc.flush_if_full() {
                        self.write(sink, &batch)?;
                    }
                }
                Err(e) if e.is_recoverable() => {
                    self.stats.add_failed(1);
                    log_record_error(&e, label);
                }
                Err(e) => return Err(e),
            }
        }

        self.state = PipelineState::Flushing;
        if let Some(batch) = acc.flush_remainder() {
            debug!(records = batch.len(), "Writing final batch");
            self.write(sink, &batch)?;
        }
        sink.finish()
    }

    fn write(&mut self, sink: &mut dyn RecordSink, batch: &Batch) -> Result<()> {
        let report = sink.write_batch(batch)?;
        sink.flush()?;

        self.stats.add_succeeded(report.rows_written);
        self.stats.add_failed(report.rows_rejected);
        self.stats.add_anomalies(report.anomalies);
        self.stats.add_batch();
        debug!(
            batch = self.stats.batches_written,
            records = report.rows_written,
            rejected = report.rows_rejected,
            "Wrote batch"
        );
        Ok(())
    }

    fn fail(&mut self, error: Error) -> Error {
        self.state = PipelineState::Failed;
        error!(
            severity = "critical",
            class = ?error.class(),
            succeeded = self.stats.records_succeeded,
            failed = self.stats.records_failed,
            "Conversion failed: {error}"
        );
        error
    }
}

fn log_record_error(error: &Error, label: &str) {
    match error {
        Error::Decode {
            line_or_index,
            raw_token,
            message,
        } => {
            error!(
                position = *line_or_index,
                "Error decoding JSON on {label} {line_or_index}: {message}"
            );
            error!("Problematic {label}: {raw_token}");
        }
        other => error!("Skipping record: {other}"),
    }
}
