//! Logging setup for the command line
//!
//! The console shows `LEVEL: message` lines on stdout. An optional log file
//! receives everything at debug level with timestamps. The layers are built
//! into a [`Dispatch`] that the runner scopes over a job; nothing is
//! installed as the global default.

use crate::error::{Error, Result};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// Console verbosity accepted by `--log-level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    /// Same events as `error`; fatal failures carry `severity="critical"`
    Critical,
}

impl LogLevel {
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        }
    }

    pub fn filter(&self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }

    /// Parse a level name from a config file, ignoring case
    pub fn parse(name: &str) -> Result<Self> {
        <Self as clap::ValueEnum>::from_str(name, true).map_err(|_| {
            Error::invalid_value(
                "log.level",
                format!("unknown level '{name}', expected debug, info, warning, error or critical"),
            )
        })
    }
}

/// Formats console events as `LEVEL: message field=value`
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelPrefix;

impl<S, N> FormatEvent<S, N> for LevelPrefix
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = match *event.metadata().level() {
            Level::WARN => "WARNING",
            other => other.as_str(),
        };
        write!(writer, "{level}: ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Where log output goes for one job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LogLevel,
    pub file: Option<PathBuf>,
}

impl LogSettings {
    pub fn new(level: LogLevel) -> Self {
        Self { level, file: None }
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Build the dispatch with the console on stdout
    pub fn dispatch(&self) -> Result<Dispatch> {
        self.dispatch_to(std::io::stdout)
    }

    /// Build the dispatch with the console going to `console`
    ///
    /// `RUST_LOG` replaces the console level when it is set.
    pub fn dispatch_to<W>(&self, console: W) -> Result<Dispatch>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let console_filter = EnvFilter::builder()
            .with_default_directive(self.level.filter().into())
            .from_env_lossy();

        let console_layer = tracing_subscriber::fmt::layer()
            .event_format(LevelPrefix)
            .with_ansi(false)
            .with_writer(console)
            .with_filter(console_filter);

        let file_layer = match &self.file {
            Some(path) => Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(open_log_file(path)?))
                    .with_filter(LevelFilter::DEBUG),
            ),
            None => None,
        };

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer);
        Ok(Dispatch::new(subscriber))
    }
}

/// Open a log file for appending and mark the start of a new run
fn open_log_file(path: &Path) -> Result<File> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::resource(path, e))?;
    writeln!(file, "\n{}", "=".repeat(100)).map_err(|e| Error::resource(path, e))?;
    Ok(file)
}
