//! CLI runner - executes commands

use super::commands::{Cli, Commands, DecimalMode};
use super::logging::{LogLevel, LogSettings};
use crate::codec::DecimalPolicy;
use crate::config::JobConfig;
use crate::database::{prune_empty_columns, ColumnarEngine, ColumnarFormat, DuckDbEngine};
use crate::engine::{ConversionPipeline, JobStats, SinkConfig, SourceConfig};
use crate::error::{Error, Result};
use crate::output::SinkFormat;
use crate::source::SourceFormat;
use std::path::Path;
use std::time::Instant;
use tracing::{dispatcher, error, info, Dispatch};

/// CLI runner
pub struct Runner {
    cli: Cli,
    config: JobConfig,
    dispatch: Dispatch,
}

impl Runner {
    /// Resolve the job configuration and set up logging
    ///
    /// Settings come from defaults, then the `--config` file, then flags.
    pub fn new(cli: Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => JobConfig::load(path)?,
            None => JobConfig::default(),
        };
        apply_overrides(&mut config, &cli)?;
        config.validate()?;

        let dispatch = log_settings(&config)?.dispatch()?;
        Ok(Self {
            cli,
            config,
            dispatch,
        })
    }

    /// Effective job configuration
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Replace the logging sink
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Run the CLI command
    pub fn run(&self) -> Result<()> {
        dispatcher::with_default(&self.dispatch, || match &self.cli.command {
            Commands::JsonToNdjson { input, output } => self
                .convert(input, SourceFormat::JsonArray, output, SinkFormat::Ndjson)
                .map(|_| ()),
            Commands::NdjsonToJson { input, output } => self
                .convert(input, SourceFormat::Ndjson, output, SinkFormat::JsonArray)
                .map(|_| ()),
            Commands::Flatten { input, output } => self
                .convert(input, SourceFormat::Auto, output, SinkFormat::Csv)
                .map(|_| ()),
            Commands::Convert {
                input,
                output,
                to,
                from,
            } => self.convert(input, *from, output, *to).map(|_| ()),
            Commands::Columnar {
                input,
                output,
                format,
            } => self.columnar(input, output, *format),
            Commands::PruneColumns { input, output } => self.prune(input, output),
        })
    }

    fn convert(
        &self,
        input: &Path,
        from: SourceFormat,
        output: &Path,
        to: SinkFormat,
    ) -> Result<JobStats> {
        let mut pipeline = ConversionPipeline::new(self.config.pipeline_config()?)
            .with_dispatch(self.dispatch.clone());
        pipeline.run(&SourceConfig::new(input, from), &SinkConfig::new(output, to))
    }

    fn columnar(&self, input: &Path, output: &Path, format: ColumnarFormat) -> Result<()> {
        let started = Instant::now();
        let result = DuckDbEngine::open(input).and_then(|engine| {
            engine
                .with_decimal_policy(self.config.decimal_policy)
                .write_columnar(format, output)
        });

        match result {
            Ok(report) => {
                info!(
                    succeeded = report.rows_written,
                    failed = report.rows_failed,
                    anomalies = report.anomalies,
                    duration_ms = elapsed_ms(started),
                    "Conversion complete! Successfully processed {} records",
                    report.rows_written
                );
                Ok(())
            }
            Err(e) => Err(report_failure(e)),
        }
    }

    fn prune(&self, input: &Path, output: &Path) -> Result<()> {
        let started = Instant::now();
        match prune_empty_columns(input, output) {
            Ok(report) => {
                info!(
                    kept = report.kept.len(),
                    removed = report.removed.len(),
                    duration_ms = elapsed_ms(started),
                    "Column pruning complete"
                );
                Ok(())
            }
            Err(e) => Err(report_failure(e)),
        }
    }
}

fn report_failure(error: Error) -> Error {
    error!(
        severity = "critical",
        class = ?error.class(),
        "Conversion failed: {error}"
    );
    error
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Apply command-line flags on top of the loaded configuration
pub(crate) fn apply_overrides(config: &mut JobConfig, cli: &Cli) -> Result<()> {
    if let Some(size) = cli.batch_size {
        config.batch_size = size;
    }
    if let Some(level) = cli.log_level {
        config.log.level = Some(level.name().to_string());
    }
    if let Some(path) = &cli.log_file {
        config.log.file = Some(path.clone());
    }
    if cli.decimals_as_strings {
        config.quote_decimals = true;
    }
    if cli.flatten_objects {
        config.flatten_objects = true;
    }
    if let Some(delimiter) = cli.delimiter {
        config.csv_delimiter = delimiter;
    }
    config.decimal_policy = decimal_policy(config.decimal_policy, cli)?;
    Ok(())
}

fn decimal_policy(current: DecimalPolicy, cli: &Cli) -> Result<DecimalPolicy> {
    let (precision, scale) = match current {
        DecimalPolicy::Fixed { precision, scale } => (Some(precision), Some(scale)),
        _ => (None, None),
    };
    let precision = cli.decimal_precision.or(precision);
    let scale = cli.decimal_scale.or(scale);

    let mode = match cli.decimal_policy {
        Some(mode) => mode,
        None if cli.decimal_precision.is_some() || cli.decimal_scale.is_some() => {
            DecimalMode::Fixed
        }
        None => return Ok(current),
    };

    match mode {
        DecimalMode::String => Ok(DecimalPolicy::String),
        DecimalMode::Approximate => Ok(DecimalPolicy::Approximate),
        DecimalMode::Fixed => match (precision, scale) {
            (Some(precision), Some(scale)) => Ok(DecimalPolicy::Fixed { precision, scale }),
            _ => Err(Error::config(
                "--decimal-policy fixed needs --decimal-precision and --decimal-scale",
            )),
        },
    }
}

fn log_settings(config: &JobConfig) -> Result<LogSettings> {
    let level = match &config.log.level {
        Some(name) => LogLevel::parse(name)?,
        None => LogLevel::default(),
    };
    let settings = LogSettings::new(level);
    Ok(match &config.log.file {
        Some(path) => settings.with_file(path),
        None => settings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("streamconv").chain(args.iter().copied())).unwrap()
    }

    fn resolve(args: &[&str], mut config: JobConfig) -> Result<JobConfig> {
        apply_overrides(&mut config, &parse(args))?;
        config.validate()?;
        Ok(config)
    }

    // ========================================================================
    // Argument Parsing
    // ========================================================================

    #[test]
    fn test_parse_direction_commands() {
        let cli = parse(&["json-to-ndjson", "in.json", "out.ndjson"]);
        match cli.command {
            Commands::JsonToNdjson { input, output } => {
                assert_eq!(input, PathBuf::from("in.json"));
                assert_eq!(output, PathBuf::from("out.ndjson"));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = parse(&["convert", "in", "out", "--to", "json"]);
        match cli.command {
            Commands::Convert { to, from, .. } => {
                assert_eq!(to, SinkFormat::JsonArray);
                assert_eq!(from, SourceFormat::Auto);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = parse(&["columnar", "in", "out.avro", "--format", "avro"]);
        assert!(matches!(
            cli.command,
            Commands::Columnar {
                format: ColumnarFormat::Avro,
                ..
            }
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&[
            "flatten",
            "in",
            "out.csv",
            "--batch-size",
            "50",
            "--log-level",
            "critical",
            "--flatten-objects",
        ]);
        assert_eq!(cli.batch_size, Some(50));
        assert_eq!(cli.log_level, Some(LogLevel::Critical));
        assert!(cli.flatten_objects);
    }

    #[test]
    fn test_rejects_unknown_format() {
        let result = Cli::try_parse_from(["streamconv", "convert", "a", "b", "--to", "xml"]);
        assert!(result.is_err());
    }

    // ========================================================================
    // Override Precedence
    // ========================================================================

    #[test]
    fn test_flags_override_file_settings() {
        let file = JobConfig::from_yaml("batch_size: 10\ncsv_delimiter: \";\"").unwrap();
        let config = resolve(
            &["flatten", "a", "b", "--batch-size", "20", "--decimals-as-strings"],
            file,
        )
        .unwrap();

        assert_eq!(config.batch_size, 20);
        assert_eq!(config.csv_delimiter, ';');
        assert!(config.quote_decimals);
    }

    #[test]
    fn test_zero_batch_size_flag_rejected() {
        let err = resolve(&["flatten", "a", "b", "--batch-size", "0"], JobConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "batch_size"));
    }

    #[test]
    fn test_fixed_policy_from_flags() {
        let config = resolve(
            &[
                "convert",
                "a",
                "b",
                "--to",
                "parquet",
                "--decimal-policy",
                "fixed",
                "--decimal-precision",
                "18",
                "--decimal-scale",
                "2",
            ],
            JobConfig::default(),
        )
        .unwrap();
        assert_eq!(
            config.decimal_policy,
            DecimalPolicy::Fixed {
                precision: 18,
                scale: 2
            }
        );
    }

    #[test]
    fn test_scale_flag_refines_file_policy() {
        let file = JobConfig::from_yaml(
            "decimal_policy:\n  mode: fixed\n  precision: 18\n  scale: 2",
        )
        .unwrap();
        let config = resolve(&["flatten", "a", "b", "--decimal-scale", "4"], file).unwrap();
        assert_eq!(
            config.decimal_policy,
            DecimalPolicy::Fixed {
                precision: 18,
                scale: 4
            }
        );
    }

    #[test]
    fn test_fixed_policy_needs_precision() {
        let err = resolve(
            &["flatten", "a", "b", "--decimal-policy", "fixed"],
            JobConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.class(), crate::error::ErrorClass::Configuration);
    }

    #[test]
    fn test_log_settings_from_flags() {
        let config = resolve(
            &[
                "flatten",
                "a",
                "b",
                "--log-level",
                "warning",
                "--log-file",
                "job.log",
            ],
            JobConfig::default(),
        )
        .unwrap();
        let settings = log_settings(&config).unwrap();
        assert_eq!(settings.level, LogLevel::Warning);
        assert_eq!(settings.file, Some(PathBuf::from("job.log")));
    }

    #[test]
    fn test_unknown_log_level_in_file() {
        let mut config = JobConfig::default();
        config.log.level = Some("verbose".to_string());
        assert!(log_settings(&config).is_err());
    }
}
