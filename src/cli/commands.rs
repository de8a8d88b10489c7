//! CLI commands and argument parsing

use super::logging::LogLevel;
use crate::database::ColumnarFormat;
use crate::output::SinkFormat;
use crate::source::SourceFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Streaming, precision-preserving conversion between NDJSON, JSON arrays,
/// CSV and columnar formats
#[derive(Parser, Debug)]
#[command(name = "streamconv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Job configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Records per batch
    #[arg(short, long, global = true)]
    pub batch_size: Option<usize>,

    /// Console log level
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Also append full debug logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// How decimals are stored in binary columnar output
    #[arg(long, global = true, value_enum)]
    pub decimal_policy: Option<DecimalMode>,

    /// Total digits for `--decimal-policy fixed`
    #[arg(long, global = true)]
    pub decimal_precision: Option<u8>,

    /// Digits after the point for `--decimal-policy fixed`
    #[arg(long, global = true)]
    pub decimal_scale: Option<i8>,

    /// Write decimals into JSON as strings instead of number literals
    #[arg(long, global = true)]
    pub decimals_as_strings: bool,

    /// Expand nested objects into `parent.child` columns for CSV and Parquet
    #[arg(long, global = true)]
    pub flatten_objects: bool,

    /// CSV field delimiter
    #[arg(long, global = true)]
    pub delimiter: Option<char>,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a JSON array into NDJSON
    JsonToNdjson {
        input: PathBuf,
        output: PathBuf,
    },

    /// Convert NDJSON into a JSON array
    NdjsonToJson {
        input: PathBuf,
        output: PathBuf,
    },

    /// Flatten JSON records into CSV (input format is detected)
    Flatten {
        input: PathBuf,
        output: PathBuf,
    },

    /// Convert records into any supported text or Parquet format
    Convert {
        input: PathBuf,
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum)]
        to: SinkFormat,

        /// Input format
        #[arg(long, value_enum, default_value = "auto")]
        from: SourceFormat,
    },

    /// Transcode NDJSON to Parquet or Avro through the columnar engine
    Columnar {
        input: PathBuf,
        output: PathBuf,

        #[arg(long, value_enum, default_value = "parquet")]
        format: ColumnarFormat,
    },

    /// Copy a CSV file without its completely empty columns
    PruneColumns {
        input: PathBuf,
        output: PathBuf,
    },
}

/// Decimal policy names on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DecimalMode {
    /// Keep the exact text in a string column
    String,
    /// Fixed-point with `--decimal-precision` and `--decimal-scale`
    Fixed,
    /// Binary floating point (may lose digits)
    Approximate,
}
