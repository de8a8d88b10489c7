//! Job configuration file
//!
//! Every setting has a default, may be given in a YAML file, and may be
//! overridden on the command line. Precedence: defaults < YAML < flags.
//!
//! ```yaml
//! batch_size: 5000
//! decimal_policy:
//!   mode: fixed
//!   precision: 18
//!   scale: 2
//! flatten_objects: true
//! parquet:
//!   compression: zstd
//! log:
//!   level: debug
//!   file: convert.log
//! ```

use crate::batch::DEFAULT_BATCH_SIZE;
use crate::codec::DecimalPolicy;
use crate::engine::PipelineConfig;
use crate::error::{Error, Result};
use crate::output::{ParquetWriterConfig, SinkOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// Top-Level Job Config
// ============================================================================

/// Settings for a conversion job loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Records per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Decimal storage in binary columnar output
    #[serde(default)]
    pub decimal_policy: DecimalPolicy,

    /// Write decimals into JSON as strings
    #[serde(default)]
    pub quote_decimals: bool,

    /// Expand nested objects into columns for tabular output
    #[serde(default)]
    pub flatten_objects: bool,

    #[serde(default = "default_flatten_separator")]
    pub flatten_separator: String,

    #[serde(default = "default_csv_delimiter")]
    pub csv_delimiter: char,

    /// Spaces before each object in JSON array output
    #[serde(default = "default_json_indent")]
    pub json_indent: usize,

    #[serde(default)]
    pub parquet: ParquetSection,

    #[serde(default)]
    pub log: LogSection,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_flatten_separator() -> String {
    ".".to_string()
}

fn default_csv_delimiter() -> char {
    ','
}

fn default_json_indent() -> usize {
    4
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            decimal_policy: DecimalPolicy::default(),
            quote_decimals: false,
            flatten_objects: false,
            flatten_separator: default_flatten_separator(),
            csv_delimiter: default_csv_delimiter(),
            json_indent: default_json_indent(),
            parquet: ParquetSection::default(),
            log: LogSection::default(),
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Native Parquet writer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParquetSection {
    /// `snappy`, `zstd`, `gzip` or `none`
    #[serde(default = "default_compression")]
    pub compression: String,

    #[serde(default = "default_row_group_size")]
    pub row_group_size: usize,
}

fn default_compression() -> String {
    "snappy".to_string()
}

fn default_row_group_size() -> usize {
    1024 * 1024
}

impl Default for ParquetSection {
    fn default() -> Self {
        Self {
            compression: default_compression(),
            row_group_size: default_row_group_size(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSection {
    /// Console level: debug, info, warning, error or critical
    #[serde(default)]
    pub level: Option<String>,

    /// Append-mode log file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// ============================================================================
// Loading and Validation
// ============================================================================

impl JobConfig {
    /// Parse and validate YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config = Self::parse(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML text without validating it
    ///
    /// Used when later settings may still replace invalid values.
    pub fn parse(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a YAML file; call [`JobConfig::validate`] once overrides are applied
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::resource(path, e))?;
        Self::parse(&text)
    }

    /// Check every value that would make a job fail before it starts
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::invalid_value(
                "batch_size",
                "must be a positive integer",
            ));
        }
        if !self.csv_delimiter.is_ascii() {
            return Err(Error::invalid_value(
                "csv_delimiter",
                format!("must be a single ASCII character, got '{}'", self.csv_delimiter),
            ));
        }
        if self.parquet.row_group_size == 0 {
            return Err(Error::invalid_value(
                "parquet.row_group_size",
                "must be a positive integer",
            ));
        }
        self.pipeline_config()?.validate()
    }

    fn parquet_config(&self) -> Result<ParquetWriterConfig> {
        ParquetWriterConfig::new()
            .with_row_group_size(self.parquet.row_group_size)
            .with_compression_name(&self.parquet.compression)
    }

    /// Sink options described by this config
    pub fn sink_options(&self) -> Result<SinkOptions> {
        Ok(SinkOptions::new()
            .with_quote_decimals(self.quote_decimals)
            .with_json_indent(self.json_indent)
            .with_csv_delimiter(self.csv_delimiter as u8)
            .with_decimal_policy(self.decimal_policy)
            .with_parquet(self.parquet_config()?))
    }

    /// Pipeline configuration described by this config
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        Ok(PipelineConfig::new()
            .with_batch_size(self.batch_size)
            .with_flatten_objects(self.flatten_objects)
            .with_flatten_separator(self.flatten_separator.clone())
            .with_sink_options(self.sink_options()?))
    }
}
