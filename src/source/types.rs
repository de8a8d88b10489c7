//! Record source types and traits

use crate::codec::Record;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Layout of the input document
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Detect from the first non-whitespace byte (default)
    #[default]
    Auto,
    /// One JSON object per line
    Ndjson,
    /// A single top-level JSON array of objects
    #[value(name = "json")]
    #[serde(rename = "json")]
    JsonArray,
}

impl SourceFormat {
    /// What a record position means for this layout, used in log messages
    pub fn position_label(&self) -> &'static str {
        match self {
            SourceFormat::JsonArray => "element",
            _ => "line",
        }
    }
}

/// Lazy, finite, non-restartable producer of records
///
/// `Err` items with a recoverable [`crate::error::ErrorClass`] stand for a
/// single unusable record and the source keeps going. Any other error ends
/// the source: the following call returns `None`.
pub trait RecordSource: Iterator<Item = Result<Record>> {
    /// The concrete layout being read
    fn format(&self) -> SourceFormat;

    /// Blank lines skipped so far
    fn lines_skipped(&self) -> usize {
        0
    }
}
