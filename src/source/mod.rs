//! Record sources
//!
//! Supports: NDJSON, JSON array
//!
//! # Overview
//!
//! A [`RecordSource`] turns an input stream into records one at a time.
//! [`NdjsonSource`] isolates failures per line; [`JsonArraySource`] treats
//! the whole array as one document, so a structural break ends it.
//! [`open_source`] picks the variant, detecting the layout from the first
//! non-whitespace byte when asked to.

mod array;
mod ndjson;
mod types;

pub use array::JsonArraySource;
pub use ndjson::NdjsonSource;
pub use types::{RecordSource, SourceFormat};

use crate::error::Result;
use std::io::BufRead;
use tracing::debug;

pub(crate) const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// What format detection found at the head of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sniffed {
    /// Detected layout (never `Auto`)
    pub format: SourceFormat,
    /// Newlines consumed while skipping leading whitespace
    pub blank_lines: usize,
}

/// Detect the input layout without consuming anything past leading whitespace
///
/// A first non-whitespace byte of `[` means a JSON array; anything else
/// (including empty input) is read as NDJSON.
pub fn sniff_format<R: BufRead>(reader: &mut R) -> Result<Sniffed> {
    if reader.fill_buf()?.starts_with(UTF8_BOM) {
        reader.consume(UTF8_BOM.len());
    }

    let mut blank_lines = 0;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(pos) => {
                blank_lines += buf[..pos].iter().filter(|&&b| b == b'\n').count();
                let format = if buf[pos] == b'[' {
                    SourceFormat::JsonArray
                } else {
                    SourceFormat::Ndjson
                };
                reader.consume(pos);
                return Ok(Sniffed {
                    format,
                    blank_lines,
                });
            }
            None => {
                blank_lines += buf.iter().filter(|&&b| b == b'\n').count();
                let len = buf.len();
                reader.consume(len);
            }
        }
    }

    Ok(Sniffed {
        format: SourceFormat::Ndjson,
        blank_lines,
    })
}

/// Open a record source over `reader`
pub fn open_source<'a, R: BufRead + 'a>(
    mut reader: R,
    format: SourceFormat,
) -> Result<Box<dyn RecordSource + 'a>> {
    let source: Box<dyn RecordSource + 'a> = match format {
        SourceFormat::Ndjson => Box::new(NdjsonSource::new(reader)),
        SourceFormat::JsonArray => Box::new(JsonArraySource::new(reader)),
        SourceFormat::Auto => {
            let sniffed = sniff_format(&mut reader)?;
            debug!(format = ?sniffed.format, "Detected input format");
            match sniffed.format {
                SourceFormat::JsonArray => Box::new(JsonArraySource::new(reader)),
                _ => Box::new(NdjsonSource::with_offset(reader, sniffed.blank_lines)),
            }
        }
    };
    Ok(source)
}

#[cfg(test)]
mod tests;
