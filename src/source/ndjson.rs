//! Newline-delimited JSON source

use super::types::{RecordSource, SourceFormat};
use super::UTF8_BOM;
use crate::codec::{decode_record, Record};
use crate::error::Result;
use std::io::BufRead;
use tracing::debug;

/// Reads one record per line
///
/// Each line is decoded on its own, so a bad line yields a decode error and
/// the next call continues with the following line. Line numbers are 1-based.
pub struct NdjsonSource<R> {
    reader: R,
    line: usize,
    lines_skipped: usize,
    buf: Vec<u8>,
    finished: bool,
}

impl<R: BufRead> NdjsonSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_offset(reader, 0)
    }

    /// Continue after `blank_lines` lines that were already consumed
    ///
    /// Format detection reads past leading whitespace; those lines still
    /// count for numbering and for the skipped-line total.
    pub(crate) fn with_offset(reader: R, blank_lines: usize) -> Self {
        Self {
            reader,
            line: blank_lines,
            lines_skipped: blank_lines,
            buf: Vec::with_capacity(1024),
            finished: false,
        }
    }

    /// Line number of the most recently read line
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for NdjsonSource<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
            self.line += 1;

            let mut bytes = self.buf.trim_ascii();
            if self.line == 1 {
                bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes).trim_ascii();
            }

            if bytes.is_empty() {
                debug!(line = self.line, "Skipping blank line");
                self.lines_skipped += 1;
                continue;
            }

            return Some(decode_record(bytes, self.line));
        }
    }
}

impl<R: BufRead> RecordSource for NdjsonSource<R> {
    fn format(&self) -> SourceFormat {
        SourceFormat::Ndjson
    }

    fn lines_skipped(&self) -> usize {
        self.lines_skipped
    }
}
