//! Incremental JSON array source
//!
//! The array is never parsed as a whole. A byte scanner walks the input,
//! tracking string and nesting state, and cuts out one top-level element at
//! a time; only that element is handed to `serde_json`. Memory use is bounded
//! by the largest single element.

use super::types::{RecordSource, SourceFormat};
use super::UTF8_BOM;
use crate::codec::{raw_excerpt, record_from_json, Record};
use crate::error::{Error, Result};
use serde_json::Value as JsonValue;
use std::io::{self, BufRead};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrayState {
    /// Nothing consumed yet
    Start,
    /// Inside the array, before the next element
    Open,
    /// After the closing bracket
    Trailing,
    Done,
    Failed,
}

/// Reads the elements of one top-level JSON array
///
/// A structurally broken element ends the source with
/// [`Error::MalformedContainer`]. A well-formed element that is not an object
/// is only a decode error for that element. Element indices are 0-based.
pub struct JsonArraySource<R> {
    reader: R,
    state: ArrayState,
    index: usize,
    element: Vec<u8>,
}

impl<R: BufRead> JsonArraySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            state: ArrayState::Start,
            index: 0,
            element: Vec::with_capacity(1024),
        }
    }

    /// Index of the next element to be read
    pub fn index(&self) -> usize {
        self.index
    }

    fn open(&mut self) -> Result<()> {
        let buf = self.reader.fill_buf()?;
        if buf.starts_with(UTF8_BOM) {
            self.reader.consume(UTF8_BOM.len());
        }
        match peek_non_whitespace(&mut self.reader)? {
            Some(b'[') => {
                self.reader.consume(1);
                Ok(())
            }
            Some(other) => Err(Error::malformed(
                0,
                format!("expected '[' at start of input, found '{}'", other as char),
            )),
            None => Err(Error::malformed(0, "input is empty")),
        }
    }

    /// Collect the bytes of the next element into `self.element`
    ///
    /// Returns the byte that ended it (`,` or `]`), or `None` at end of input.
    fn scan_element(&mut self) -> io::Result<Option<u8>> {
        self.element.clear();
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(None);
            }

            let mut end = None;
            for (i, &b) in buf.iter().enumerate() {
                if in_string {
                    if escaped {
                        escaped = false;
                    } else if b == b'\\' {
                        escaped = true;
                    } else if b == b'"' {
                        in_string = false;
                    }
                    continue;
                }
                match b {
                    b'"' => in_string = true,
                    b'{' | b'[' => depth += 1,
                    b'}' | b']' if depth > 0 => depth -= 1,
                    b',' | b']' if depth == 0 => {
                        end = Some((i, b));
                        break;
                    }
                    _ => {}
                }
            }

            match end {
                Some((i, terminator)) => {
                    self.element.extend_from_slice(&buf[..i]);
                    self.reader.consume(i + 1);
                    return Ok(Some(terminator));
                }
                None => {
                    let len = buf.len();
                    self.element.extend_from_slice(buf);
                    self.reader.consume(len);
                }
            }
        }
    }

    /// Read and decode the next element, or `None` once `]` is reached
    fn next_element(&mut self) -> Result<Option<Result<Record>>> {
        let terminator = self.scan_element()?.ok_or_else(|| {
            Error::malformed(self.index, "unexpected end of input inside array")
        })?;

        let bytes = self.element.trim_ascii();
        if bytes.is_empty() {
            if terminator == b']' && self.index == 0 {
                self.state = ArrayState::Trailing;
                return Ok(None);
            }
            return Err(Error::malformed(self.index, "empty array element"));
        }

        let value: JsonValue = serde_json::from_slice(bytes).map_err(|e| {
            Error::malformed(self.index, format!("{e} in '{}'", raw_excerpt(bytes)))
        })?;
        let record = record_from_json(value, self.index, bytes);

        self.index += 1;
        if terminator == b']' {
            self.state = ArrayState::Trailing;
        }
        Ok(Some(record))
    }

    fn check_trailing(&mut self) -> Result<()> {
        match peek_non_whitespace(&mut self.reader)? {
            None => Ok(()),
            Some(_) => Err(Error::malformed(
                self.index,
                "unexpected content after closing ']'",
            )),
        }
    }

    fn step(&mut self) -> Result<Option<Result<Record>>> {
        loop {
            match self.state {
                ArrayState::Done | ArrayState::Failed => return Ok(None),
                ArrayState::Start => {
                    self.open()?;
                    self.state = ArrayState::Open;
                }
                ArrayState::Open => match self.next_element()? {
                    Some(item) => return Ok(Some(item)),
                    None => continue,
                },
                ArrayState::Trailing => {
                    self.check_trailing()?;
                    self.state = ArrayState::Done;
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for JsonArraySource<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(item) => item,
            Err(e) => {
                self.state = ArrayState::Failed;
                Some(Err(e))
            }
        }
    }
}

impl<R: BufRead> RecordSource for JsonArraySource<R> {
    fn format(&self) -> SourceFormat {
        SourceFormat::JsonArray
    }
}

/// Consume whitespace and return the next byte without consuming it
pub(super) fn peek_non_whitespace<R: BufRead>(reader: &mut R) -> io::Result<Option<u8>> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(None);
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(pos) => {
                let b = buf[pos];
                reader.consume(pos);
                return Ok(Some(b));
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}
