//! Record source tests

use super::*;
use crate::codec::Value;
use crate::error::{Error, ErrorClass};
use pretty_assertions::assert_eq;
use std::io::Cursor;
use test_case::test_case;

fn collect<S: RecordSource>(source: S) -> Vec<crate::error::Result<crate::codec::Record>> {
    source.collect()
}

fn ids(items: &[crate::error::Result<crate::codec::Record>]) -> Vec<i64> {
    items
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .filter_map(|r| match r.get("id") {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        })
        .collect()
}

// ============================================================================
// NDJSON Source
// ============================================================================

#[test]
fn test_ndjson_reads_lines_in_order() {
    let input = "{\"id\": 1}\n{\"id\": 2}\n{\"id\": 3}\n";
    let items = collect(NdjsonSource::new(Cursor::new(input)));

    assert_eq!(items.len(), 3);
    assert_eq!(ids(&items), vec![1, 2, 3]);
}

#[test]
fn test_ndjson_without_trailing_newline() {
    let input = "{\"id\": 1}\n{\"id\": 2}";
    let items = collect(NdjsonSource::new(Cursor::new(input)));
    assert_eq!(ids(&items), vec![1, 2]);
}

#[test]
fn test_ndjson_skips_blank_lines() {
    let input = "{\"id\": 1}\n\n   \r\n{\"id\": 2}\n";
    let mut source = NdjsonSource::new(Cursor::new(input));
    let items: Vec<_> = source.by_ref().collect();

    assert_eq!(ids(&items), vec![1, 2]);
    assert_eq!(source.lines_skipped(), 2);
    assert_eq!(source.line(), 4);
}

#[test]
fn test_ndjson_bad_line_is_isolated() {
    let input = "{\"id\": 1}\n{\"id\": 2,\n{\"id\": 3}\n";
    let items = collect(NdjsonSource::new(Cursor::new(input)));

    assert_eq!(items.len(), 3);
    assert_eq!(ids(&items), vec![1, 3]);

    match &items[1] {
        Err(Error::Decode {
            line_or_index,
            raw_token,
            ..
        }) => {
            assert_eq!(*line_or_index, 2);
            assert_eq!(raw_token, "{\"id\": 2,");
        }
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[test]
fn test_ndjson_non_object_line_is_decode_error() {
    let input = "{\"id\": 1}\n42\n\"text\"\n{\"id\": 2}\n";
    let items = collect(NdjsonSource::new(Cursor::new(input)));

    assert_eq!(ids(&items), vec![1, 2]);
    let errors: Vec<_> = items.iter().filter_map(|r| r.as_ref().err()).collect();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.class() == ErrorClass::Record));
}

#[test]
fn test_ndjson_strips_bom() {
    let input = b"\xEF\xBB\xBF{\"id\": 7}\n".to_vec();
    let items = collect(NdjsonSource::new(Cursor::new(input)));
    assert_eq!(ids(&items), vec![7]);
}

// ============================================================================
// JSON Array Source
// ============================================================================

#[test]
fn test_array_reads_elements_in_order() {
    let input = r#"[{"id": 1}, {"id": 2},
        {"id": 3, "nested": {"list": [1, 2, {"x": "a,]b"}]}}]"#;
    let items = collect(JsonArraySource::new(Cursor::new(input)));

    assert_eq!(items.len(), 3);
    assert_eq!(ids(&items), vec![1, 2, 3]);
}

#[test]
fn test_array_handles_escaped_quotes() {
    let input = r#"[{"id": 1, "s": "quote \" and ] and \\"}, {"id": 2}]"#;
    let items = collect(JsonArraySource::new(Cursor::new(input)));
    assert_eq!(ids(&items), vec![1, 2]);

    let first = items[0].as_ref().unwrap();
    assert_eq!(
        first.get("s"),
        Some(&Value::Text("quote \" and ] and \\".to_string()))
    );
}

#[test]
fn test_array_small_buffer() {
    // elements straddle many fill_buf boundaries
    let input = r#"[{"id": 1, "pad": "xxxxxxxxxxxxxxxx"}, {"id": 2}]"#;
    let reader = std::io::BufReader::with_capacity(3, Cursor::new(input));
    let items = collect(JsonArraySource::new(reader));
    assert_eq!(ids(&items), vec![1, 2]);
}

#[test_case("[]" ; "empty")]
#[test_case("  [ \n ]  \n" ; "empty with whitespace")]
fn test_array_empty(input: &str) {
    let items = collect(JsonArraySource::new(Cursor::new(input)));
    assert!(items.is_empty());
}

#[test]
fn test_array_broken_element_is_fatal() {
    let input = r#"[{"id": 1}, {"id": 2}, {"id": 3}, {"id": 4x}, {"id": 5}]"#;
    let items = collect(JsonArraySource::new(Cursor::new(input)));

    assert_eq!(items.len(), 4);
    assert_eq!(ids(&items), vec![1, 2, 3]);
    match &items[3] {
        Err(Error::MalformedContainer { index, .. }) => assert_eq!(*index, 3),
        other => panic!("expected malformed container, got {other:?}"),
    }
}

#[test_case(r#"[{"id": 1}, {"id": 2}"# ; "missing close")]
#[test_case(r#"[{"id": 1},]"# ; "trailing comma")]
#[test_case(r#"[{"id": 1},,{"id": 2}]"# ; "double comma")]
#[test_case(r#"[{"id": 1}] extra"# ; "content after close")]
fn test_array_structural_errors(input: &str) {
    let items = collect(JsonArraySource::new(Cursor::new(input)));
    let last = items.last().unwrap();
    assert!(matches!(last, Err(Error::MalformedContainer { .. })));
    assert_eq!(ids(&items), vec![1]);
}

#[test]
fn test_array_missing_open_bracket() {
    let items = collect(JsonArraySource::new(Cursor::new(r#"{"id": 1}"#)));
    assert_eq!(items.len(), 1);
    assert!(matches!(
        items[0],
        Err(Error::MalformedContainer { index: 0, .. })
    ));
}

#[test]
fn test_array_non_object_element_is_recoverable() {
    let input = r#"[{"id": 1}, 5, "x", {"id": 2}]"#;
    let items = collect(JsonArraySource::new(Cursor::new(input)));

    assert_eq!(items.len(), 4);
    assert_eq!(ids(&items), vec![1, 2]);
    assert!(matches!(
        items[1],
        Err(Error::Decode {
            line_or_index: 1,
            ..
        })
    ));
}

#[test]
fn test_array_keeps_decimal_text() {
    let items = collect(JsonArraySource::new(Cursor::new(r#"[{"amount": 16000.50}]"#)));
    let record = items[0].as_ref().unwrap();
    match record.get("amount") {
        Some(Value::Decimal(d)) => assert_eq!(d.as_str(), "16000.50"),
        other => panic!("expected decimal, got {other:?}"),
    }
}

// ============================================================================
// Format Detection
// ============================================================================

#[test_case("[{\"a\": 1}]", SourceFormat::JsonArray, 0 ; "array")]
#[test_case("\n\n  [{\"a\": 1}]", SourceFormat::JsonArray, 2 ; "array after blank lines")]
#[test_case("{\"a\": 1}\n", SourceFormat::Ndjson, 0 ; "ndjson")]
#[test_case("\n{\"a\": 1}\n", SourceFormat::Ndjson, 1 ; "ndjson after blank line")]
#[test_case("", SourceFormat::Ndjson, 0 ; "empty input")]
fn test_sniff_format(input: &str, expected: SourceFormat, blank_lines: usize) {
    let mut reader = Cursor::new(input.as_bytes());
    let sniffed = sniff_format(&mut reader).unwrap();
    assert_eq!(sniffed.format, expected);
    assert_eq!(sniffed.blank_lines, blank_lines);
}

#[test]
fn test_open_source_auto_keeps_line_numbers() {
    let input = "\n\n{\"id\": 1}\nnot json\n";
    let source = open_source(Cursor::new(input), SourceFormat::Auto).unwrap();
    assert_eq!(source.format(), SourceFormat::Ndjson);

    let items: Vec<_> = source.collect();
    assert_eq!(ids(&items), vec![1]);
    assert!(matches!(
        items[1],
        Err(Error::Decode {
            line_or_index: 4,
            ..
        })
    ));
}

#[test]
fn test_open_source_auto_array() {
    let source = open_source(Cursor::new(" [{\"id\": 9}]"), SourceFormat::Auto).unwrap();
    assert_eq!(source.format(), SourceFormat::JsonArray);
    let items: Vec<_> = source.collect();
    assert_eq!(ids(&items), vec![9]);
}

#[test]
fn test_position_label() {
    assert_eq!(SourceFormat::Ndjson.position_label(), "line");
    assert_eq!(SourceFormat::JsonArray.position_label(), "element");
}
