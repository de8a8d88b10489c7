//! Nested object flattening for tabular output

use crate::codec::{Record, Value};

/// Expand nested objects into `parent<sep>child` columns
///
/// Arrays are left in place; tabular sinks write them as JSON text. An empty
/// nested object becomes a null column under its own name so the column is
/// not lost. When a flattened name collides with an existing top-level
/// field, the later value replaces the earlier one.
pub fn flatten_record(record: Record, separator: &str) -> Record {
    let mut flat = Record::new();
    for (name, value) in record {
        flatten_into(&mut flat, name, value, separator);
    }
    flat
}

fn flatten_into(out: &mut Record, prefix: String, value: Value, separator: &str) {
    match value {
        Value::Record(nested) if !nested.is_empty() => {
            for (name, child) in nested {
                flatten_into(out, format!("{prefix}{separator}{name}"), child, separator);
            }
        }
        Value::Record(_) => out.insert(prefix, Value::Null),
        other => out.insert(prefix, other),
    }
}
