//! Canonical block-form encoder — pretty-prints a [`Value`] tree into
//! markup that re-parses to an equal value.
//!
//! - Maps become `key: value` lines, nested containers indented two spaces
//!   per level.
//! - Sequences become `- item` lines; a nested sequence item is a bare `-`
//!   with its items two columns deeper.
//! - Strings are written bare when unambiguous, quoted with escapes
//!   otherwise. Floats always carry a decimal point or exponent so they do
//!   not come back as integers.
//! - Date-times and timestamps use their conversion specifiers. Empty
//!   containers have no block form, so they are written as `:json: {}` and
//!   `:json: []`.

use crate::value::{Map, Timestamp, Value};
use chrono::{DateTime, FixedOffset, Timelike};

/// Encode a value tree into canonical block form.
pub fn encode(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Map(map) if !map.is_empty() => encode_map_fields(map, 0, &mut out),
        Value::Map(_) => out.push_str(":json: {}"),
        Value::Array(items) if !items.is_empty() => encode_list_items(items, 0, &mut out),
        Value::Array(_) => out.push_str(":json: []"),
        scalar => out.push_str(&scalar_repr(scalar)),
    }
    out
}

/// Two spaces of indentation per nesting level.
fn make_indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// Emit all entries of a map at the given depth, one per line.
fn encode_map_fields(map: &Map, depth: usize, out: &mut String) {
    let indent = make_indent(depth);
    let mut first = true;
    for (key, value) in map.iter() {
        if !first {
            out.push('\n');
        }
        first = false;
        out.push_str(&indent);
        out.push_str(&key_repr(key));
        encode_field_value(value, depth, out);
    }
}

/// Emit `: value` (or a nested block) after a key already on the line.
fn encode_field_value(value: &Value, depth: usize, out: &mut String) {
    match value {
        Value::Map(map) if map.is_empty() => out.push_str(": :json: {}"),
        Value::Map(map) => {
            out.push_str(":\n");
            encode_map_fields(map, depth + 1, out);
        }
        Value::Array(items) if items.is_empty() => out.push_str(": :json: []"),
        Value::Array(items) => {
            out.push_str(":\n");
            encode_list_items(items, depth + 1, out);
        }
        scalar => {
            out.push_str(": ");
            out.push_str(&scalar_repr(scalar));
        }
    }
}

/// Emit sequence items with `- ` markers, one per line.
fn encode_list_items(items: &[Value], depth: usize, out: &mut String) {
    let indent = make_indent(depth);
    let mut first = true;
    for item in items {
        if !first {
            out.push('\n');
        }
        first = false;
        out.push_str(&indent);
        match item {
            Value::Map(map) if map.is_empty() => out.push_str("- :json: {}"),
            Value::Map(map) => {
                out.push_str("- ");
                encode_item_map(map, depth, out);
            }
            Value::Array(inner) if inner.is_empty() => out.push_str("- :json: []"),
            Value::Array(inner) => {
                // A nested sequence cannot sit on the marker line; its items
                // go two columns deeper, matching the marker's sub-block.
                out.push_str("-\n");
                encode_list_items(inner, depth + 1, out);
            }
            scalar => {
                out.push_str("- ");
                out.push_str(&scalar_repr(scalar));
            }
        }
    }
}

/// A map used as a list item: the first entry rides the marker line, the
/// rest align with it two columns past the marker.
fn encode_item_map(map: &Map, depth: usize, out: &mut String) {
    let indent = make_indent(depth + 1);
    let mut first = true;
    for (key, value) in map.iter() {
        if !first {
            out.push('\n');
            out.push_str(&indent);
        }
        first = false;
        out.push_str(&key_repr(key));
        encode_field_value(value, depth + 1, out);
    }
}

/// Render a scalar in value position.
fn scalar_repr(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::Int(n) => n.to_string(),
        Value::UInt(n) => n.to_string(),
        Value::Float(f) => float_repr(*f),
        Value::String(s) => {
            if bare_safe(s) {
                s.clone()
            } else {
                quoted(s)
            }
        }
        Value::DateTime(dt) => format!(":datetime: {}", datetime_repr(dt)),
        Value::Timestamp(ts) => format!(":timestamp: {}", timestamp_repr(ts)),
        // Containers in value position get block forms from the callers;
        // this arm only serves stray direct calls, as an inline island.
        Value::Array(_) | Value::Map(_) => format!(":json: {}", value.to_json()),
    }
}

/// Render a map key. Strings are bare only when they cannot be misread as
/// another production; every other scalar uses its literal form, which
/// round-trips as a typed key.
fn key_repr(key: &Value) -> String {
    match key {
        Value::String(s) => {
            if bare_safe(s) {
                s.clone()
            } else {
                quoted(s)
            }
        }
        Value::Null => "null".to_string(),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::Int(n) => n.to_string(),
        Value::UInt(n) => n.to_string(),
        Value::Float(f) => float_repr(*f),
        // No block form exists for date-times or timestamps as keys; fall
        // back to their quoted text so the document stays parseable.
        Value::DateTime(dt) => quoted(&format!(":datetime: {}", datetime_repr(dt))),
        Value::Timestamp(ts) => quoted(&format!(":timestamp: {}", timestamp_repr(ts))),
        // The grammar cannot read a container back in key position either;
        // the quoted JSON text keeps the document parseable, as a string key.
        Value::Array(_) | Value::Map(_) => quoted(&key.to_json().to_string()),
    }
}

/// Floats must re-read as floats: force a decimal point when the shortest
/// representation has neither point nor exponent.
fn float_repr(f: f64) -> String {
    let mut s = format!("{}", f);
    if !s.contains('.') && !s.contains('e') && !s.contains('E') {
        s.push_str(".0");
    }
    s
}

fn datetime_repr(dt: &DateTime<FixedOffset>) -> String {
    let mut s = dt.format("%Y-%m-%dT%H:%M:%S").to_string();
    if dt.nanosecond() > 0 {
        let frac = format!("{:09}", dt.nanosecond());
        s.push('.');
        s.push_str(frac.trim_end_matches('0'));
    }
    s.push_str(&dt.format("%:z").to_string());
    s
}

fn timestamp_repr(ts: &Timestamp) -> String {
    let mut s = ts.secs.to_string();
    if ts.nanos > 0 {
        let frac = format!("{:09}", ts.nanos);
        s.push('.');
        s.push_str(frac.trim_end_matches('0'));
    }
    s
}

/// Decide whether a string survives unquoted.
///
/// The first character must not open another production (marker, sign,
/// digit, quote, colon, comment), the text must not contain a key-value
/// separator or comment introducer, must not collide with a keyword, and
/// must carry no control characters or edge whitespace.
fn bare_safe(s: &str) -> bool {
    if s.is_empty() || s != s.trim() {
        return false;
    }
    // Keyword prefixes are lexed as keywords before strings are considered,
    // so even "nullable" cannot survive bare.
    if s.starts_with("null") || s.starts_with("true") || s.starts_with("false") {
        return false;
    }
    let first = s.chars().next().unwrap();
    if matches!(first, '-' | '+' | ':' | '"' | '\'' | '#') || first.is_ascii_digit() {
        return false;
    }
    if s.contains(':') || s.contains('#') {
        return false;
    }
    if s.chars().any(|c| (c as u32) < 0x20) {
        return false;
    }
    true
}

/// Quote and escape a string for single-line form.
fn quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
