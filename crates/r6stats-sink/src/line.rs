//! InfluxDB line protocol encoding with second precision timestamps.

use std::fmt::Write as _;

use r6stats_core::{FieldValue, MetricPoint};

/// Encodes one point as a line-protocol line (without trailing newline).
///
/// Returns `None` when the point has no encodable field, since the server
/// rejects field-less lines. Empty tag values and non-finite floats are
/// dropped.
#[must_use]
pub fn encode_point(point: &MetricPoint) -> Option<String> {
    let fields: Vec<String> = point
        .fields
        .iter()
        .filter_map(|(key, value)| {
            encode_field_value(value).map(|v| format!("{}={v}", escape_key(key)))
        })
        .collect();
    if fields.is_empty() {
        return None;
    }

    let mut line = escape_measurement(&point.measurement);
    for (key, value) in point.tags.iter().filter(|(_, v)| !v.is_empty()) {
        let _ = write!(line, ",{}={}", escape_key(key), escape_key(value));
    }
    let _ = write!(
        line,
        " {} {}",
        fields.join(","),
        point.timestamp.timestamp()
    );
    Some(line)
}

fn encode_field_value(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Int(v) => Some(format!("{v}i")),
        FieldValue::Float(v) if v.is_finite() => Some(format!("{v}")),
        FieldValue::Float(_) => None,
        FieldValue::Bool(v) => Some(v.to_string()),
        FieldValue::Str(v) => Some(format!(
            "\"{}\"",
            v.replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\n', "\\n")
        )),
    }
}

fn escape_measurement(raw: &str) -> String {
    escape(raw, &[',', ' '])
}

/// Escaping shared by tag keys, tag values and field keys.
fn escape_key(raw: &str) -> String {
    escape(raw, &[',', '=', ' '])
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        // A raw newline would end the line early.
        if c == '\n' {
            out.push_str("\\n");
            continue;
        }
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
