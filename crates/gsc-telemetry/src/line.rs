//! InfluxDB line protocol encoding

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::ActiveSample;

/// Measurement for matched rules
pub const ACTIVE_MEASUREMENT: &str = "active";

/// Measurement for rules over quota
pub const EXCEEDING_MEASUREMENT: &str = "exceeding";

/// Field written on every batch
const SYSTEM_FIELD: &str = "system";

/// Encode the active series
pub fn active_lines(samples: &[ActiveSample]) -> String {
    let mut out = String::new();
    push_line(&mut out, ACTIVE_MEASUREMENT, SYSTEM_FIELD, 1.0);
    for sample in samples {
        push_line(&mut out, ACTIVE_MEASUREMENT, &sample.name, sample.ratio);
    }
    out
}

/// Encode the exceeding series
pub fn exceeding_lines(names: &BTreeSet<String>) -> String {
    let mut out = String::new();
    push_line(&mut out, EXCEEDING_MEASUREMENT, SYSTEM_FIELD, 1.0);
    for name in names {
        push_line(&mut out, EXCEEDING_MEASUREMENT, name, 1.0);
    }
    out
}

fn push_line(out: &mut String, measurement: &str, field: &str, value: f64) {
    // Line protocol has no representation for NaN or infinity
    let value = if value.is_finite() { value } else { 0.0 };
    let _ = writeln!(out, "{} {}={:?}", measurement, escape_key(field), value);
}

/// Escape a field key: commas, equals signs and spaces are backslash-escaped
pub fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for c in key.chars() {
        if matches!(c, ',' | '=' | ' ' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
