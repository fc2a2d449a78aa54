//! Canonical text emission for validated values.

use std::fmt::Write as _;

use serde_json::{Map, Number, Value};

use super::number::format_f64;

/// Emits a JSON value in canonical form.
pub(super) fn emit_value(value: &Value, output: &mut String) {
    match value {
        Value::Null => output.push_str("null"),
        Value::Bool(b) => output.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => emit_number(n, output),
        Value::String(s) => emit_string(s, output),
        Value::Array(arr) => emit_array(arr, output),
        Value::Object(obj) => emit_object(obj, output),
    }
}

/// Integers keep their exact decimal digits; everything else goes through
/// the ECMAScript formatter.
fn emit_number(n: &Number, output: &mut String) {
    if let Some(i) = n.as_i64() {
        let _ = write!(output, "{i}");
    } else if let Some(u) = n.as_u64() {
        let _ = write!(output, "{u}");
    } else if let Some(f) = n.as_f64() {
        output.push_str(&format_f64(f));
    }
}

/// Emits a string with minimal escaping (RFC 8785 section 3.2.2.2).
///
/// Only `"`, `\` and U+0000..=U+001F are escaped; the short forms are used
/// where JSON defines them and `\u00xx` otherwise.
pub(super) fn emit_string(s: &str, output: &mut String) {
    output.push('"');
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\u{0008}' => output.push_str("\\b"),
            '\u{000C}' => output.push_str("\\f"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if ('\u{0000}'..='\u{001F}').contains(&c) => {
                let _ = write!(output, "\\u{:04x}", c as u32);
            },
            c => output.push(c),
        }
    }
    output.push('"');
}

fn emit_array(arr: &[Value], output: &mut String) {
    output.push('[');
    for (i, item) in arr.iter().enumerate() {
        if i > 0 {
            output.push(',');
        }
        emit_value(item, output);
    }
    output.push(']');
}

/// Keys are sorted by byte order regardless of the map's own ordering.
fn emit_object(obj: &Map<String, Value>, output: &mut String) {
    let mut sorted_keys: Vec<&String> = obj.keys().collect();
    sorted_keys.sort();

    output.push('{');
    for (i, key) in sorted_keys.iter().enumerate() {
        if i > 0 {
            output.push(',');
        }
        emit_string(key, output);
        output.push(':');
        emit_value(&obj[key.as_str()], output);
    }
    output.push('}');
}

#[cfg(test)]
mod unit_tests {
    use serde_json::json;

    use super::*;

    fn emit(value: &Value) -> String {
        let mut out = String::new();
        emit_value(value, &mut out);
        out
    }

    #[test]
    fn test_escape_special_chars() {
        assert_eq!(
            emit(&json!({"text": "line1\nline2\ttab"})),
            r#"{"text":"line1\nline2\ttab"}"#
        );
    }

    #[test]
    fn test_escape_quotes_and_backslash() {
        assert_eq!(
            emit(&json!("say \"hi\" \\ bye")),
            r#""say \"hi\" \\ bye""#
        );
    }

    #[test]
    fn test_escape_other_control_chars() {
        assert_eq!(emit(&json!("\u{0000}\u{001f}")), r#""\u0000\u001f""#);
    }

    #[test]
    fn test_del_and_c1_controls_are_raw() {
        let out = emit(&json!("\u{007F}\u{0085}"));
        assert!(!out.contains("\\u"), "no escapes expected: {out}");
        assert!(out.contains('\u{007F}'));
    }

    #[test]
    fn test_keys_sorted_by_bytes() {
        // Uppercase sorts before lowercase in byte order.
        assert_eq!(
            emit(&json!({"b": 1, "B": 2, "a": 3, "\u{e9}": 4})),
            "{\"B\":2,\"a\":3,\"b\":1,\"\u{e9}\":4}"
        );
    }

    #[test]
    fn test_integral_float_has_no_fraction() {
        assert_eq!(emit(&json!(100.0)), "100");
        assert_eq!(emit(&json!(-0.0)), "0");
        assert_eq!(emit(&json!(u64::MAX)), "18446744073709551615");
    }
}
