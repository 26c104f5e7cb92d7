//! Scalar conversion rules shared by the `get_*` accessors and the typed
//! decoder.
//!
//! Each function returns `None` when the value cannot be converted; callers
//! map that to [`NOT_FOUND`](crate::revision::NOT_FOUND) or to a decode
//! error.

use super::Value;

/// Case-insensitive `true`/`false` literal.
fn bool_literal(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok()
}

/// Convert to `bool`.
///
/// Numbers are `true` when nonzero; strings accept `true`/`false` in any
/// case, then any number.
#[must_use]
pub fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => Some(*number != 0.0),
        Value::String(text) => bool_literal(text).or_else(|| parse_number(text).map(|n| n != 0.0)),
        Value::Null | Value::List(_) | Value::Map(_) => None,
    }
}

/// Convert to `i64`, truncating fractional numbers toward zero.
///
/// Booleans become `1`/`0`; strings accept `true`/`false` in any case, then
/// any floating-point number.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "truncation toward zero is the documented conversion"
)]
pub fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => Some(*number as i64),
        Value::Bool(flag) => Some(i64::from(*flag)),
        Value::String(text) => bool_literal(text)
            .map(i64::from)
            .or_else(|| parse_number(text).map(|n| n as i64)),
        Value::Null | Value::List(_) | Value::Map(_) => None,
    }
}

/// Convert to `i32` by truncating the [`to_i64`] result.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "narrowing keeps the low bits like a C-style cast"
)]
pub fn to_i32(value: &Value) -> Option<i32> {
    to_i64(value).map(|wide| wide as i32)
}

/// Convert to `f64`. Only numbers and numeric strings convert.
#[must_use]
pub fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => Some(*number),
        Value::String(text) => parse_number(text),
        Value::Null | Value::Bool(_) | Value::List(_) | Value::Map(_) => None,
    }
}

/// Convert to `f32` by narrowing the [`to_f64`] result.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "narrowing to single precision is the documented conversion"
)]
pub fn to_f32(value: &Value) -> Option<f32> {
    to_f64(value).map(|wide| wide as f32)
}

/// Render any value as text. String leaves are returned verbatim.
#[must_use]
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Mapping;
    use rstest::rstest;

    #[rstest]
    #[case(Value::Bool(true), Some(true))]
    #[case(Value::Number(0.0), Some(false))]
    #[case(Value::Number(-2.5), Some(true))]
    #[case(Value::from("TrUe"), Some(true))]
    #[case(Value::from("FALSE"), Some(false))]
    #[case(Value::from("5"), Some(true))]
    #[case(Value::from("0.0"), Some(false))]
    #[case(Value::from("yes"), None)]
    #[case(Value::Null, None)]
    #[case(Value::Map(Mapping::new()), None)]
    fn bool_rules(#[case] value: Value, #[case] expected: Option<bool>) {
        assert_eq!(to_bool(&value), expected);
    }

    #[rstest]
    #[case(Value::Number(3.9), Some(3))]
    #[case(Value::Number(-3.9), Some(-3))]
    #[case(Value::Bool(true), Some(1))]
    #[case(Value::Bool(false), Some(0))]
    #[case(Value::from("true"), Some(1))]
    #[case(Value::from("False"), Some(0))]
    #[case(Value::from("5"), Some(5))]
    #[case(Value::from("7.8"), Some(7))]
    #[case(Value::from("1e3"), Some(1000))]
    #[case(Value::from("seven"), None)]
    #[case(Value::from(" 5"), None)]
    #[case(Value::from("5\n"), None)]
    #[case(Value::List(vec![]), None)]
    fn int_rules(#[case] value: Value, #[case] expected: Option<i64>) {
        assert_eq!(to_i64(&value), expected);
    }

    #[test]
    fn int32_truncates_wide_values() {
        let wide = Value::Number(4_294_967_297.0);
        assert_eq!(to_i32(&wide), Some(1));
    }

    #[rstest]
    #[case(Value::Number(1.5), Some(1.5))]
    #[case(Value::from("2.25"), Some(2.25))]
    #[case(Value::Bool(true), None)]
    #[case(Value::from("true"), None)]
    #[case(Value::from("2.25 "), None)]
    fn float_rules(#[case] value: Value, #[case] expected: Option<f64>) {
        assert_eq!(to_f64(&value), expected);
    }

    #[test]
    fn float32_narrows() {
        assert_eq!(to_f32(&Value::from("0.5")), Some(0.5_f32));
    }

    #[rstest]
    #[case(Value::from("plain"), "plain")]
    #[case(Value::Bool(false), "false")]
    #[case(Value::Number(2.0), "2")]
    #[case(Value::Number(2.5), "2.5")]
    #[case(Value::Null, "")]
    #[case(Value::List(vec![Value::from("a"), Value::Number(1.0)]), r#"["a",1]"#)]
    fn text_rendering(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(to_text(&value), expected);
    }

    #[test]
    fn mapping_renders_as_json() {
        let mut map = Mapping::new();
        map.insert("b".to_owned(), Value::Bool(true));
        map.insert("a".to_owned(), Value::Number(1.0));
        assert_eq!(to_text(&Value::Map(map)), r#"{"a":1,"b":true}"#);
    }
}
