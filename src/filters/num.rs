use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use super::{is_falsy, FilterResult};
use crate::error::FilterError;
use crate::expr::Param;
use crate::options::Options;
use crate::schema::{kind_name, Schema};

/// Leading float literal, the part a lenient float parse would consume.
static FLOAT_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("float prefix regex")
});

/// Largest magnitude below which every integral `f64` is exact.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// `number`: coerce to a JSON number, or insist on one when coercion is
/// off. Falsy values pass through untouched.
pub fn number(
    value: &Value,
    _body: &Value,
    _params: &[Param],
    field: &str,
    _schema: &Schema,
    options: &Options,
) -> FilterResult {
    if is_falsy(value) {
        return Ok(None);
    }

    if options.type_coercion {
        return match coerce_to_number(value) {
            Some(n) => Ok(Some(n)),
            None => Err(FilterError::type_error(
                "number",
                format!("Could not coerce {field} value into a number."),
            )),
        };
    }

    match value {
        Value::Number(_) => Ok(None),
        other => Err(FilterError::type_error(
            "number",
            format!("{field} must be a number but is {}.", kind_name(other)),
        )),
    }
}

fn coerce_to_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(Value::Number(n.clone())),
        Value::Number(n) => n.as_f64().and_then(number_value),
        Value::String(s) => parse_float_prefix(s).and_then(number_value),
        _ => None,
    }
}

/// Parse the leading float literal of `text`, ignoring leading whitespace
/// and any trailing garbage (`"50px"` is 50).
pub fn parse_float_prefix(text: &str) -> Option<f64> {
    let matched = FLOAT_PREFIX.find(text.trim_start())?;
    matched.as_str().parse::<f64>().ok()
}

/// Integral values become JSON integers so `"3"` and `3` compare equal.
fn number_value(n: f64) -> Option<Value> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Some(Value::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_support::call;
    use serde_json::json;

    fn coercing() -> Options {
        Options::default()
    }
    fn strict() -> Options {
        Options::default().with_type_coercion(false)
    }

    #[test]
    fn falsy_values_are_skipped() {
        for value in [json!(null), json!(""), json!(0), json!(false)] {
            assert_eq!(call(number, value.clone(), &[], "f", coercing()), Ok(None));
            assert_eq!(call(number, value, &[], "f", strict()), Ok(None));
        }
    }

    #[test]
    fn strict_mode_reports_actual_kind() {
        assert_eq!(call(number, json!(50), &[], "numberField", strict()), Ok(None));

        let err = call(number, json!("50"), &[], "strNumberField", strict()).unwrap_err();
        assert_eq!(err.to_string(), "strNumberField must be a number but is string.");
        assert_eq!(err.expected_type(), Some("number"));

        let err = call(number, json!([1]), &[], "arrField", strict()).unwrap_err();
        assert_eq!(err.to_string(), "arrField must be a number but is array.");
    }

    #[test]
    fn coercion_parses_strings() {
        assert_eq!(call(number, json!(50), &[], "f", coercing()), Ok(Some(json!(50))));
        assert_eq!(call(number, json!("50"), &[], "f", coercing()), Ok(Some(json!(50))));
        assert_eq!(call(number, json!("50.5"), &[], "f", coercing()), Ok(Some(json!(50.5))));
        assert_eq!(call(number, json!(" 12px"), &[], "f", coercing()), Ok(Some(json!(12))));
        assert_eq!(call(number, json!(4.0), &[], "f", coercing()), Ok(Some(json!(4))));

        let err = call(number, json!("fifty"), &[], "strField", coercing()).unwrap_err();
        assert_eq!(err.to_string(), "Could not coerce strField value into a number.");
        assert!(call(number, json!("NaN"), &[], "f", coercing()).is_err());
        assert!(call(number, json!(true), &[], "f", coercing()).is_err());
    }

    #[test]
    fn coercion_is_idempotent() {
        for value in [json!(7), json!(-3), json!(2.25), json!(u64::MAX)] {
            let once = call(number, value.clone(), &[], "f", coercing()).unwrap().unwrap();
            let twice = call(number, once.clone(), &[], "f", coercing()).unwrap().unwrap();
            assert_eq!(once, value);
            assert_eq!(twice, once);
        }
    }

    #[test]
    fn float_prefix() {
        assert_eq!(parse_float_prefix("2.75abc"), Some(2.75));
        assert_eq!(parse_float_prefix("-.5"), Some(-0.5));
        assert_eq!(parse_float_prefix("1e3"), Some(1000.0));
        assert_eq!(parse_float_prefix("abc"), None);
        assert_eq!(parse_float_prefix("Infinity"), None);
    }
}
