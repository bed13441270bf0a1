use serde_json::{Number, Value};

use super::{is_falsy, is_zero, FilterResult};
use crate::error::FilterError;
use crate::expr::Param;
use crate::options::Options;
use crate::schema::Schema;

/// `string`: coerce scalars to text, or insist on a string when coercion
/// is off. Falsy values other than zero pass through untouched.
pub fn string(
    value: &Value,
    _body: &Value,
    _params: &[Param],
    field: &str,
    _schema: &Schema,
    options: &Options,
) -> FilterResult {
    if is_falsy(value) && !is_zero(value) {
        return Ok(None);
    }

    if options.type_coercion {
        return match coerce_to_string(value) {
            Some(text) => Ok(Some(Value::String(text))),
            None => Err(FilterError::type_error(
                "string",
                format!("Could not coerce {field} value into a string."),
            )),
        };
    }

    match value {
        Value::String(_) => Ok(None),
        _ => Err(FilterError::type_error("string", format!("{field} must be a string."))),
    }
}

fn coerce_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_to_string(n)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Render like JavaScript's `Number#toString`: plain decimals inside
/// `[1e-7, 1e21)`, exponent form with an explicit sign outside it.
fn number_to_string(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    let Some(f) = n.as_f64() else {
        return n.to_string();
    };
    if f == 0.0 {
        return "0".to_string();
    }
    if (1e-7..1e21).contains(&f.abs()) {
        return format!("{f}");
    }
    let exp = format!("{f:e}");
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
        _ => exp,
    }
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
        assert_eq!(call(string, json!(null), &[], "nullField", coercing()), Ok(None));
        assert_eq!(call(string, json!(""), &[], "emptyStringField", strict()), Ok(None));
        assert_eq!(call(string, json!(false), &[], "falseField", strict()), Ok(None));
    }

    #[test]
    fn strict_mode_requires_strings() {
        let err = call(string, json!(0), &[], "zeroField", strict()).unwrap_err();
        assert_eq!(err.to_string(), "zeroField must be a string.");
        assert_eq!(err.expected_type(), Some("string"));

        let err = call(string, json!(50), &[], "numberStrField", strict()).unwrap_err();
        assert_eq!(err.to_string(), "numberStrField must be a string.");

        assert_eq!(call(string, json!("string"), &[], "stringField", strict()), Ok(None));
    }

    #[test]
    fn coercion_converts_scalars() {
        assert_eq!(call(string, json!(50), &[], "f", coercing()), Ok(Some(json!("50"))));
        assert_eq!(call(string, json!(0), &[], "f", coercing()), Ok(Some(json!("0"))));
        assert_eq!(call(string, json!(2.5), &[], "f", coercing()), Ok(Some(json!("2.5"))));
        assert_eq!(call(string, json!(true), &[], "f", coercing()), Ok(Some(json!("true"))));
        assert_eq!(call(string, json!("string"), &[], "f", coercing()), Ok(Some(json!("string"))));
    }

    #[test]
    fn numbers_render_like_javascript() {
        let render = |value: Value| call(string, value, &[], "n", coercing()).unwrap();
        assert_eq!(render(json!(1e21)), Some(json!("1e+21")));
        assert_eq!(render(json!(1.5e-8)), Some(json!("1.5e-8")));
        assert_eq!(render(json!(1e20)), Some(json!("100000000000000000000")));
        assert_eq!(render(json!(2.5)), Some(json!("2.5")));
        assert_eq!(render(json!(-0.0)), Some(json!("0")));
    }

    #[test]
    fn containers_cannot_be_coerced() {
        let err = call(string, json!({ "a": 1 }), &[], "numberTextField", coercing()).unwrap_err();
        assert_eq!(err.to_string(), "Could not coerce numberTextField value into a string.");
        assert!(call(string, json!([1]), &[], "f", coercing()).is_err());
    }
}
