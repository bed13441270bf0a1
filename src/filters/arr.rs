use serde_json::Value;

use super::{is_falsy, is_zero, FilterResult};
use crate::error::FilterError;
use crate::expr::Param;
use crate::options::Options;
use crate::schema::Schema;

/// `array`: the value must be an array unless it is falsy (zero excluded).
pub fn array(
    value: &Value,
    _body: &Value,
    _params: &[Param],
    field: &str,
    _schema: &Schema,
    _options: &Options,
) -> FilterResult {
    if value.is_array() || (is_falsy(value) && !is_zero(value)) {
        return Ok(None);
    }
    Err(FilterError::type_error("array", format!("{field} must be an array.")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_support::call;
    use serde_json::json;

    #[test]
    fn falsy_values_are_skipped() {
        for value in [json!(null), json!(""), json!(false)] {
            assert_eq!(call(array, value, &[], "f", Options::default()), Ok(None));
        }
    }

    #[test]
    fn zero_and_scalars_are_rejected() {
        let err = call(array, json!(0), &[], "zeroField", Options::default()).unwrap_err();
        assert_eq!(err.to_string(), "zeroField must be an array.");
        assert_eq!(err.expected_type(), Some("array"));
        assert!(call(array, json!({}), &[], "f", Options::default()).is_err());
    }

    #[test]
    fn arrays_pass() {
        assert_eq!(call(array, json!([]), &[], "f", Options::default()), Ok(None));
        assert_eq!(call(array, json!([1, 2, 3]), &[], "f", Options::default()), Ok(None));
    }
}
