//! `max` / `min`: compare string length, numeric value, or array length
//! against the first parameter. Unsupported kinds and missing or
//! non-numeric bounds are a no-op.
use serde_json::Value;

use super::FilterResult;
use crate::error::FilterError;
use crate::expr::Param;
use crate::options::Options;
use crate::schema::Schema;

#[derive(Debug, Clone, Copy)]
enum Bound {
    Max,
    Min,
}

impl Bound {
    fn violated(self, actual: f64, limit: f64) -> bool {
        match self {
            Self::Max => actual > limit,
            Self::Min => actual < limit,
        }
    }

    fn phrase(self) -> &'static str {
        match self {
            Self::Max => "less than",
            Self::Min => "greater than",
        }
    }
}

pub fn max(
    value: &Value,
    _body: &Value,
    params: &[Param],
    field: &str,
    _schema: &Schema,
    _options: &Options,
) -> FilterResult {
    check(Bound::Max, value, params, field)
}

pub fn min(
    value: &Value,
    _body: &Value,
    params: &[Param],
    field: &str,
    _schema: &Schema,
    _options: &Options,
) -> FilterResult {
    check(Bound::Min, value, params, field)
}

fn check(bound: Bound, value: &Value, params: &[Param], field: &str) -> FilterResult {
    let Some(param) = params.first() else { return Ok(None) };
    let Some(limit) = param.as_f64() else { return Ok(None) };

    let (actual, unit) = match value {
        Value::String(s) => (s.chars().count() as f64, " characters in length"),
        Value::Array(items) => (items.len() as f64, " items in length"),
        Value::Number(n) => match n.as_f64() {
            Some(x) => (x, ""),
            None => return Ok(None),
        },
        _ => return Ok(None),
    };

    if bound.violated(actual, limit) {
        return Err(FilterError::invalid(format!(
            "{field} must be {} {param}{unit}.",
            bound.phrase()
        )));
    }
    Ok(None)
}
