//! Filter registry and the built-in filters.
//!
//! Every filter shares one signature:
//!
//! ```text
//! (value, body, params, field, schema, options) -> Result<Option<Value>, FilterError>
//! ```
//!
//! `Ok(Some(v))` means the filter returned a value (used when the
//! invocation pipes), `Ok(None)` means it only checked, and `Err` stops the
//! leaf's chain.
pub mod arr;
pub mod bounds;
pub mod num;
pub mod str;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{FilterConflictError, FilterError};
use crate::expr::Param;
use crate::options::Options;
use crate::schema::Schema;

pub type FilterResult = Result<Option<Value>, FilterError>;

pub type FilterFn =
    dyn Fn(&Value, &Value, &[Param], &str, &Schema, &Options) -> FilterResult + Send + Sync;

/// A name/filter pair for bulk registration.
#[derive(Clone)]
pub struct NamedFilter {
    pub name: String,
    pub filter: Arc<FilterFn>,
}

impl NamedFilter {
    pub fn new<F>(name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&Value, &Value, &[Param], &str, &Schema, &Options) -> FilterResult + Send + Sync + 'static,
    {
        Self { name: name.into(), filter: Arc::new(filter) }
    }
}

#[derive(Clone)]
pub struct FilterRegistry {
    filters: IndexMap<String, Arc<FilterFn>>,
}

impl FilterRegistry {
    pub fn empty() -> Self {
        Self { filters: IndexMap::new() }
    }

    pub fn with_builtins() -> Self {
        let builtins: [(&str, Arc<FilterFn>); 6] = [
            ("required", Arc::new(required)),
            ("string", Arc::new(str::string)),
            ("number", Arc::new(num::number)),
            ("array", Arc::new(arr::array)),
            ("max", Arc::new(bounds::max)),
            ("min", Arc::new(bounds::min)),
        ];
        let filters = builtins
            .into_iter()
            .map(|(name, filter)| (name.to_string(), filter))
            .collect();
        Self { filters }
    }

    pub fn register<F>(&mut self, name: impl Into<String>, filter: F) -> Result<(), FilterConflictError>
    where
        F: Fn(&Value, &Value, &[Param], &str, &Schema, &Options) -> FilterResult + Send + Sync + 'static,
    {
        self.register_shared(name, Arc::new(filter))
    }

    /// Fails without touching the existing entry when `name` is taken.
    pub fn register_shared(
        &mut self,
        name: impl Into<String>,
        filter: Arc<FilterFn>,
    ) -> Result<(), FilterConflictError> {
        let name = name.into();
        if self.filters.contains_key(&name) {
            return Err(FilterConflictError { name });
        }
        tracing::debug!(filter = %name, "registered filter");
        self.filters.insert(name, filter);
        Ok(())
    }

    /// Register in order, stopping at the first conflict. Entries before it
    /// stay registered.
    pub fn register_all<I>(&mut self, filters: I) -> Result<(), FilterConflictError>
    where
        I: IntoIterator<Item = NamedFilter>,
    {
        filters
            .into_iter()
            .try_for_each(|NamedFilter { name, filter }| self.register_shared(name, filter))
    }

    pub fn get(&self, name: &str) -> Option<&FilterFn> {
        self.filters.get(name).map(|filter| filter.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

// ------------------------------- Helpers ---------------------------------- //

/// JS-style falsiness over JSON: `null`, `false`, zero, `""`.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

pub fn is_zero(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.as_f64() == Some(0.0))
}

// ------------------------------ Built-ins --------------------------------- //

/// Fails on falsy values other than zero.
pub fn required(
    value: &Value,
    _body: &Value,
    _params: &[Param],
    field: &str,
    _schema: &Schema,
    _options: &Options,
) -> FilterResult {
    if is_falsy(value) && !is_zero(value) {
        return Err(FilterError::required(field));
    }
    Ok(None)
}


#[cfg(test)]
mod tests {
    use super::test_support::call;
    use super::*;
    use serde_json::json;

    #[test]
    fn required_rejects_falsy_but_not_zero() {
        let options = Options::default();
        for (value, field) in [
            (json!(null), "nullField"),
            (json!(""), "emptyStringField"),
            (json!(false), "falseField"),
        ] {
            let err = call(required, value, &[], field, options).unwrap_err();
            assert_eq!(err.to_string(), format!("{field} is required."));
        }
        for value in [json!(0), json!(55), json!("hello"), json!([]), json!({})] {
            assert_eq!(call(required, value, &[], "f", options), Ok(None));
        }
    }

    #[test]
    fn builtins_are_seeded() {
        let registry = FilterRegistry::with_builtins();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, ["required", "string", "number", "array", "max", "min"]);
        assert!(FilterRegistry::empty().get("required").is_none());
    }

    #[test]
    fn duplicate_registration_keeps_existing_filter() {
        let mut registry = FilterRegistry::with_builtins();
        let err = registry
            .register("required", |_: &Value, _: &Value, _: &[Param], _: &str, _: &Schema, _: &Options| {
                Ok(Some(json!("replaced")))
            })
            .unwrap_err();
        assert_eq!(err.name, "required");

        let filter = registry.get("required").unwrap();
        let result = filter(&json!(null), &json!({}), &[], "x", &Schema::default(), &Options::default());
        assert_eq!(result, Err(FilterError::required("x")));
    }

    #[test]
    fn register_all_stops_at_first_conflict() {
        let mut registry = FilterRegistry::with_builtins();
        let noop = |_: &Value, _: &Value, _: &[Param], _: &str, _: &Schema, _: &Options| -> FilterResult {
            Ok(None)
        };
        let err = registry
            .register_all([
                NamedFilter::new("first", noop),
                NamedFilter::new("max", noop),
                NamedFilter::new("third", noop),
            ])
            .unwrap_err();
        assert_eq!(err.name, "max");
        assert!(registry.contains("first"));
        assert!(!registry.contains("third"));
    }

    #[test]
    fn falsiness() {
        assert!(is_falsy(&json!(0.0)));
        assert!(!is_falsy(&json!("0")));
        assert!(!is_falsy(&json!([])));
        assert!(is_zero(&json!(0)));
        assert!(!is_zero(&json!(null)));
    }
}
