//! Schema validation engine.
//!
//! Walks the schema tree against the input, runs each leaf's filter chain,
//! and rebuilds an output tree mirroring the input. Every branch is
//! evaluated; there is no fail-fast mode.
//!
//! Per object node:
//! 1. input keys are checked against the schema (additional properties) and
//!    copied to output when allowed,
//! 2. schema keys are walked: nested mappings recurse, leaves reduce their
//!    filter chain and overwrite the copied value on success.
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{FilterConflictError, FilterError, SchemaError};
use crate::expr::{self, FilterInvocation, Param};
use crate::filters::{FilterRegistry, FilterResult, NamedFilter};
use crate::options::Options;
use crate::path::{get_at_path, FieldPath};
use crate::schema::{Schema, SchemaNode};

// ------------------------------- Results ---------------------------------- //

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Full dotted/bracketed path from the root.
    pub field: String,
    /// Absent for additional-property and shape errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub message: String,
}

impl ValidationError {
    fn from_filter(field: &str, filter: &str, err: &FilterError) -> Self {
        Self { field: field.to_string(), filter: Some(filter.to_string()), message: err.to_string() }
    }

    fn structural(field: &FieldPath, message: String) -> Self {
        Self { field: field.to_string(), filter: None, message }
    }

    fn additional_property(field: &FieldPath) -> Self {
        Self::structural(
            field,
            format!("Field '{field}' does not exist in schema and additional properties are not allowed."),
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = if self.field.is_empty() { "(root)" } else { &self.field };
        match &self.filter {
            Some(filter) => write!(f, "{field} [{filter}]: {}", self.message),
            None => write!(f, "{field}: {}", self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    /// Coerced copy of the input. Populated for every branch that
    /// succeeded, even when `valid` is false.
    pub output: Value,
}

#[derive(Debug, Default)]
struct Subtree {
    errors: Vec<ValidationError>,
    output: Map<String, Value>,
}

// ------------------------------- Validator -------------------------------- //

#[derive(Debug, Clone)]
pub struct Validator {
    schema: Schema,
    options: Options,
    filters: FilterRegistry,
}

impl Validator {
    pub fn new(schema: Schema) -> Self {
        Self::with_options(schema, Options::default())
    }

    pub fn with_options(schema: Schema, options: Options) -> Self {
        Self { schema, options, filters: FilterRegistry::with_builtins() }
    }

    pub fn from_value(schema: &Value, options: Options) -> Result<Self, SchemaError> {
        Ok(Self::with_options(Schema::from_value(schema)?, options))
    }

    pub fn register_filter<F>(&mut self, name: impl Into<String>, filter: F) -> Result<(), FilterConflictError>
    where
        F: Fn(&Value, &Value, &[Param], &str, &Schema, &Options) -> FilterResult + Send + Sync + 'static,
    {
        self.filters.register(name, filter)
    }

    pub fn register_filters<I>(&mut self, filters: I) -> Result<(), FilterConflictError>
    where
        I: IntoIterator<Item = NamedFilter>,
    {
        self.filters.register_all(filters)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn validate(&self, input: &Value) -> ValidationResult {
        let _span = tracing::debug_span!("validate").entered();

        let Value::Object(fields) = input else {
            let error = ValidationError::structural(&FieldPath::root(), "Input must be an object.".to_string());
            return ValidationResult { valid: false, errors: vec![error], output: Value::Object(Map::new()) };
        };

        let walk = Walk { validator: self, body: input };
        let tree = walk.object(self.schema.fields(), fields, &FieldPath::root());
        tracing::debug!(errors = tree.errors.len(), "validation finished");

        ValidationResult {
            valid: tree.errors.is_empty(),
            errors: tree.errors,
            output: Value::Object(tree.output),
        }
    }
}

// --------------------------------- Walk ----------------------------------- //

/// One `validate` call: the validator plus the full input document.
struct Walk<'a> {
    validator: &'a Validator,
    body: &'a Value,
}

impl Walk<'_> {
    fn object(
        &self,
        schema: &IndexMap<String, SchemaNode>,
        input: &Map<String, Value>,
        path: &FieldPath,
    ) -> Subtree {
        let mut tree = Subtree::default();

        for (key, value) in input {
            if !self.validator.options.additional_properties && !schema.contains_key(key) {
                tree.errors.push(ValidationError::additional_property(&path.key(key)));
                continue;
            }
            tree.output.insert(key.clone(), value.clone());
        }

        for (key, node) in schema {
            let field = path.key(key);
            match node {
                SchemaNode::Nested(children) => {
                    self.nested(children, input.get(key), key, &field, &mut tree);
                }
                SchemaNode::Leaf(expression) => {
                    let present = get_at_path(self.body, &field);
                    tracing::debug!(field = %field, value = ?present, "validating");
                    match self.leaf(expression, present, &field) {
                        Ok(value) if present.is_some() => {
                            tree.output.insert(key.clone(), value);
                        }
                        Ok(_) => {}
                        Err(error) => tree.errors.push(error),
                    }
                }
            }
        }

        tree
    }

    fn nested(
        &self,
        children: &IndexMap<String, SchemaNode>,
        value: Option<&Value>,
        key: &str,
        field: &FieldPath,
        tree: &mut Subtree,
    ) {
        match value {
            Some(Value::Object(child)) => {
                let sub = self.object(children, child, field);
                tree.errors.extend(sub.errors);
                tree.output.insert(key.to_string(), Value::Object(sub.output));
            }
            // absent: still walk so nested `required` leaves report
            None => {
                let sub = self.object(children, &Map::new(), field);
                tree.errors.extend(sub.errors);
            }
            Some(_) => {
                tree.errors.push(ValidationError::structural(field, format!("Field {field} must be an object.")));
            }
        }
    }

    /// Reduce the leaf's chain over the input value. The first failing
    /// filter stops the chain.
    fn leaf(&self, expression: &str, present: Option<&Value>, field: &FieldPath) -> Result<Value, ValidationError> {
        let chain = expr::parse(expression)
            .map_err(|err| ValidationError::structural(field, err.to_string()))?;
        tracing::trace!(field = %field, chain = ?chain, "compiled");

        let field_name = field.to_string();
        let initial = present.cloned().unwrap_or(Value::Null);
        chain.iter().try_fold(initial, |value, invocation| {
            self.invoke(invocation, value, field, &field_name)
                .map_err(|err| ValidationError::from_filter(&field_name, &invocation.name, &err))
        })
    }

    fn invoke(
        &self,
        invocation: &FilterInvocation,
        value: Value,
        field: &FieldPath,
        field_name: &str,
    ) -> Result<Value, FilterError> {
        let Validator { schema, options, filters } = self.validator;
        let Some(filter) = filters.get(&invocation.name) else {
            tracing::warn!(filter = %invocation.name, field = %field_name, "unknown filter");
            return Err(FilterError::Unknown { name: invocation.name.clone() });
        };
        tracing::trace!(
            filter = %invocation.name,
            params = ?invocation.params,
            pipe = invocation.pipe,
            array = invocation.array,
            "applying filter"
        );

        if !invocation.array {
            let returned = filter(&value, self.body, &invocation.params, field_name, schema, options)?;
            return Ok(match returned {
                Some(next) if invocation.pipe => next,
                _ => value,
            });
        }

        let items = match value {
            Value::Array(items) => items,
            // absent leaves arrive as null and fail here too
            _ => {
                return Err(FilterError::type_error("array", format!("Field {field_name} must be an array.")));
            }
        };

        let mut returned_any = false;
        let mut piped = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let element = field.index(index).to_string();
            match filter(item, self.body, &invocation.params, &element, schema, options)? {
                Some(next) => {
                    returned_any = true;
                    piped.push(next);
                }
                None => piped.push(item.clone()),
            }
        }

        Ok(Value::Array(if invocation.pipe && returned_any { piped } else { items }))
    }
}
