//! Schema tree: nested objects whose leaves are filter expressions.
//!
//! Leaf-vs-nested is decided once, when the schema is loaded, rather than by
//! inspecting input values during validation.
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::SchemaError;
use crate::expr;
use crate::path::FieldPath;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SchemaNode {
    Leaf(String),
    Nested(IndexMap<String, SchemaNode>),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Schema {
    root: IndexMap<String, SchemaNode>,
}

impl Schema {
    /// Build from a JSON object, checking every leaf expression compiles.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let Value::Object(map) = value else {
            return Err(SchemaError::NotAnObject { found: kind_name(value) });
        };
        let root = load_fields(map, &FieldPath::root())?;
        Ok(Self { root })
    }

    pub fn from_json_str(src: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(src)?;
        Self::from_value(&value)
    }

    pub fn fields(&self) -> &IndexMap<String, SchemaNode> {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&SchemaNode> {
        self.root.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

fn load_fields(
    map: &serde_json::Map<String, Value>,
    path: &FieldPath,
) -> Result<IndexMap<String, SchemaNode>, SchemaError> {
    let mut out = IndexMap::with_capacity(map.len());
    for (key, value) in map {
        let field = path.key(key);
        let node = match value {
            Value::String(expression) => {
                expr::parse(expression).map_err(|source| SchemaError::Expression {
                    field: field.to_string(),
                    source,
                })?;
                SchemaNode::Leaf(expression.clone())
            }
            Value::Object(children) => SchemaNode::Nested(load_fields(children, &field)?),
            other => {
                return Err(SchemaError::InvalidNode {
                    field: field.to_string(),
                    found: kind_name(other),
                });
            }
        };
        out.insert(key.clone(), node);
    }
    Ok(out)
}

/// JSON kind name used in messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExprError;
    use serde_json::json;

    #[test]
    fn loads_leaves_and_nested_nodes_in_order() {
        let schema = Schema::from_value(&json!({
            "firstName": "string|required|max(30)",
            "address": { "line1": "string|required", "line2": "string" },
        }))
        .unwrap();

        let keys: Vec<&String> = schema.fields().keys().collect();
        assert_eq!(keys, ["firstName", "address"]);
        assert_eq!(
            schema.get("firstName"),
            Some(&SchemaNode::Leaf("string|required|max(30)".into()))
        );
        let Some(SchemaNode::Nested(address)) = schema.get("address") else {
            panic!("address should be nested");
        };
        assert_eq!(address.len(), 2);
    }

    #[test]
    fn serializes_back_to_the_source_shape() {
        let source = json!({ "a": "string", "b": { "c": "number[]" } });
        let schema = Schema::from_value(&source).unwrap();
        assert_eq!(serde_json::to_value(&schema).unwrap(), source);
    }

    #[test]
    fn rejects_non_object_root() {
        let err = Schema::from_value(&json!(["string"])).unwrap_err();
        assert!(matches!(err, SchemaError::NotAnObject { found: "array" }));
    }

    #[test]
    fn rejects_non_string_leaf_with_path() {
        let err = Schema::from_value(&json!({ "a": { "b": 5 } })).unwrap_err();
        match err {
            SchemaError::InvalidNode { field, found } => {
                assert_eq!(field, "a.b");
                assert_eq!(found, "number");
            }
            other => panic!("Expected InvalidNode, got: {other}"),
        }
    }

    #[test]
    fn rejects_bad_expression_with_path() {
        let err = Schema::from_json_str(r#"{ "request": { "name": ">string" } }"#).unwrap_err();
        match err {
            SchemaError::Expression { field, source } => {
                assert_eq!(field, "request.name");
                assert!(matches!(source, ExprError::LeadingPipe { .. }));
            }
            other => panic!("Expected Expression, got: {other}"),
        }
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(Schema::from_json_str("{"), Err(SchemaError::Json(_))));
    }
}
