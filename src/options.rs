use serde::{Deserialize, Serialize};

use crate::path_de::{from_str_with_path, LoadError};

/// Per-validator configuration. Immutable once the validator is built and
/// handed to every filter by shared reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Options {
    /// Allow (and copy to output) input keys the schema doesn't name.
    pub additional_properties: bool,
    /// Let type filters convert values instead of rejecting mismatches.
    pub type_coercion: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { additional_properties: false, type_coercion: true }
    }
}

impl Options {
    pub fn from_json_str(src: &str) -> Result<Self, LoadError> {
        from_str_with_path(src)
    }
    pub fn with_additional_properties(mut self, allow: bool) -> Self {
        self.additional_properties = allow;
        self
    }
    pub fn with_type_coercion(mut self, coerce: bool) -> Self {
        self.type_coercion = coerce;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = Options::default();
        assert!(!options.additional_properties);
        assert!(options.type_coercion);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let options = Options::from_json_str(r#"{ "typeCoercion": false }"#).unwrap();
        assert_eq!(options, Options::default().with_type_coercion(false));
    }

    #[test]
    fn bad_field_reports_path() {
        let err = Options::from_json_str(r#"{ "additionalProperties": "yes" }"#).unwrap_err();
        assert_eq!(err.path, "additionalProperties");

        let err = Options::from_json_str(r#"{ "coerce": true }"#).unwrap_err();
        assert!(err.message.contains("coerce"), "{err}");
    }
}
