use thiserror::Error;

/// Failure raised by a single filter while reducing a leaf.
///
/// These never escape [`crate::Validator::validate`]; the engine tags them
/// with the filter name and records them as [`crate::ValidationError`]s.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("{field} is required.")]
    Required { field: String },

    /// Value could not satisfy, or be coerced to, `expected`.
    #[error("{message}")]
    Type { expected: String, message: String },

    /// Bound violations and anything else a filter wants to report.
    #[error("{0}")]
    Invalid(String),

    #[error("Filter '{name}' is not registered.")]
    Unknown { name: String },
}

impl FilterError {
    pub fn required(field: impl Into<String>) -> Self {
        Self::Required { field: field.into() }
    }
    pub fn type_error(expected: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Type { expected: expected.into(), message: message.into() }
    }
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
    /// The `type` tag carried by type errors.
    pub fn expected_type(&self) -> Option<&str> {
        match self {
            Self::Type { expected, .. } => Some(expected),
            _ => None,
        }
    }
}

/// Registration-time name collision. Fatal to configuration, never
/// collected as a validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Filter with name '{name}' is already registered.")]
pub struct FilterConflictError {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("filter expression is empty")]
    Empty,

    #[error("pipe marker '>' has no preceding filter in `{expression}`")]
    LeadingPipe { expression: String },

    #[error("segment {index} of `{expression}` has no filter name")]
    MissingName { expression: String, index: usize },
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema root must be an object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("schema node at '{field}' must be a filter expression or an object, found {found}")]
    InvalidNode { field: String, found: &'static str },

    #[error("invalid filter expression at '{field}': {source}")]
    Expression {
        field: String,
        #[source]
        source: ExprError,
    },

    #[error("schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_message_names_the_field() {
        let err = FilterError::required("customField");
        assert_eq!(err.to_string(), "customField is required.");
    }

    #[test]
    fn type_error_keeps_tag_and_message() {
        let err = FilterError::type_error("customType", "customMessage");
        assert_eq!(err.expected_type(), Some("customType"));
        assert_eq!(err.to_string(), "customMessage");
        assert_eq!(FilterError::invalid("x").expected_type(), None);
    }

    #[test]
    fn conflict_message() {
        let err = FilterConflictError { name: "customFilterName".into() };
        assert_eq!(
            err.to_string(),
            "Filter with name 'customFilterName' is already registered."
        );
    }
}
