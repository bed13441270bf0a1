//! Declarative, schema-driven validation and coercion of JSON documents.
//!
//! A schema is a nested JSON object whose leaves are filter expressions:
//!
//! ```text
//! { "name": "string|required|max(15)", "tags": "string[]|max(3)" }
//! ```
//!
//! [`Validator::validate`] walks the schema against an input document,
//! runs each leaf's filter chain, and returns a [`ValidationResult`] holding
//! the pass/fail flag, the field-level errors, and a coerced copy of the
//! input.
pub mod error;
pub mod expr;
pub mod filters;
pub mod options;
pub mod path;
pub mod path_de;
pub mod schema;
pub mod validator;

pub use error::{ExprError, FilterConflictError, FilterError, SchemaError};
pub use expr::{FilterInvocation, Param};
pub use filters::{FilterFn, FilterRegistry, FilterResult, NamedFilter};
pub use options::Options;
pub use path::{get_at_path, FieldPath};
pub use schema::{Schema, SchemaNode};
pub use validator::{ValidationError, ValidationResult, Validator};
