//! Runs every `cases/*.json` file through the validator and compares the
//! result against the case's expectations.
//!
//! A case names the custom filters it needs from [`catalog`]; expectations
//! list `(field, filter)` pairs rather than full messages.
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use jvalid::path_de::from_str_with_path;
use jvalid::{
    get_at_path, FieldPath, FilterError, FilterResult, NamedFilter, Options, Param, Schema, Validator,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Case {
    name: String,
    schema: Value,
    #[serde(default)]
    options: Options,
    #[serde(default)]
    filters: Vec<String>,
    input: Value,
    expect: Expect,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Expect {
    valid: bool,
    #[serde(default)]
    errors: Vec<ExpectedError>,
    output: Option<Value>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct ExpectedError {
    field: String,
    filter: Option<String>,
}

// ------------------------------ Filters ----------------------------------- //

fn catalog(name: &str) -> Option<NamedFilter> {
    let filter = match name {
        "name" => NamedFilter::new(name, person_name),
        "onlyIf" => NamedFilter::new(name, only_if),
        "math" => NamedFilter::new(name, math),
        _ => return None,
    };
    Some(filter)
}

fn person_name(value: &Value, _: &Value, _: &[Param], field: &str, _: &Schema, _: &Options) -> FilterResult {
    match value {
        Value::Null => Err(FilterError::required(field)),
        Value::String(s) if s.is_empty() => Err(FilterError::required(field)),
        Value::String(s) if s.chars().count() > 30 => {
            Err(FilterError::invalid(format!("{field} cannot be greater than 30 characters.")))
        }
        Value::String(_) => Ok(None),
        _ => Err(FilterError::type_error("string", format!("{field} must be a string."))),
    }
}

/// Require the field named by the first param whenever this one is set.
fn only_if(value: &Value, body: &Value, params: &[Param], field: &str, _: &Schema, _: &Options) -> FilterResult {
    let Some(other) = params.first().and_then(Param::as_str) else { return Ok(None) };
    let filled = get_at_path(body, &FieldPath::parse(other)).is_some_and(|v| !v.is_null());
    if !value.is_null() && !filled {
        return Err(FilterError::invalid(format!("{field} requires {other} to be filled out.")));
    }
    Ok(None)
}

/// `math('*', 2, 2)`: fold the numeric args into the value with the operator.
fn math(value: &Value, _: &Value, params: &[Param], field: &str, _: &Schema, _: &Options) -> FilterResult {
    let Some((operator, args)) = params.split_first() else { return Ok(None) };
    let Some(mut total) = value.as_f64() else {
        return Err(FilterError::type_error("number", format!("{field} must be a number.")));
    };
    for arg in args.iter().filter_map(Param::as_f64) {
        total = match operator.as_str() {
            Some("*") => total * arg,
            Some("/") => total / arg,
            Some("+") => total + arg,
            Some("-") => total - arg,
            _ => return Err(FilterError::invalid(format!("Operator '{operator}' is not supported."))),
        };
    }
    Ok(Some(Value::from(total)))
}

// ------------------------------- Runner ----------------------------------- //

fn load_case(path: &Path) -> Result<Case> {
    let source = std::fs::read_to_string(path)?;
    Ok(from_str_with_path::<Case>(&source)?)
}

fn run_case(case: &Case) -> Result<Vec<String>> {
    let mut validator = Validator::from_value(&case.schema, case.options)?;
    let filters = case
        .filters
        .iter()
        .map(|name| catalog(name).with_context(|| format!("no catalog filter named {name}")))
        .collect::<Result<Vec<_>>>()?;
    validator.register_filters(filters)?;

    let result = validator.validate(&case.input);
    let mut failures = Vec::new();

    if result.valid != case.expect.valid {
        failures.push(format!("valid: expected {}, got {}", case.expect.valid, result.valid));
    }
    let actual: Vec<ExpectedError> = result
        .errors
        .iter()
        .map(|e| ExpectedError { field: e.field.clone(), filter: e.filter.clone() })
        .collect();
    if actual != case.expect.errors {
        failures.push(format!("errors: expected {:?}, got {:?}", case.expect.errors, result.errors));
    }
    if let Some(output) = &case.expect.output {
        if output != &result.output {
            failures.push(format!("output: expected {output}, got {}", result.output));
        }
    }
    Ok(failures)
}

fn case_paths() -> Result<Vec<PathBuf>> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("cases");
    let mut paths = std::fs::read_dir(&dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.retain(|p| p.extension().is_some_and(|ext| ext == "json"));
    paths.sort();
    Ok(paths)
}

fn main() -> Result<ExitCode> {
    let mut failed = 0usize;
    let paths = case_paths()?;
    for path in &paths {
        let label = path.display();
        let case = load_case(path).with_context(|| format!("failed to load case {label}"))?;
        match run_case(&case) {
            Ok(failures) if failures.is_empty() => eprintln!("✅ {}", case.name),
            Ok(failures) => {
                failed += 1;
                eprintln!("❌ {} ({label})", case.name);
                for failure in failures {
                    eprintln!("   {failure}");
                }
            }
            Err(error) => {
                failed += 1;
                eprintln!("❌ {} ({label}): {error:#}", case.name);
            }
        }
    }
    eprintln!("{} cases, {failed} failed", paths.len());
    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
