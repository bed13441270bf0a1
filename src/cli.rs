//! Minimal CLI: validate documents against a schema, or inspect how a
//! filter expression compiles.
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use jvalid::path_de::from_slice_with_path;
use jvalid::{Options, Schema, ValidationResult, Validator};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON/NDJSON documents against a filter-expression schema
#[derive(Parser, Debug)]
#[command(name = "jvalid", version, about)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate documents and print a JSON report
    Validate(ValidateOut),
    /// compile a filter expression and print its invocation chain
    Parse(ParseOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct ValidateOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// schema .json file
    #[arg(short, long)]
    schema: PathBuf,

    /// options .json file (`additionalProperties`, `typeCoercion`)
    #[arg(long)]
    options: Option<PathBuf>,

    /// allow (and keep) keys the schema doesn't name
    #[arg(long)]
    additional_properties: bool,

    /// disable type coercion in the type filters
    #[arg(long)]
    strict_types: bool,

    /// output .json report (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct ParseOut {
    /// filter expression, e.g. 'number[]|max[](2020)|max(3)'
    expression: String,
}

/// One input document, labelled with where it came from.
#[derive(Debug, Clone, PartialEq)]
struct Document {
    source: String,
    value: Value,
}

#[derive(Debug, Serialize)]
struct DocumentReport<'a> {
    source: &'a str,
    #[serde(flatten)]
    result: ValidationResult,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        let mut documents = Vec::new();
        for source_path in source_paths {
            let label = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file ({label})"))?;
            for document in parse_documents(&label, &source, self.ndjson)? {
                documents.extend(self.preprocess(document)?);
            }
        }
        Ok(documents)
    }

    fn preprocess(&self, document: Document) -> Result<Vec<Document>> {
        let Document { source, value } = document;
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(pointer) => match value.pointer(pointer) {
                Some(node) => node.clone(),
                None => bail!("JSON pointer {pointer} matched nothing in {source}"),
            },
        };
        let Some(jq_expr) = self.jq_expr.as_deref() else {
            return Ok(vec![Document { source, value }]);
        };
        let outputs = crate::jq_exec::run_jaq(jq_expr, &value)
            .with_context(|| format!("failed to apply jq expression to {source}"))?;
        let many = outputs.len() > 1;
        Ok(outputs
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let source = if many { format!("{source}[{i}]") } else { source.clone() };
                Document { source, value }
            })
            .collect())
    }
}

impl ValidateOut {
    fn options(&self) -> Result<Options> {
        let mut options = match self.options.as_ref() {
            None => Options::default(),
            Some(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("failed to read options file ({})", path.display()))?;
                from_slice_with_path::<Options>(&bytes)
                    .with_context(|| format!("invalid options file ({})", path.display()))?
            }
        };
        if self.additional_properties {
            options.additional_properties = true;
        }
        if self.strict_types {
            options.type_coercion = false;
        }
        Ok(options)
    }

    fn validator(&self) -> Result<Validator> {
        let source = std::fs::read_to_string(&self.schema)
            .with_context(|| format!("failed to read schema file ({})", self.schema.display()))?;
        let schema = Schema::from_json_str(&source)
            .with_context(|| format!("invalid schema ({})", self.schema.display()))?;
        Ok(Validator::with_options(schema, self.options()?))
    }

    /// Returns whether every document passed.
    fn run(&self) -> Result<bool> {
        let validator = self.validator()?;
        if validator.schema().is_empty() {
            tracing::warn!(schema = %self.schema.display(), "schema declares no fields");
        }
        let documents = self.input_settings.load_documents()?;
        tracing::info!(
            documents = documents.len(),
            options = ?validator.options(),
            filters = ?validator.filters().names().collect::<Vec<_>>(),
            "validating"
        );

        let reports: Vec<DocumentReport> = documents
            .par_iter()
            .map(|document| DocumentReport {
                source: &document.source,
                result: validator.validate(&document.value),
            })
            .collect();

        for report in &reports {
            print_summary(report);
        }

        let report_src = serde_json::to_string_pretty(&reports)?;
        match self.out.as_ref() {
            Some(out) => write_output(out, &report_src)?,
            None => println!("{report_src}"),
        }

        Ok(reports.iter().all(|report| report.result.valid))
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Validate(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(true);
                }
                target.run()
            }
            Command::Parse(target) => {
                let chain = jvalid::expr::parse(&target.expression)?;
                println!("{}", serde_json::to_string_pretty(&chain)?);
                Ok(true)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn parse_documents(label: &str, source: &str, ndjson: bool) -> Result<Vec<Document>> {
    if !ndjson {
        let value = serde_json::from_str::<Value>(source)
            .with_context(|| format!("failed to parse JSON source file ({label})"))?;
        return Ok(vec![Document { source: label.to_string(), value }]);
    }
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let source = format!("{label}:{}", index + 1);
            let value = serde_json::from_str::<Value>(line)
                .with_context(|| format!("failed to parse NDJSON line ({source})"))?;
            Ok(Document { source, value })
        })
        .collect()
}

fn print_summary(report: &DocumentReport) {
    if report.result.valid {
        eprintln!("{} {}", "✔".green().bold(), report.source);
        return;
    }
    let count = report.result.errors.len();
    let noun = if count == 1 { "error" } else { "errors" };
    eprintln!("{} {} ({count} {noun})", "✘".red().bold(), report.source);
    for error in &report.result.errors {
        eprintln!("    {}", error.to_string().dimmed());
    }
}

fn write_output(out: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if !has_glob_chars(pattern) {
            out.push(PathBuf::from(pattern));
            continue;
        }

        let before = out.len();
        for entry in glob::glob(pattern)? {
            out.push(entry?);
        }
        if out.len() == before {
            // explicit glob that matched nothing is an error
            bail!("glob pattern matched no files: {pattern}");
        }
    }

    Ok(out)
}
