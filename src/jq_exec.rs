//! `--jq-expr` support: run a jq program over each input document before it
//! is validated. Every value the program emits becomes its own document.
use anyhow::{anyhow, Context, Result};
use jaq_core::{load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

pub fn run_jaq(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader
        .load(&arena, program)
        .map_err(|errs| program_error(filter_src, errs, |err| vec![format!("parse error: {err:?}")]))?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(|errs| {
            program_error(filter_src, errs, |list| {
                list.into_iter().map(|(name, undef)| format!("undefined `{name}`: {undef:?}")).collect()
            })
        })?;

    let inputs = RcIter::new(core::iter::empty());
    let outputs = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut documents = Vec::new();
    for item in outputs {
        let val = item.map_err(|e| anyhow!(format!("{e:?}")))?;
        // Val: Display -> JSON text
        let text = val.to_string();
        let document = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("jq produced non-JSON output: {text}"))?;
        documents.push(document);
    }
    Ok(documents)
}

/// Collapse jaq's per-file diagnostics into one error naming the program.
fn program_error<E>(
    program: &str,
    errs: Vec<(load::File<&str, ()>, E)>,
    describe: impl Fn(E) -> Vec<String>,
) -> anyhow::Error {
    let details: Vec<String> = errs.into_iter().flat_map(|(_, err)| describe(err)).collect();
    anyhow!("invalid jq program `{program}`: {}", details.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selects_documents() {
        let input = json!({ "items": [{ "age": "33" }, { "age": 50 }] });
        let out = run_jaq(".items[]", &input).unwrap();
        assert_eq!(out, vec![json!({ "age": "33" }), json!({ "age": 50 })]);
    }

    #[test]
    fn reports_parse_errors() {
        let err = run_jaq(".items[", &json!({})).unwrap_err().to_string();
        assert!(err.starts_with("invalid jq program `.items[`"), "{err}");
        assert!(err.contains("parse error"), "{err}");
    }

    #[test]
    fn reports_undefined_names() {
        let err = run_jaq("not_a_jq_builtin", &json!({})).unwrap_err().to_string();
        assert!(err.contains("undefined `not_a_jq_builtin`"), "{err}");
    }
}
