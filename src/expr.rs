//! Filter-expression compiler.
//!
//! A schema leaf such as `"number[]|max[](2020)|max(3)"` compiles into an
//! ordered list of [`FilterInvocation`]s:
//!
//! ```text
//! expression := segment ( "|" segment )*
//! segment    := [">"] name ["[]"] ["(" params ")"]
//! ```
//!
//! Parsing runs in two passes. Pass one tokenizes every segment on its own;
//! pass two resolves the `>` pipe markers (which flag the *previous*
//! invocation) and drops a bare trailing terminator segment. Malformed
//! parameter syntax never fails, it degrades to raw tokens.
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::ExprError;

/// Filters whose result always flows to the next filter.
pub const TYPE_FILTERS: [&str; 2] = ["string", "number"];

const PIPE_MARKER: char = '>';
const SEGMENT_SEPARATOR: char = '|';
const PARAM_SEPARATOR: char = ',';
const ARRAY_SUFFIX: &str = "[]";
const QUOTES: [char; 3] = ['\'', '"', '`'];

static NUMERIC_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").expect("numeric param regex")
});

// ------------------------------- Types ------------------------------------ //

/// Literal argument of a filter invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Param {
    Number(f64),
    /// Quoted literal with the quotes stripped.
    Str(String),
    /// Anything that was neither quoted nor numeric.
    Raw(String),
}

impl Param {
    /// Numeric view, parsing string forms the way a loose comparison would.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Str(s) | Self::Raw(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Str(s) | Self::Raw(s) => Some(s),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) | Self::Raw(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterInvocation {
    pub name: String,
    pub params: Vec<Param>,
    /// Replace the flowing value with this filter's return value.
    pub pipe: bool,
    /// Apply to every element of an array instead of the array itself.
    pub array: bool,
}

/// Pass-one output for a single `|`-separated segment.
#[derive(Debug, PartialEq)]
struct RawSegment {
    pipes_previous: bool,
    name: String,
    array: bool,
    params: Vec<Param>,
}

// ------------------------------- Compile ---------------------------------- //

pub fn parse(expression: &str) -> Result<Vec<FilterInvocation>, ExprError> {
    if expression.trim().is_empty() {
        return Err(ExprError::Empty);
    }

    let segments: Vec<RawSegment> = split_segments(expression)
        .into_iter()
        .map(tokenize_segment)
        .collect();
    let last = segments.len() - 1;

    let mut chain: Vec<FilterInvocation> = Vec::with_capacity(segments.len());
    for (index, segment) in segments.into_iter().enumerate() {
        if segment.pipes_previous {
            match chain.last_mut() {
                Some(previous) => previous.pipe = true,
                None => {
                    return Err(ExprError::LeadingPipe { expression: expression.to_string() });
                }
            }
        }

        if segment.name.is_empty() {
            // bare terminator: only forwards the previous result
            if index == last && !segment.array && segment.params.is_empty() {
                continue;
            }
            return Err(ExprError::MissingName { expression: expression.to_string(), index });
        }

        let pipe = TYPE_FILTERS.contains(&segment.name.as_str());
        chain.push(FilterInvocation {
            name: segment.name,
            params: segment.params,
            pipe,
            array: segment.array,
        });
    }

    Ok(chain)
}

// ------------------------------ Tokenize ---------------------------------- //

/// Split on `|` at parenthesis depth zero. Inside a parameter list, a quote
/// that opens a token hides `(`, `)` and `|` until it closes.
fn split_segments(expression: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut at_token_start = false;
    for (i, ch) in expression.char_indices() {
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '(' => {
                depth += 1;
                at_token_start = true;
                continue;
            }
            ')' => depth = depth.saturating_sub(1),
            PARAM_SEPARATOR if depth > 0 => {
                at_token_start = true;
                continue;
            }
            SEGMENT_SEPARATOR if depth == 0 => {
                out.push(&expression[start..i]);
                start = i + ch.len_utf8();
            }
            _ if depth > 0 && at_token_start && QUOTES.contains(&ch) => {
                quote = Some(ch);
            }
            _ => {}
        }
        if !ch.is_whitespace() {
            at_token_start = false;
        }
    }
    out.push(&expression[start..]);
    out
}

fn tokenize_segment(raw: &str) -> RawSegment {
    let trimmed = raw.trim();
    let (pipes_previous, rest) = match trimmed.strip_prefix(PIPE_MARKER) {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };

    let name_end = rest.find(['[', '(']).unwrap_or(rest.len());
    let name = rest[..name_end].trim().to_string();
    let mut tail = &rest[name_end..];

    let array = match tail.strip_prefix(ARRAY_SUFFIX) {
        Some(after) => {
            tail = after;
            true
        }
        None => false,
    };

    let params = match tail.trim_start().strip_prefix('(') {
        // an unclosed list still yields its contents
        Some(body) => parse_params(body.strip_suffix(')').unwrap_or(body)),
        None => Vec::new(),
    };

    RawSegment { pipes_previous, name, array, params }
}

fn parse_params(inner: &str) -> Vec<Param> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    split_params(inner).into_iter().map(parse_param).collect()
}

/// Split on `,` unless inside a quote that opened a token.
fn split_params(inner: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut at_token_start = true;
    for (i, ch) in inner.char_indices() {
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            continue;
        }
        if ch == PARAM_SEPARATOR {
            out.push(&inner[start..i]);
            start = i + ch.len_utf8();
            at_token_start = true;
            continue;
        }
        if at_token_start && QUOTES.contains(&ch) {
            quote = Some(ch);
        }
        if !ch.is_whitespace() {
            at_token_start = false;
        }
    }
    out.push(&inner[start..]);
    out
}

fn parse_param(token: &str) -> Param {
    let token = token.trim();
    if let Some(literal) = unquote(token) {
        return Param::Str(literal.to_string());
    }
    if NUMERIC_PARAM.is_match(token) {
        if let Ok(n) = token.parse::<f64>() {
            return Param::Number(n);
        }
    }
    Param::Raw(token.to_string())
}

fn unquote(token: &str) -> Option<&str> {
    let first = token.chars().next()?;
    if token.len() < 2 || !QUOTES.contains(&first) || !token.ends_with(first) {
        return None;
    }
    Some(&token[1..token.len() - 1])
}
