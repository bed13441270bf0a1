//! Field paths: dotted/bracketed addresses like `request.name.first` or
//! `numbers[2]`, used for error attribution and deep lookups.
use std::fmt;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut out = self.clone();
        out.segments.push(Segment::Key(key.into()));
        out
    }

    pub fn index(&self, index: usize) -> Self {
        let mut out = self.clone();
        out.segments.push(Segment::Index(index));
        out
    }

    /// Parse the textual form produced by `Display`.
    ///
    /// A bracket group that isn't a plain index (`a[x]`) is kept as part of
    /// the key.
    pub fn parse(source: &str) -> Self {
        let mut out = Self::root();
        if source.is_empty() {
            return out;
        }
        for part in source.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(at) => part.split_at(at),
                None => (part, ""),
            };
            let mut key = key.to_string();
            let mut indices = Vec::new();
            while let Some(inner) = rest.strip_prefix('[') {
                let Some(close) = inner.find(']') else { break };
                match inner[..close].parse::<usize>() {
                    Ok(index) => indices.push(index),
                    Err(_) => break,
                }
                rest = &inner[close + 1..];
            }
            if !rest.is_empty() {
                // unparsable tail: keep the whole part as a literal key
                key = part.to_string();
                indices.clear();
            }
            out.segments.push(Segment::Key(key));
            out.segments.extend(indices.into_iter().map(Segment::Index));
        }
        out
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Deep get. `None` when any segment is missing or addresses the wrong
/// kind of container.
pub fn get_at_path<'a>(root: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.segments.iter().try_fold(root, |node, segment| match (segment, node) {
        (Segment::Key(key), Value::Object(map)) => map.get(key),
        (Segment::Index(index), Value::Array(items)) => items.get(*index),
        _ => None,
    })
}
