use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// File glob pattern to schema reference(s), in insertion order
pub type SchemaMapping = IndexMap<String, SchemaRef>;

/// One schema reference or a list of them
///
/// Values of any other shape are carried through merging unchanged as `Other`
/// and refer to no schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaRef {
    One(String),
    Many(Vec<String>),
    Other(serde_json::Value),
}

impl SchemaRef {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let refs: &[String] = match self {
            Self::One(r) => std::slice::from_ref(r),
            Self::Many(rs) => rs,
            Self::Other(_) => &[],
        };
        refs.iter().map(String::as_str)
    }
}

/// A position in a source file; either half may be unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<u32>,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self {
            line: Some(line),
            character: Some(character),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// The line both ends sit on, if both are known and equal
    pub fn single_line(&self) -> Option<u32> {
        match (self.start.line, self.end.line) {
            (Some(start), Some(end)) if start == end => Some(start),
            _ => None,
        }
    }
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub range: Range,
}

/// Outcome of validating one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// File path relative to the workspace root
    pub file_path: String,
    pub valid: bool,
    /// Diagnostics; may be absent or empty even when invalid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Diagnostic>>,
}

impl ValidationResult {
    pub fn valid(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            valid: true,
            results: None,
        }
    }

    pub fn invalid(file_path: impl Into<String>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            file_path: file_path.into(),
            valid: false,
            results: Some(diagnostics),
        }
    }

    /// Build from a diagnostic list: no diagnostics means valid
    pub fn from_diagnostics(file_path: impl Into<String>, diagnostics: Vec<Diagnostic>) -> Self {
        if diagnostics.is_empty() {
            Self::valid(file_path)
        } else {
            Self::invalid(file_path, diagnostics)
        }
    }
}

/// An annotation to surface on a file in the code-review view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRequest {
    pub file: String,
    pub message: String,
    /// Start line (1-indexed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    /// End line (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_column: Option<u32>,
}
