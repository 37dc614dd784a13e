//! YAML loading with source positions.
//!
//! The first document of a file is turned into a JSON value for schema
//! evaluation, alongside an index from JSON pointer to the source range of the
//! node at that pointer.

use crate::types::{Diagnostic, Position, Range};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use tracing::warn;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

/// YAML dialect used to resolve plain scalars
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum YamlVersion {
    V1_1,
    #[default]
    V1_2,
}

impl YamlVersion {
    pub fn parse(version: Option<&str>) -> Self {
        match version.map(str::trim) {
            None | Some("") => Self::default(),
            Some("1.1") => Self::V1_1,
            Some("1.2") => Self::V1_2,
            Some(other) => {
                warn!("Unknown YAML version '{}', using 1.2", other);
                Self::default()
            }
        }
    }
}

/// A syntax error reported by the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub position: Position,
}

impl SyntaxError {
    pub fn into_diagnostic(self) -> Diagnostic {
        Diagnostic {
            message: self.message,
            range: Range::new(self.position, self.position),
        }
    }
}

/// A loaded YAML document
#[derive(Debug)]
pub struct Document {
    pub value: Value,
    locations: HashMap<String, Range>,
}

impl Document {
    /// Load the first document in `source`; `Ok(None)` if there is none
    pub fn parse(source: &str, version: YamlVersion) -> Result<Option<Self>, SyntaxError> {
        let mut parser = Parser::new_from_str(source);
        let mut loader = Loader::new(source, version);

        parser.load(&mut loader, false).map_err(|e| SyntaxError {
            message: e.to_string(),
            position: position(e.marker()),
        })?;

        if loader.empty_root {
            return Ok(None);
        }
        Ok(loader.root.map(|value| Self {
            value,
            locations: loader.locations,
        }))
    }

    /// Range of the node at `pointer`, or of its closest located ancestor
    pub fn locate(&self, pointer: &str) -> Range {
        let mut current = pointer;
        loop {
            if let Some(range) = self.locations.get(current) {
                return *range;
            }
            match current.rfind('/') {
                Some(idx) => current = &current[..idx],
                None => return Range::default(),
            }
        }
    }
}

/// Markers count lines from 1 and columns from 0; positions count both from 1
fn position(marker: &Marker) -> Position {
    Position::new(marker.line() as u32, marker.col() as u32 + 1)
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

enum Frame {
    Sequence {
        /// None when the sequence is used as a mapping key
        pointer: Option<String>,
        start: Marker,
        anchor: usize,
        items: Vec<Value>,
    },
    Mapping {
        pointer: Option<String>,
        start: Marker,
        anchor: usize,
        entries: Map<String, Value>,
        pending_key: Option<String>,
    },
}

struct Loader {
    /// Source text, indexed like `Marker::index`
    source: Vec<char>,
    version: YamlVersion,
    stack: Vec<Frame>,
    anchors: HashMap<usize, Value>,
    locations: HashMap<String, Range>,
    root: Option<Value>,
    /// Set when the document is an explicit but empty node, as in `---\n`
    empty_root: bool,
}

impl Loader {
    fn new(source: &str, version: YamlVersion) -> Self {
        Self {
            source: source.chars().collect(),
            version,
            stack: Vec::new(),
            anchors: HashMap::new(),
            locations: HashMap::new(),
            root: None,
            empty_root: false,
        }
    }

    /// Pointer of the next node, or None if the next node is a mapping key
    fn child_pointer(&self) -> Option<String> {
        match self.stack.last() {
            None => Some(String::new()),
            Some(Frame::Sequence { pointer, items, .. }) => pointer
                .as_ref()
                .map(|p| format!("{}/{}", p, items.len())),
            Some(Frame::Mapping {
                pointer,
                pending_key,
                ..
            }) => match (pointer, pending_key) {
                (Some(p), Some(key)) => Some(format!("{}/{}", p, escape_pointer(key))),
                _ => None,
            },
        }
    }

    fn complete(&mut self, value: Value, anchor: usize) {
        if anchor != 0 {
            self.anchors.insert(anchor, value.clone());
        }

        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(value);
                }
            }
            Some(Frame::Sequence { items, .. }) => items.push(value),
            Some(Frame::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                Some(key) => {
                    entries.insert(key, value);
                }
                None => *pending_key = Some(key_string(value)),
            },
        }
    }

    fn scalar_range(&self, marker: &Marker, value: &str, style: &TScalarStyle) -> Range {
        let start = position(marker);
        let width = match style {
            TScalarStyle::Plain if !value.contains('\n') => Some(value.chars().count()),
            TScalarStyle::SingleQuoted => self.quoted_width(marker.index(), '\''),
            TScalarStyle::DoubleQuoted => self.quoted_width(marker.index(), '"'),
            _ => None,
        };

        let Some(width) = width else {
            return Range::new(start, Position::unknown());
        };
        let end = Position {
            line: start.line,
            character: start.character.map(|c| c + width as u32),
        };
        Range::new(start, end)
    }

    /// Source width of the quoted scalar opening at `index`, quotes included.
    /// None if it does not close on the same line.
    fn quoted_width(&self, index: usize, quote: char) -> Option<usize> {
        let mut chars = self.source.get(index..)?.iter();
        if chars.next() != Some(&quote) {
            return None;
        }

        let mut width = 1;
        while let Some(&c) = chars.next() {
            width += 1;
            match c {
                '\n' | '\r' => return None,
                '\\' if quote == '"' => {
                    if matches!(chars.next()?, '\n' | '\r') {
                        return None;
                    }
                    width += 1;
                }
                // '' is an escaped quote inside single quotes
                '\'' if quote == '\'' && chars.as_slice().first() == Some(&'\'') => {
                    chars.next();
                    width += 1;
                }
                c if c == quote => return Some(width),
                _ => {}
            }
        }
        None
    }
}

impl MarkedEventReceiver for Loader {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        match ev {
            Event::Scalar(text, style, anchor, _tag) => {
                if self.stack.is_empty()
                    && self.root.is_none()
                    && text.is_empty()
                    && matches!(style, TScalarStyle::Plain)
                {
                    self.empty_root = true;
                }
                if let Some(pointer) = self.child_pointer() {
                    let range = self.scalar_range(&marker, &text, &style);
                    self.locations.insert(pointer, range);
                }
                let value = if matches!(style, TScalarStyle::Plain) {
                    resolve_plain(&text, self.version)
                } else {
                    Value::String(text)
                };
                self.complete(value, anchor);
            }
            Event::Alias(anchor) => {
                if let Some(pointer) = self.child_pointer() {
                    let start = position(&marker);
                    self.locations.insert(pointer, Range::new(start, start));
                }
                let value = self.anchors.get(&anchor).cloned().unwrap_or(Value::Null);
                self.complete(value, 0);
            }
            Event::SequenceStart(anchor, _tag) => {
                let pointer = self.child_pointer();
                self.stack.push(Frame::Sequence {
                    pointer,
                    start: marker,
                    anchor,
                    items: Vec::new(),
                });
            }
            Event::MappingStart(anchor, _tag) => {
                let pointer = self.child_pointer();
                self.stack.push(Frame::Mapping {
                    pointer,
                    start: marker,
                    anchor,
                    entries: Map::new(),
                    pending_key: None,
                });
            }
            Event::SequenceEnd | Event::MappingEnd => {
                let Some(frame) = self.stack.pop() else {
                    return;
                };
                let (pointer, start, anchor, value) = match frame {
                    Frame::Sequence {
                        pointer,
                        start,
                        anchor,
                        items,
                    } => (pointer, start, anchor, Value::Array(items)),
                    Frame::Mapping {
                        pointer,
                        start,
                        anchor,
                        entries,
                        ..
                    } => (pointer, start, anchor, Value::Object(entries)),
                };
                if let Some(pointer) = pointer {
                    let range = Range::new(position(&start), position(&marker));
                    self.locations.insert(pointer, range);
                }
                self.complete(value, anchor);
            }
            _ => {}
        }
    }
}

/// JSON object keys are strings; non-string keys use their JSON text
fn key_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Resolve an untagged plain scalar per the YAML dialect
fn resolve_plain(text: &str, version: YamlVersion) -> Value {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return Value::Null,
        "true" | "True" | "TRUE" => return Value::Bool(true),
        "false" | "False" | "FALSE" => return Value::Bool(false),
        _ => {}
    }

    if version == YamlVersion::V1_1 {
        match text {
            "y" | "Y" | "yes" | "Yes" | "YES" | "on" | "On" | "ON" => return Value::Bool(true),
            "n" | "N" | "no" | "No" | "NO" | "off" | "Off" | "OFF" => return Value::Bool(false),
            _ => {}
        }
    }

    if let Some(n) = resolve_int(text, version) {
        return Value::Number(n.into());
    }

    resolve_float(text, version).unwrap_or_else(|| Value::String(text.to_string()))
}

fn resolve_int(text: &str, version: YamlVersion) -> Option<i64> {
    let cleaned;
    let text = if version == YamlVersion::V1_1 {
        cleaned = text.replace('_', "");
        cleaned.as_str()
    } else {
        text
    };

    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let signed = digits.len() != text.len();
    let (radix, body) = if let Some(hex) = digits.strip_prefix("0x") {
        (16, hex)
    } else if let Some(oct) = digits.strip_prefix("0o").filter(|_| version == YamlVersion::V1_2) {
        (8, oct)
    } else if let Some(bin) = digits.strip_prefix("0b").filter(|_| version == YamlVersion::V1_1) {
        (2, bin)
    } else if version == YamlVersion::V1_1 && digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };

    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    // 1.2 only signs decimal integers
    if signed && radix != 10 && version == YamlVersion::V1_2 {
        return None;
    }
    let magnitude = i64::from_str_radix(body, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn resolve_float(text: &str, version: YamlVersion) -> Option<Value> {
    let unsigned = text.trim_start_matches(['-', '+']);
    if matches!(unsigned, ".inf" | ".Inf" | ".INF" | ".nan" | ".NaN" | ".NAN") {
        // Not representable in JSON; keep the literal text
        return Some(Value::String(text.to_string()));
    }

    let looks_numeric = unsigned.chars().any(|c| c.is_ascii_digit())
        && unsigned
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'));
    // 1.1 floats always have a fraction point
    if !looks_numeric || (version == YamlVersion::V1_1 && !unsigned.contains('.')) {
        return None;
    }

    let parsed: f64 = text.parse().ok()?;
    Number::from_f64(parsed).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load(source: &str) -> Document {
        Document::parse(source, YamlVersion::V1_2).unwrap().unwrap()
    }

    #[test]
    fn test_parse_to_json() {
        let doc = load("name: app\nport: 8080\nratio: 0.5\nenabled: true\ntags:\n  - a\n  - 'b'\nnothing: ~\n");
        assert_eq!(
            doc.value,
            json!({
                "name": "app",
                "port": 8080,
                "ratio": 0.5,
                "enabled": true,
                "tags": ["a", "b"],
                "nothing": null
            })
        );
    }

    #[test]
    fn test_quoted_scalars_stay_strings() {
        let doc = load("a: '1'\nb: \"true\"\n");
        assert_eq!(doc.value, json!({ "a": "1", "b": "true" }));
    }

    #[test]
    fn test_version_changes_booleans() {
        let source = "flag: yes\nmode: 0755\n";
        let v12 = Document::parse(source, YamlVersion::V1_2).unwrap().unwrap();
        assert_eq!(v12.value, json!({ "flag": "yes", "mode": 755 }));

        let v11 = Document::parse(source, YamlVersion::V1_1).unwrap().unwrap();
        assert_eq!(v11.value, json!({ "flag": true, "mode": 493 }));
    }

    #[test]
    fn test_int_forms() {
        assert_eq!(resolve_plain("0x1F", YamlVersion::V1_2), json!(31));
        assert_eq!(resolve_plain("0o17", YamlVersion::V1_2), json!(15));
        assert_eq!(resolve_plain("-42", YamlVersion::V1_2), json!(-42));
        assert_eq!(resolve_plain("1_000", YamlVersion::V1_1), json!(1000));
        assert_eq!(resolve_plain("1_000", YamlVersion::V1_2), json!("1_000"));
    }

    #[test]
    fn test_dialect_number_edges() {
        assert_eq!(resolve_plain("08", YamlVersion::V1_1), json!("08"));
        assert_eq!(resolve_plain("08", YamlVersion::V1_2), json!(8));
        assert_eq!(resolve_plain("1e3", YamlVersion::V1_1), json!("1e3"));
        assert_eq!(resolve_plain("1.5", YamlVersion::V1_1), json!(1.5));
        assert_eq!(resolve_plain("-0x1F", YamlVersion::V1_2), json!("-0x1F"));
        assert_eq!(resolve_plain("-0x1F", YamlVersion::V1_1), json!(-31));
        assert_eq!(resolve_plain("+0o17", YamlVersion::V1_2), json!("+0o17"));
    }

    #[test]
    fn test_non_numeric_words_stay_strings() {
        assert_eq!(resolve_plain("inf", YamlVersion::V1_2), json!("inf"));
        assert_eq!(resolve_plain("NaN", YamlVersion::V1_2), json!("NaN"));
        assert_eq!(resolve_plain(".inf", YamlVersion::V1_2), json!(".inf"));
        assert_eq!(resolve_plain("1.2.3", YamlVersion::V1_2), json!("1.2.3"));
        assert_eq!(resolve_plain("-", YamlVersion::V1_2), json!("-"));
    }

    #[test]
    fn test_anchors_and_aliases() {
        let doc = load("base: &b\n  x: 1\ncopy: *b\n");
        assert_eq!(doc.value["copy"], json!({ "x": 1 }));
    }

    #[test]
    fn test_empty_document() {
        assert!(Document::parse("", YamlVersion::V1_2).unwrap().is_none());
        assert!(Document::parse("# only a comment\n", YamlVersion::V1_2).unwrap().is_none());
        assert!(Document::parse("---\n", YamlVersion::V1_2).unwrap().is_none());
        assert!(Document::parse("--- # nothing\n...\n", YamlVersion::V1_2).unwrap().is_none());
    }

    #[test]
    fn test_explicit_null_document_is_not_empty() {
        let doc = load("~\n");
        assert_eq!(doc.value, Value::Null);
    }

    #[test]
    fn test_syntax_error() {
        let err = Document::parse("a: b: c\n", YamlVersion::V1_2).unwrap_err();
        assert!(!err.message.is_empty());
        assert!(err.position.line.is_some());

        assert_eq!(err.position.line, Some(1));

        let diagnostic = err.into_diagnostic();
        assert_eq!(diagnostic.range.start, diagnostic.range.end);
    }

    #[test]
    fn test_locations_are_one_based() {
        let doc = load("name: api\nport: eighty\n");
        assert_eq!(
            doc.locate("/name"),
            Range::new(Position::new(1, 7), Position::new(1, 10))
        );
        assert_eq!(
            doc.locate("/port"),
            Range::new(Position::new(2, 7), Position::new(2, 13))
        );
    }

    #[test]
    fn test_quoted_scalar_width_follows_source() {
        let doc = load("a: \"a\\tb\"\nb: 'it''s'\nc: \"x\\\"y\"\n");
        assert_eq!(doc.value["a"], json!("a\tb"));
        assert_eq!(doc.value["b"], json!("it's"));

        let width = |r: Range| r.end.character.unwrap() - r.start.character.unwrap();
        assert_eq!(width(doc.locate("/a")), 6);
        assert_eq!(width(doc.locate("/b")), 7);
        assert_eq!(width(doc.locate("/c")), 6);
    }

    #[test]
    fn test_multi_line_quoted_scalar_has_unknown_end() {
        let doc = load("a: \"one\n  two\"\n");
        assert_eq!(doc.value["a"], json!("one two"));
        assert_eq!(doc.locate("/a").end, Position::unknown());
    }

    #[test]
    fn test_scalar_locations_are_single_line() {
        let doc = load("first: 1\nsecond: hello\n");
        let first = doc.locate("/first");
        let second = doc.locate("/second");

        assert!(first.single_line().is_some());
        assert!(second.single_line().is_some());
        assert_eq!(second.start.line, first.start.line.map(|l| l + 1));

        let width = second.end.character.unwrap() - second.start.character.unwrap();
        assert_eq!(width, "hello".len() as u32);
    }

    #[test]
    fn test_quoted_scalar_width_includes_quotes() {
        let doc = load("key: 'abc'\n");
        let range = doc.locate("/key");
        assert_eq!(range.end.character.unwrap() - range.start.character.unwrap(), 5);
    }

    #[test]
    fn test_block_scalar_has_unknown_end() {
        let doc = load("text: |\n  one\n  two\n");
        let range = doc.locate("/text");
        assert!(range.start.line.is_some());
        assert_eq!(range.end, Position::unknown());
        assert!(range.single_line().is_none());
    }

    #[test]
    fn test_sequence_item_pointer() {
        let doc = load("items:\n  - a\n  - b\n");
        let first = doc.locate("/items/0");
        let second = doc.locate("/items/1");
        assert_eq!(second.start.line, first.start.line.map(|l| l + 1));
    }

    #[test]
    fn test_locate_falls_back_to_ancestor() {
        let doc = load("outer:\n  inner: 1\n");
        assert_eq!(doc.locate("/outer/missing"), doc.locate("/outer"));
        assert_eq!(doc.locate("/nope"), doc.locate(""));
    }

    #[test]
    fn test_pointer_escaping() {
        let doc = load("\"a/b\": 1\n\"c~d\": 2\n");
        assert!(doc.locate("/a~1b").single_line().is_some());
        assert_ne!(doc.locate("/a~1b"), doc.locate("/c~0d"));
    }
}
