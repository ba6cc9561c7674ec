//! Typed view of a Jupyter notebook document.
//!
//! The raw JSON tree is converted once, at the boundary, into
//! [`NotebookDocument`] and [`Cell`]. Every field the sanitizers touch gets a
//! real type; everything else is carried through verbatim. Each mapping also
//! remembers the key order it was read with so serialization reproduces it.

use crate::error::{NotebookError, Result};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Top-level keys with a typed representation, in fallback output order
const DOCUMENT_FIELDS: [&str; 2] = ["cells", "metadata"];

/// Cell keys with a typed representation, in nbformat's own output order
const CELL_FIELDS: [&str; 5] = [
    "cell_type",
    "execution_count",
    "metadata",
    "outputs",
    "source",
];

/// A parsed notebook document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotebookDocument {
    /// Document-level metadata (`kernelspec`, `language_info`, ...)
    pub metadata: Option<Map<String, Value>>,
    /// Cells, in document order
    pub cells: Vec<Cell>,
    /// Untyped top-level keys (`nbformat`, `nbformat_minor`, ...)
    extra: Map<String, Value>,
    /// Top-level key order as read
    key_order: Vec<String>,
}

/// One notebook cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// Type of cell
    pub cell_type: CellType,
    /// Cell metadata mapping
    pub metadata: Map<String, Value>,
    /// Cell source, absent when the key is missing
    pub source: Option<Source>,
    /// Output records, opaque (code cells)
    pub outputs: Option<Vec<Value>>,
    /// Execution counter (code cells)
    pub execution_count: ExecutionCount,
    extra: Map<String, Value>,
    key_order: Vec<String>,
}

/// Type of notebook cell
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum CellType {
    /// Executable code cell
    #[default]
    Code,
    /// Markdown documentation cell
    Markdown,
    /// Raw text cell (no formatting)
    Raw,
    /// Any other type string, kept as-is
    Other(String),
}

impl CellType {
    /// The nbformat spelling of this cell type
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Code => "code",
            Self::Markdown => "markdown",
            Self::Raw => "raw",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for CellType {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for CellType {
    fn from(s: &str) -> Self {
        match s {
            "code" => Self::Code,
            "markdown" => Self::Markdown,
            "raw" => Self::Raw,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Serialize for CellType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Cell source text. nbformat allows either a list of lines or one string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Source {
    /// List of lines, each usually ending in `\n`
    Lines(Vec<String>),
    /// Single string
    Text(String),
}

impl Source {
    /// An empty list of lines
    #[inline]
    pub const fn empty() -> Self {
        Self::Lines(Vec::new())
    }

    /// True when there is no source text at all
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Lines(lines) => lines.iter().all(String::is_empty),
            Self::Text(text) => text.is_empty(),
        }
    }

    /// The full source as one string
    pub fn joined(&self) -> String {
        match self {
            Self::Lines(lines) => lines.concat(),
            Self::Text(text) => text.clone(),
        }
    }
}

/// Execution counter of a code cell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExecutionCount {
    /// Key not present
    #[default]
    Absent,
    /// `null`: the cell was never run
    Never,
    /// The cell ran as the n-th execution
    Count(i64),
    /// Any other non-null value, kept verbatim
    Other(Value),
}

impl ExecutionCount {
    /// True when the counter holds anything but `null`
    #[inline]
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Count(_) | Self::Other(_))
    }
}

impl NotebookDocument {
    /// Create a document from cells, with no metadata
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            ..Self::default()
        }
    }

    /// Set document metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Untyped top-level value, e.g. `nbformat`
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Validate a raw JSON tree and convert it into a document
    ///
    /// # Errors
    ///
    /// Returns [`NotebookError::Malformed`] if the top level is not a mapping,
    /// `cells` is missing or not a list, or a cell lacks `cell_type` or
    /// `metadata`.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(object) = value else {
            return Err(NotebookError::malformed("top level is not a mapping"));
        };

        let key_order: Vec<String> = object.keys().cloned().collect();
        let mut metadata = None;
        let mut cells = None;
        let mut extra = Map::new();

        for (key, value) in object {
            match key.as_str() {
                "cells" => {
                    let Value::Array(raw_cells) = value else {
                        return Err(NotebookError::malformed("\"cells\" is not a list"));
                    };
                    let parsed = raw_cells
                        .into_iter()
                        .enumerate()
                        .map(|(index, raw)| Cell::from_value(raw, index))
                        .collect::<Result<Vec<_>>>()?;
                    cells = Some(parsed);
                }
                "metadata" => {
                    let Value::Object(map) = value else {
                        return Err(NotebookError::malformed(
                            "document \"metadata\" is not a mapping",
                        ));
                    };
                    metadata = Some(map);
                }
                _ => {
                    extra.insert(key, value);
                }
            }
        }

        let cells = cells.ok_or_else(|| NotebookError::malformed("missing \"cells\""))?;

        Ok(Self {
            metadata,
            cells,
            extra,
            key_order,
        })
    }

    /// Serialize without any added whitespace
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_compact_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| NotebookError::malformed(format!("cannot serialize notebook: {e}")))
    }

    /// Serialize pretty-printed with `indent` spaces per nesting level and no
    /// trailing newline
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_pretty_json(&self, indent: usize) -> Result<Vec<u8>> {
        let indent = " ".repeat(indent);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)
            .map_err(|e| NotebookError::malformed(format!("cannot serialize notebook: {e}")))?;
        Ok(buf)
    }

    fn write_field<M: SerializeMap>(
        &self,
        map: &mut M,
        key: &str,
    ) -> std::result::Result<(), M::Error> {
        match key {
            "cells" => map.serialize_entry(key, &self.cells),
            "metadata" => match &self.metadata {
                Some(metadata) => map.serialize_entry(key, metadata),
                None => Ok(()),
            },
            other => match self.extra.get(other) {
                Some(value) => map.serialize_entry(other, value),
                None => Ok(()),
            },
        }
    }
}

impl Serialize for NotebookDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for key in &self.key_order {
            self.write_field(&mut map, key)?;
        }
        for key in DOCUMENT_FIELDS {
            if !self.key_order.iter().any(|k| k == key) {
                self.write_field(&mut map, key)?;
            }
        }
        map.end()
    }
}

impl Cell {
    /// Create a cell of the given type with empty metadata
    pub fn new(cell_type: CellType) -> Self {
        Self {
            cell_type,
            ..Self::default()
        }
    }

    /// Create a never-run code cell with the given source lines
    pub fn code<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: Some(Source::Lines(lines.into_iter().map(Into::into).collect())),
            outputs: Some(Vec::new()),
            execution_count: ExecutionCount::Never,
            ..Self::new(CellType::Code)
        }
    }

    /// Create a markdown cell with the given source lines
    pub fn markdown<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: Some(Source::Lines(lines.into_iter().map(Into::into).collect())),
            ..Self::new(CellType::Markdown)
        }
    }

    /// Set cell metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Untyped cell value, e.g. `id` or `attachments`. Typed keys whose
    /// value has an unexpected shape also end up here.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Replace the source, dropping any unparsed `source` value
    pub fn set_source(&mut self, source: Source) {
        self.extra.shift_remove("source");
        self.source = Some(source);
    }

    fn from_value(value: Value, index: usize) -> Result<Self> {
        let invalid = |reason: &str| NotebookError::malformed(format!("cell {index}: {reason}"));

        let Value::Object(object) = value else {
            return Err(invalid("not a mapping"));
        };

        let key_order: Vec<String> = object.keys().cloned().collect();
        let mut cell_type = None;
        let mut metadata = None;
        let mut source = None;
        let mut outputs = None;
        let mut execution_count = ExecutionCount::Absent;
        let mut extra = Map::new();

        for (key, value) in object {
            match key.as_str() {
                "cell_type" => match value {
                    Value::String(s) => cell_type = Some(CellType::from(s.as_str())),
                    _ => return Err(invalid("\"cell_type\" is not a string")),
                },
                "metadata" => match value {
                    Value::Object(map) => metadata = Some(map),
                    _ => return Err(invalid("\"metadata\" is not a mapping")),
                },
                "source" => match parse_source(&value) {
                    Some(parsed) => source = Some(parsed),
                    None => {
                        extra.insert(key, value);
                    }
                },
                "outputs" => match value {
                    Value::Array(items) => outputs = Some(items),
                    other => {
                        extra.insert(key, other);
                    }
                },
                "execution_count" => {
                    execution_count = match value {
                        Value::Null => ExecutionCount::Never,
                        Value::Number(n) => match n.as_i64() {
                            Some(count) => ExecutionCount::Count(count),
                            None => ExecutionCount::Other(Value::Number(n)),
                        },
                        other => ExecutionCount::Other(other),
                    };
                }
                _ => {
                    extra.insert(key, value);
                }
            }
        }

        Ok(Self {
            cell_type: cell_type.ok_or_else(|| invalid("missing \"cell_type\""))?,
            metadata: metadata.ok_or_else(|| invalid("missing \"metadata\""))?,
            source,
            outputs,
            execution_count,
            extra,
            key_order,
        })
    }

    fn write_field<M: SerializeMap>(
        &self,
        map: &mut M,
        key: &str,
    ) -> std::result::Result<(), M::Error> {
        match key {
            "cell_type" => map.serialize_entry(key, &self.cell_type),
            "metadata" => map.serialize_entry(key, &self.metadata),
            "source" => match &self.source {
                Some(source) => map.serialize_entry(key, source),
                None => self.write_extra(map, key),
            },
            "outputs" => match &self.outputs {
                Some(outputs) => map.serialize_entry(key, outputs),
                None => self.write_extra(map, key),
            },
            "execution_count" => match &self.execution_count {
                ExecutionCount::Absent => Ok(()),
                ExecutionCount::Never => map.serialize_entry(key, &Value::Null),
                ExecutionCount::Count(n) => map.serialize_entry(key, n),
                ExecutionCount::Other(value) => map.serialize_entry(key, value),
            },
            other => self.write_extra(map, other),
        }
    }

    fn write_extra<M: SerializeMap>(
        &self,
        map: &mut M,
        key: &str,
    ) -> std::result::Result<(), M::Error> {
        match self.extra.get(key) {
            Some(value) => map.serialize_entry(key, value),
            None => Ok(()),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for key in &self.key_order {
            self.write_field(&mut map, key)?;
        }
        for key in CELL_FIELDS {
            if !self.key_order.iter().any(|k| k == key) {
                self.write_field(&mut map, key)?;
            }
        }
        map.end()
    }
}

fn parse_source(value: &Value) -> Option<Source> {
    match value {
        Value::String(text) => Some(Source::Text(text.clone())),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(Source::Lines),
        _ => None,
    }
}

/// Parse a Jupyter Notebook from a file path
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read (I/O error)
/// - The notebook JSON is malformed or lacks required fields
#[must_use = "this function returns a parsed notebook that should be processed"]
pub fn parse_notebook<P: AsRef<Path>>(path: P) -> Result<NotebookDocument> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| NotebookError::io(path, e))?;
    parse_notebook_from_str(&content).map_err(|e| e.at_path(path))
}

/// Parse a Jupyter Notebook from a string
///
/// # Errors
///
/// Returns an error if the notebook JSON is malformed or lacks required fields.
#[must_use = "this function returns a parsed notebook that should be processed"]
pub fn parse_notebook_from_str(content: &str) -> Result<NotebookDocument> {
    let value: Value = serde_json::from_str(content)?;
    NotebookDocument::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const SIMPLE_NOTEBOOK: &str = r##"{
        "cells": [
            {
                "cell_type": "markdown",
                "id": "cell-1",
                "metadata": {},
                "source": ["# Hello World\n", "This is a test notebook."]
            },
            {
                "cell_type": "code",
                "execution_count": 1,
                "id": "cell-2",
                "metadata": {"tags": ["x"], "collapsed": false},
                "outputs": [
                    {
                        "name": "stdout",
                        "output_type": "stream",
                        "text": ["Hello, World!\n"]
                    }
                ],
                "source": ["print(\"Hello, World!\")"]
            }
        ],
        "metadata": {
            "kernelspec": {
                "name": "python3",
                "display_name": "Python 3"
            },
            "language_info": {
                "name": "python",
                "version": "3.9.0"
            }
        },
        "nbformat": 4,
        "nbformat_minor": 5
    }"##;

    #[test]
    fn test_parse_simple_notebook() {
        let result = parse_notebook_from_str(SIMPLE_NOTEBOOK);
        assert!(
            result.is_ok(),
            "Failed to parse notebook: {:?}",
            result.err()
        );

        let notebook = result.unwrap();
        assert_eq!(notebook.cells.len(), 2);
        assert_eq!(notebook.cells[0].cell_type, CellType::Markdown);
        assert_eq!(notebook.cells[1].cell_type, CellType::Code);
        assert_eq!(notebook.cells[1].execution_count, ExecutionCount::Count(1));
        assert_eq!(notebook.cells[1].outputs.as_ref().map(Vec::len), Some(1));
        assert_eq!(notebook.cells[1].extra("id"), Some(&Value::from("cell-2")));
        assert_eq!(notebook.extra("nbformat"), Some(&Value::from(4)));
        assert_eq!(
            notebook.cells[0].source.as_ref().map(Source::joined),
            Some("# Hello World\nThis is a test notebook.".to_string())
        );
    }

    #[test]
    fn test_compact_output_preserves_key_order() {
        let input = r#"{"nbformat":4,"metadata":{"z":1,"a":2},"cells":[{"source":"x = 1","metadata":{"b":1,"a":2},"id":"c1","cell_type":"code","outputs":[],"execution_count":null}],"nbformat_minor":5}"#;
        let notebook = parse_notebook_from_str(input).unwrap();
        let output = String::from_utf8(notebook.to_compact_json().unwrap()).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_pretty_output_uses_indent() {
        let notebook = parse_notebook_from_str(
            r#"{"cells":[{"cell_type":"markdown","metadata":{},"source":[]}],"metadata":{}}"#,
        )
        .unwrap();
        let output = String::from_utf8(notebook.to_pretty_json(1).unwrap()).unwrap();
        let expected = "{\n \"cells\": [\n  {\n   \"cell_type\": \"markdown\",\n   \"metadata\": {},\n   \"source\": []\n  }\n ],\n \"metadata\": {}\n}";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_pretty_output_is_stable() {
        let notebook = parse_notebook_from_str(SIMPLE_NOTEBOOK).unwrap();
        let first = notebook.to_pretty_json(1).unwrap();
        let reparsed = parse_notebook_from_str(std::str::from_utf8(&first).unwrap()).unwrap();
        assert_eq!(reparsed, notebook);
        assert_eq!(reparsed.to_pretty_json(1).unwrap(), first);
    }

    #[test]
    fn test_missing_cells_is_malformed() {
        let err = parse_notebook_from_str(r#"{"metadata": {}}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
        assert!(err.to_string().contains("missing \"cells\""));
    }

    #[test]
    fn test_structural_errors_are_malformed() {
        let cases = [
            ("[]", "top level is not a mapping"),
            (r#"{"cells": {}}"#, "\"cells\" is not a list"),
            (r#"{"cells": [42]}"#, "cell 0: not a mapping"),
            (r#"{"cells": [{"metadata": {}}]}"#, "cell 0: missing \"cell_type\""),
            (r#"{"cells": [{"cell_type": "code"}]}"#, "cell 0: missing \"metadata\""),
            (
                r#"{"cells": [{"cell_type": "raw", "metadata": {}}, {"cell_type": "code", "metadata": []}]}"#,
                "cell 1: \"metadata\" is not a mapping",
            ),
            (
                r#"{"cells": [{"cell_type": 3, "metadata": {}}]}"#,
                "cell 0: \"cell_type\" is not a string",
            ),
        ];
        for (input, expected) in cases {
            let err = parse_notebook_from_str(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedDocument, "input: {input}");
            assert!(
                err.to_string().contains(expected),
                "input {input}: {err} should mention {expected}"
            );
        }
    }

    #[test]
    fn test_odd_field_shapes_are_kept_verbatim() {
        let input = r#"{"cells":[{"cell_type":"markdown","metadata":{},"outputs":null,"source":null},{"cell_type":"code","execution_count":3.0,"metadata":{},"outputs":{"x":1},"source":[1,"a"]}]}"#;
        let notebook = parse_notebook_from_str(input).unwrap();

        let markdown = &notebook.cells[0];
        assert_eq!(markdown.source, None);
        assert_eq!(markdown.outputs, None);
        assert_eq!(markdown.extra("source"), Some(&Value::Null));

        let code = &notebook.cells[1];
        assert!(code.execution_count.is_set());
        assert!(matches!(code.execution_count, ExecutionCount::Other(_)));
        assert_eq!(code.extra("outputs"), Some(&serde_json::json!({"x": 1})));

        let output = String::from_utf8(notebook.to_compact_json().unwrap()).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_set_source_replaces_unparsed_value() {
        let mut notebook =
            parse_notebook_from_str(r#"{"cells":[{"cell_type":"raw","metadata":{},"source":7}]}"#)
                .unwrap();
        notebook.cells[0].set_source(Source::empty());
        assert_eq!(notebook.cells[0].extra("source"), None);
        let output = String::from_utf8(notebook.to_compact_json().unwrap()).unwrap();
        assert_eq!(output, r#"{"cells":[{"cell_type":"raw","metadata":{},"source":[]}]}"#);
    }

    #[test]
    fn test_numbers_are_reproduced_exactly() {
        let input = r#"{"cells":[],"metadata":{"big":12345678901234567890123,"e":1e5,"f":0.1,"neg":-0.0}}"#;
        let notebook = parse_notebook_from_str(input).unwrap();
        let output = String::from_utf8(notebook.to_compact_json().unwrap()).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_notebook_from_str("{\"cells\": [").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    }

    #[test]
    fn test_unknown_cell_type_round_trips() {
        let input = r#"{"cells":[{"cell_type":"heading","metadata":{},"source":"Title"}]}"#;
        let notebook = parse_notebook_from_str(input).unwrap();
        assert_eq!(
            notebook.cells[0].cell_type,
            CellType::Other("heading".to_string())
        );
        let output = String::from_utf8(notebook.to_compact_json().unwrap()).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_constructed_cells_use_nbformat_order() {
        let notebook = NotebookDocument::new(vec![Cell::code(["1 + 1"])]);
        let output = String::from_utf8(notebook.to_compact_json().unwrap()).unwrap();
        assert_eq!(
            output,
            r#"{"cells":[{"cell_type":"code","execution_count":null,"metadata":{},"outputs":[],"source":["1 + 1"]}]}"#
        );
    }

    #[test]
    fn test_cell_type_display() {
        assert_eq!(format!("{}", CellType::Code), "code");
        assert_eq!(format!("{}", CellType::Markdown), "markdown");
        assert_eq!(format!("{}", CellType::Raw), "raw");
        assert_eq!(format!("{}", CellType::Other("heading".into())), "heading");
    }

    #[test]
    fn test_cell_type_from_str_is_exact() {
        assert_eq!(CellType::from("code"), CellType::Code);
        assert_eq!(CellType::from("markdown"), CellType::Markdown);
        assert_eq!(CellType::from("raw"), CellType::Raw);
        assert_eq!(CellType::from("CODE"), CellType::Other("CODE".into()));
    }

    #[test]
    fn test_source_helpers() {
        assert!(Source::empty().is_empty());
        assert!(Source::Text(String::new()).is_empty());
        assert!(!Source::Lines(vec!["a\n".into(), "b".into()]).is_empty());
        assert_eq!(Source::Lines(vec!["a\n".into(), "b".into()]).joined(), "a\nb");
    }
}
