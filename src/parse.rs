//! Adapters from YAML/JSON text to [`Tree`].

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::vec;

use thiserror::Error;
use tracing::debug;
use yaml_rust2::parser::{Event, EventReceiver, Parser, Tag};
use yaml_rust2::scanner::{ScanError, TScalarStyle};

use crate::tree::{infer_plain, NodeData, NodeId, NodeKind, ScalarType, Tree};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// `.json` files are JSON; everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Format::Json
        } else {
            Format::Yaml
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Yaml => f.write_str("YAML"),
            Format::Json => f.write_str("JSON"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty {0} document")]
    Empty(Format),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] ScanError),
    #[error("unsupported YAML structure: {0}")]
    Structure(String),
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn parse(source: &str, format: Format) -> Result<Tree, ParseError> {
    match format {
        Format::Yaml => parse_yaml(source),
        Format::Json => parse_json(source),
    }
}

/// Reads and parses a file, picking the format from its extension.
pub fn parse_file(path: &Path) -> Result<(Tree, Format), ParseError> {
    let source = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = Format::from_path(path);
    let tree = parse(&source, format)?;
    debug!(target: "parse", file = %path.display(), %format, nodes = tree.node_count(), "file_parsed");
    Ok((tree, format))
}

/// Builds the tree from parser events so every scalar keeps its source text.
/// Only the first document of a stream is read.
pub fn parse_yaml(source: &str) -> Result<Tree, ParseError> {
    if is_blank_yaml(source) {
        return Err(ParseError::Empty(Format::Yaml));
    }
    let mut log = EventLog::default();
    Parser::new_from_str(source).load(&mut log, false)?;

    let mut events = log.events.into_iter();
    let Some(first) = events.by_ref().find(is_node_event) else {
        return Err(ParseError::Empty(Format::Yaml));
    };
    let mut builder = YamlBuilder::default();
    let root = builder.tree.root();
    builder.node(first, &mut events, root, None)?;
    Ok(builder.tree)
}

pub fn parse_json(source: &str) -> Result<Tree, ParseError> {
    if source.trim().is_empty() {
        return Err(ParseError::Empty(Format::Json));
    }
    let value: serde_json::Value = serde_json::from_str(source)?;
    let mut tree = Tree::new();
    let root = tree.root();
    insert_json(&mut tree, root, None, &value);
    Ok(tree)
}

fn is_blank_yaml(source: &str) -> bool {
    source.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

#[derive(Default)]
struct EventLog {
    events: Vec<Event>,
}

impl EventReceiver for EventLog {
    fn on_event(&mut self, event: Event) {
        self.events.push(event);
    }
}

fn is_node_event(event: &Event) -> bool {
    matches!(
        event,
        Event::Scalar(..) | Event::Alias(..) | Event::SequenceStart(..) | Event::MappingStart(..)
    )
}

#[derive(Default)]
struct YamlBuilder {
    tree: Tree,
    anchors: HashMap<usize, NodeId>,
}

impl YamlBuilder {
    fn node(
        &mut self,
        event: Event,
        events: &mut vec::IntoIter<Event>,
        parent: NodeId,
        key: Option<String>,
    ) -> Result<NodeId, ParseError> {
        match event {
            Event::Scalar(value, style, anchor, tag) => {
                let tag = scalar_tag(&value, style, tag.as_ref());
                let id = self.tree.insert(parent, key, NodeData::tagged(value, tag));
                self.remember(anchor, id);
                Ok(id)
            }
            // the copy keeps diff and JSON output independent of anchor names
            Event::Alias(anchor) => {
                let source = self.anchored(anchor)?;
                Ok(copy_subtree(&mut self.tree, source, parent, key))
            }
            Event::SequenceStart(anchor, ..) => {
                let id = self.tree.insert(parent, key, NodeData::sequence());
                self.remember(anchor, id);
                loop {
                    match next_event(events)? {
                        Event::SequenceEnd => break,
                        item => {
                            self.node(item, events, id, None)?;
                        }
                    }
                }
                Ok(id)
            }
            Event::MappingStart(anchor, ..) => {
                let id = self.tree.insert(parent, key, NodeData::mapping());
                self.remember(anchor, id);
                loop {
                    let key = match next_event(events)? {
                        Event::MappingEnd => break,
                        Event::Scalar(text, ..) => text,
                        Event::Alias(anchor) => {
                            let source = self.tree.get(self.anchored(anchor)?);
                            if source.kind() != NodeKind::Scalar {
                                return Err(ParseError::Structure(
                                    "mapping keys must be scalars".to_string(),
                                ));
                            }
                            source.value().to_string()
                        }
                        _ => {
                            return Err(ParseError::Structure(
                                "mapping keys must be scalars".to_string(),
                            ))
                        }
                    };
                    let value = next_event(events)?;
                    self.node(value, events, id, Some(key))?;
                }
                Ok(id)
            }
            other => Err(ParseError::Structure(format!("unexpected event {other:?}"))),
        }
    }

    fn remember(&mut self, anchor: usize, id: NodeId) {
        if anchor > 0 {
            self.anchors.insert(anchor, id);
        }
    }

    fn anchored(&self, anchor: usize) -> Result<NodeId, ParseError> {
        self.anchors
            .get(&anchor)
            .copied()
            .ok_or_else(|| ParseError::Structure(format!("unknown anchor #{anchor}")))
    }
}

fn next_event(events: &mut vec::IntoIter<Event>) -> Result<Event, ParseError> {
    events
        .next()
        .ok_or_else(|| ParseError::Structure("unexpected end of document".to_string()))
}

/// Explicit tags win; quoted and block scalars are strings; plain scalars
/// are typed by their text.
fn scalar_tag(value: &str, style: TScalarStyle, explicit: Option<&Tag>) -> String {
    if let Some(tag) = explicit {
        return match tag.handle.as_str() {
            "!!" | "tag:yaml.org,2002:" => format!("!!{}", tag.suffix),
            handle => format!("{handle}{}", tag.suffix),
        };
    }
    if !matches!(style, TScalarStyle::Plain) {
        return "!!str".to_string();
    }
    let tag = match infer_plain(value) {
        ScalarType::Null => "!!null",
        ScalarType::Boolean => "!!bool",
        ScalarType::Number if value.contains(['.', 'e', 'E']) => "!!float",
        ScalarType::Number => "!!int",
        ScalarType::Timestamp => "!!timestamp",
        ScalarType::String => "!!str",
    };
    tag.to_string()
}

fn copy_subtree(tree: &mut Tree, source: NodeId, parent: NodeId, key: Option<String>) -> NodeId {
    let node = tree.get(source);
    let data = match node.kind() {
        NodeKind::Mapping => NodeData::mapping(),
        NodeKind::Sequence => NodeData::sequence(),
        NodeKind::Alias => NodeData::alias(node.value()),
        NodeKind::Scalar | NodeKind::Document => match node.tag() {
            Some(tag) => NodeData::tagged(node.value(), tag),
            None => NodeData::scalar(node.value()),
        },
    };
    let children: Vec<(NodeId, Option<String>)> = node
        .children()
        .iter()
        .map(|child| (*child, tree.get(*child).key().map(str::to_string)))
        .collect();

    let copy = tree.insert(parent, key, data);
    for (child, child_key) in children {
        copy_subtree(tree, child, copy, child_key);
    }
    copy
}

fn insert_json(
    tree: &mut Tree,
    parent: NodeId,
    key: Option<String>,
    value: &serde_json::Value,
) -> NodeId {
    use serde_json::Value;

    match value {
        Value::Null => tree.insert(parent, key, NodeData::tagged("null", "!!null")),
        Value::Bool(b) => tree.insert(parent, key, NodeData::tagged(b.to_string(), "!!bool")),
        Value::Number(n) => {
            let text = n.to_string();
            let tag = if text.contains(['.', 'e', 'E']) {
                "!!float"
            } else {
                "!!int"
            };
            tree.insert(parent, key, NodeData::tagged(text, tag))
        }
        Value::String(s) => tree.insert(parent, key, NodeData::tagged(s.as_str(), "!!str")),
        Value::Array(items) => {
            let id = tree.insert(parent, key, NodeData::sequence());
            for item in items {
                insert_json(tree, id, None, item);
            }
            id
        }
        Value::Object(map) => {
            let id = tree.insert(parent, key, NodeData::mapping());
            for (k, v) in map {
                insert_json(tree, id, Some(k.clone()), v);
            }
            id
        }
    }
}
