//! In-memory document tree.
//!
//! Nodes live in a single arena owned by [`Tree`] and refer to each other by
//! [`NodeId`]. Parent links are plain ids, so walking up for fold or search
//! bookkeeping never involves shared ownership. A tree always starts with a
//! `Document` node whose single child is the top-level value; the document
//! node is transparent to rendering, navigation and diffing.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Mapping,
    Sequence,
    Scalar,
    Alias,
}

impl NodeKind {
    pub fn is_container(self) -> bool {
        matches!(
            self,
            NodeKind::Document | NodeKind::Mapping | NodeKind::Sequence
        )
    }
}

/// Best-effort scalar classification used for display and JSON encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Number,
    Boolean,
    Null,
    Timestamp,
}

impl ScalarType {
    pub fn label(self) -> &'static str {
        match self {
            ScalarType::String => "<str>",
            ScalarType::Number => "<int>",
            ScalarType::Boolean => "<bool>",
            ScalarType::Null => "<null>",
            ScalarType::Timestamp => "<time>",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, ".{key}"),
            PathSegment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Renders segments as `$`, `$.a.b`, `$.items[0]`.
pub fn path_to_string(path: &[PathSegment]) -> String {
    let mut out = String::from("$");
    for segment in path {
        out.push_str(&segment.to_string());
    }
    out
}

/// Comments attached to a node. Carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Comments {
    pub head: String,
    pub line: String,
    pub foot: String,
}

/// Shape and payload of a node about to be inserted.
#[derive(Clone, Debug)]
pub struct NodeData {
    kind: NodeKind,
    value: String,
    tag: Option<String>,
}

impl NodeData {
    pub fn mapping() -> Self {
        Self {
            kind: NodeKind::Mapping,
            value: String::new(),
            tag: None,
        }
    }

    pub fn sequence() -> Self {
        Self {
            kind: NodeKind::Sequence,
            value: String::new(),
            tag: None,
        }
    }

    pub fn scalar(value: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Scalar,
            value: value.into(),
            tag: None,
        }
    }

    pub fn tagged(value: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Scalar,
            value: value.into(),
            tag: Some(tag.into()),
        }
    }

    pub fn alias(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Alias,
            value: name.into(),
            tag: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    value: String,
    tag: Option<String>,
    key: Option<String>,
    index: usize,
    depth: usize,
    path: Vec<PathSegment>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    collapsed: bool,
    comments: Comments,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Position within the parent sequence, or pair order within the parent mapping.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    pub fn path_string(&self) -> String {
        path_to_string(&self.path)
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }

    /// Containers with at least one child are the only foldable nodes.
    pub fn is_foldable(&self) -> bool {
        self.is_container() && self.has_children()
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn comments(&self) -> &Comments {
        &self.comments
    }

    /// Label shown for the node inside its parent: the mapping key, or
    /// `[i]` for sequence items. Empty for the top-level value.
    pub fn label(&self) -> String {
        if let Some(key) = &self.key {
            return key.clone();
        }
        match self.path.last() {
            Some(PathSegment::Index(index)) => format!("[{index}]"),
            _ => String::new(),
        }
    }

    pub fn infer_type(&self) -> ScalarType {
        if self.kind != NodeKind::Scalar {
            return ScalarType::String;
        }
        match self.tag.as_deref() {
            Some("!!null") => ScalarType::Null,
            Some("!!bool") => ScalarType::Boolean,
            Some("!!int" | "!!float") => ScalarType::Number,
            Some("!!timestamp") => ScalarType::Timestamp,
            Some("!!str") => ScalarType::String,
            None | Some("" | "!") => infer_plain(&self.value),
            Some(_) => ScalarType::String,
        }
    }
}

/// Classifies an untagged scalar by its text alone.
pub fn infer_plain(value: &str) -> ScalarType {
    match value.to_lowercase().as_str() {
        "null" | "~" | "" => ScalarType::Null,
        "true" | "false" | "yes" | "no" | "on" | "off" => ScalarType::Boolean,
        _ if is_number(value) => ScalarType::Number,
        _ => ScalarType::String,
    }
}

fn is_number(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return false;
    }

    let mut start = 0;
    if bytes[0] == b'-' || bytes[0] == b'+' {
        if bytes.len() == 1 {
            return false;
        }
        start = 1;
    }

    let mut has_digit = false;
    let mut has_dot = false;
    let mut has_exp = false;

    for i in start..bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => has_digit = true,
            b'.' => {
                if has_dot || has_exp {
                    return false;
                }
                has_dot = true;
            }
            b'e' | b'E' => {
                if has_exp || !has_digit {
                    return false;
                }
                has_exp = true;
                has_digit = false;
            }
            b'+' | b'-' => {
                if i == 0 || !matches!(bytes[i - 1], b'e' | b'E') {
                    return false;
                }
            }
            b'_' => {}
            _ => return false,
        }
    }

    has_digit
}

#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Creates a tree holding only an empty document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                id: NodeId(0),
                kind: NodeKind::Document,
                value: String::new(),
                tag: None,
                key: None,
                index: 0,
                depth: 0,
                path: Vec::new(),
                parent: None,
                children: Vec::new(),
                collapsed: false,
                comments: Comments::default(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The top-level value under the document node.
    pub fn top(&self) -> Option<NodeId> {
        self.get(self.root()).children.first().copied()
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Appends a child to `parent`, deriving index, depth and path from it.
    ///
    /// The document node is transparent: its child shares its depth and path.
    pub fn insert(&mut self, parent: NodeId, key: Option<String>, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent_node = &self.nodes[parent.0];
        debug_assert!(parent_node.is_container(), "scalars never own children");
        debug_assert!(
            parent_node.kind != NodeKind::Document || parent_node.children.is_empty(),
            "a document holds a single value"
        );

        let index = parent_node.children.len();
        let mut path = parent_node.path.clone();
        let depth = match parent_node.kind {
            NodeKind::Document => parent_node.depth,
            NodeKind::Mapping => {
                path.push(PathSegment::Key(key.clone().unwrap_or_default()));
                parent_node.depth + 1
            }
            NodeKind::Sequence | NodeKind::Scalar | NodeKind::Alias => {
                path.push(PathSegment::Index(index));
                parent_node.depth + 1
            }
        };

        self.nodes.push(Node {
            id,
            kind: data.kind,
            value: data.value,
            tag: data.tag,
            key,
            index,
            depth,
            path,
            parent: Some(parent),
            children: Vec::new(),
            collapsed: false,
            comments: Comments::default(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn set_collapsed(&mut self, id: NodeId, collapsed: bool) {
        self.nodes[id.0].collapsed = collapsed;
    }

    pub fn set_value(&mut self, id: NodeId, value: String) {
        self.nodes[id.0].value = value;
    }

    pub fn set_comments(&mut self, id: NodeId, comments: Comments) {
        self.nodes[id.0].comments = comments;
    }

    /// Parent chain from the nearest ancestor up to the document node.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.get(id).parent, move |current| {
            self.get(*current).parent
        })
    }

    pub fn is_last_child(&self, id: NodeId) -> bool {
        match self.get(id).parent {
            Some(parent) => self.get(parent).children.last() == Some(&id),
            None => true,
        }
    }

    /// Depth-first pre-order over every node. Returning `false` from `visit`
    /// skips that node's children; siblings are still visited.
    pub fn walk_all<F>(&self, id: NodeId, visit: &mut F)
    where
        F: FnMut(&Node) -> bool,
    {
        let node = self.get(id);
        if !visit(node) {
            return;
        }
        for child in &node.children {
            self.walk_all(*child, visit);
        }
    }

    /// Like [`Tree::walk_all`] but never descends into collapsed nodes.
    pub fn walk_visible<F>(&self, id: NodeId, visit: &mut F)
    where
        F: FnMut(&Node) -> bool,
    {
        let node = self.get(id);
        if !visit(node) || node.collapsed {
            return;
        }
        for child in &node.children {
            self.walk_visible(*child, visit);
        }
    }

    pub fn flatten(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk_all(id, &mut |node| {
            out.push(node.id);
            true
        });
        out
    }

    pub fn flatten_visible(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk_visible(id, &mut |node| {
            out.push(node.id);
            true
        });
        out
    }
}
