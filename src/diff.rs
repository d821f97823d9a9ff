//! Structural diff between two document trees.
//!
//! Mappings are aligned by key (visited in sorted order), sequences by
//! position. Added and removed subtrees are reported as a single node, and
//! a kind mismatch at one position is a plain modification.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::tree::{Node, NodeId, NodeKind, Tree};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffType {
    Unchanged,
    Added,
    Removed,
    Modified,
}

impl DiffType {
    pub fn marker(self) -> &'static str {
        match self {
            DiffType::Unchanged => "  ",
            DiffType::Added => "+ ",
            DiffType::Removed => "- ",
            DiffType::Modified => "~ ",
        }
    }
}

#[derive(Clone, Debug)]
pub struct DiffNode<'a> {
    pub left: Option<&'a Node>,
    pub right: Option<&'a Node>,
    pub diff_type: DiffType,
    pub children: Vec<DiffNode<'a>>,
    pub path: String,
}

impl DiffNode<'_> {
    pub fn is_changed(&self) -> bool {
        self.diff_type != DiffType::Unchanged
    }

    /// The node used to describe this position: right side if present.
    pub fn primary(&self) -> Option<&Node> {
        self.right.or(self.left)
    }

    pub fn label(&self) -> String {
        let from_left = self.left.map(Node::label).filter(|l| !l.is_empty());
        let from_right = self.right.map(Node::label).filter(|l| !l.is_empty());
        match (self.left.and_then(Node::key), self.right.and_then(Node::key)) {
            (Some(key), _) | (None, Some(key)) => key.to_string(),
            (None, None) => from_left.or(from_right).unwrap_or_default(),
        }
    }

    pub fn is_document(&self) -> bool {
        self.left.is_some_and(|n| n.kind() == NodeKind::Document)
            || self.right.is_some_and(|n| n.kind() == NodeKind::Document)
    }

    /// Pre-order walk over this node and all descendants.
    pub fn walk<'s, F>(&'s self, visit: &mut F)
    where
        F: FnMut(&'s DiffNode<'_>),
    {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub total: usize,
}

impl DiffSummary {
    /// Counts every non-unchanged node, containers included, so one changed
    /// leaf under an otherwise equal mapping counts twice.
    pub fn from_root(root: Option<&DiffNode<'_>>) -> Self {
        let mut summary = Self::default();
        if let Some(root) = root {
            root.walk(&mut |node| match node.diff_type {
                DiffType::Added => summary.added += 1,
                DiffType::Removed => summary.removed += 1,
                DiffType::Modified => summary.modified += 1,
                DiffType::Unchanged => {}
            });
        }
        summary.total = summary.added + summary.removed + summary.modified;
        summary
    }

    pub fn has_changes(&self) -> bool {
        self.total > 0
    }

    /// Process status for `yam diff`: 0 when equal, 1 when anything differs.
    pub fn exit_status(&self) -> u8 {
        u8::from(self.has_changes())
    }
}

#[derive(Clone, Debug)]
pub struct DiffResult<'a> {
    pub root: Option<DiffNode<'a>>,
    pub summary: DiffSummary,
}

/// One side of the comparison: a node and the tree that owns it.
#[derive(Clone, Copy)]
struct Side<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> Side<'a> {
    fn node(self) -> &'a Node {
        self.tree.get(self.id)
    }

    fn kind(self) -> NodeKind {
        self.node().kind()
    }

    fn child(self, index: usize) -> Option<Side<'a>> {
        self.node().children().get(index).map(|id| Side {
            tree: self.tree,
            id: *id,
        })
    }

    fn children_by_key(self) -> BTreeMap<&'a str, Side<'a>> {
        let tree = self.tree;
        self.node()
            .children()
            .iter()
            .map(|id| {
                let key = tree.get(*id).key().unwrap_or_default();
                (key, Side { tree, id: *id })
            })
            .collect()
    }
}

/// Compares two whole documents. Either side may be absent.
pub fn compare<'a>(left: Option<&'a Tree>, right: Option<&'a Tree>) -> DiffResult<'a> {
    compare_at(
        left.map(|tree| (tree, tree.root())),
        right.map(|tree| (tree, tree.root())),
    )
}

/// Compares two subtrees, each given as a tree and a node inside it.
pub fn compare_at<'a>(
    left: Option<(&'a Tree, NodeId)>,
    right: Option<(&'a Tree, NodeId)>,
) -> DiffResult<'a> {
    let left = left.map(|(tree, id)| Side { tree, id });
    let right = right.map(|(tree, id)| Side { tree, id });
    let root = align(left, right, "$".to_string());
    let summary = DiffSummary::from_root(root.as_ref());
    debug!(
        target: "diff",
        added = summary.added,
        removed = summary.removed,
        modified = summary.modified,
        "compare_complete"
    );
    DiffResult { root, summary }
}

fn align<'a>(left: Option<Side<'a>>, right: Option<Side<'a>>, path: String) -> Option<DiffNode<'a>> {
    let (l, r) = match (left, right) {
        (None, None) => return None,
        (None, Some(r)) => return Some(leaf(None, Some(r.node()), DiffType::Added, path)),
        (Some(l), None) => return Some(leaf(Some(l.node()), None, DiffType::Removed, path)),
        (Some(l), Some(r)) => (l, r),
    };

    match (l.kind(), r.kind()) {
        (NodeKind::Mapping, NodeKind::Mapping) => {
            let left_children = l.children_by_key();
            let right_children = r.children_by_key();
            let keys: BTreeSet<&str> = left_children
                .keys()
                .chain(right_children.keys())
                .copied()
                .collect();

            let children = keys
                .into_iter()
                .filter_map(|key| {
                    align(
                        left_children.get(key).copied(),
                        right_children.get(key).copied(),
                        format!("{path}.{key}"),
                    )
                })
                .collect();
            Some(container(l.node(), r.node(), children, path))
        }
        (NodeKind::Sequence, NodeKind::Sequence) => {
            let len = l.node().children().len().max(r.node().children().len());
            let children = (0..len)
                .filter_map(|i| align(l.child(i), r.child(i), format!("{path}[{i}]")))
                .collect();
            Some(container(l.node(), r.node(), children, path))
        }
        (NodeKind::Scalar, NodeKind::Scalar) | (NodeKind::Alias, NodeKind::Alias) => {
            let diff_type = if l.node().value() == r.node().value() {
                DiffType::Unchanged
            } else {
                DiffType::Modified
            };
            Some(leaf(Some(l.node()), Some(r.node()), diff_type, path))
        }
        (NodeKind::Document, NodeKind::Document) => align(l.child(0), r.child(0), path),
        (lk, rk) if lk != rk => Some(leaf(
            Some(l.node()),
            Some(r.node()),
            DiffType::Modified,
            path,
        )),
        _ => Some(leaf(
            Some(l.node()),
            Some(r.node()),
            DiffType::Unchanged,
            path,
        )),
    }
}

fn leaf<'a>(
    left: Option<&'a Node>,
    right: Option<&'a Node>,
    diff_type: DiffType,
    path: String,
) -> DiffNode<'a> {
    DiffNode {
        left,
        right,
        diff_type,
        children: Vec::new(),
        path,
    }
}

fn container<'a>(
    left: &'a Node,
    right: &'a Node,
    children: Vec<DiffNode<'a>>,
    path: String,
) -> DiffNode<'a> {
    let diff_type = if children.iter().any(DiffNode::is_changed) {
        DiffType::Modified
    } else {
        DiffType::Unchanged
    };
    DiffNode {
        left: Some(left),
        right: Some(right),
        diff_type,
        children,
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_json, parse_yaml};

    fn yaml(source: &str) -> Tree {
        parse_yaml(source).unwrap()
    }

    fn summary(added: usize, removed: usize, modified: usize) -> DiffSummary {
        DiffSummary {
            added,
            removed,
            modified,
            total: added + removed + modified,
        }
    }

    fn assert_side_invariants(node: &DiffNode<'_>) {
        node.walk(&mut |n| {
            assert_eq!(n.diff_type == DiffType::Added, n.left.is_none(), "{}", n.path);
            assert_eq!(n.diff_type == DiffType::Removed, n.right.is_none(), "{}", n.path);
        });
    }

    #[test]
    fn both_absent_yields_nothing() {
        let result = compare(None, None);
        assert!(result.root.is_none());
        assert_eq!(result.summary, DiffSummary::default());
    }

    #[test]
    fn one_sided_documents() {
        let tree = yaml("key: value\n");

        let added = compare(None, Some(&tree));
        let root = added.root.unwrap();
        assert_eq!(root.diff_type, DiffType::Added);
        assert!(root.left.is_none());
        assert!(root.children.is_empty());
        assert_eq!(added.summary, summary(1, 0, 0));

        let removed = compare(Some(&tree), None);
        assert_eq!(removed.root.unwrap().diff_type, DiffType::Removed);
        assert_eq!(removed.summary, summary(0, 1, 0));
    }

    #[test]
    fn scalar_change() {
        let left = yaml("old\n");
        let right = yaml("new\n");
        let result = compare(Some(&left), Some(&right));
        let root = result.root.unwrap();
        assert_eq!(root.diff_type, DiffType::Modified);
        assert_eq!(root.path, "$");
        assert_eq!(result.summary, summary(0, 0, 1));
    }

    #[test]
    fn scalar_comparison_is_exact_text() {
        for (l, r, expected) in [
            ("a: Value\n", "a: value\n", DiffType::Modified),
            ("a: 'x '\n", "a: x\n", DiffType::Modified),
            ("a: 1\n", "a: 1\n", DiffType::Unchanged),
            ("a: ''\n", "a: ''\n", DiffType::Unchanged),
        ] {
            let (left, right) = (yaml(l), yaml(r));
            let result = compare(Some(&left), Some(&right));
            let child = &result.root.as_ref().unwrap().children[0];
            assert_eq!(child.diff_type, expected, "{l:?} vs {r:?}");
        }
    }

    #[test]
    fn plain_scalar_spellings_are_distinct() {
        for (l, r) in [
            ("flag: True\n", "flag: true\n"),
            ("mask: 0x10\n", "mask: 16\n"),
            ("a: ~\n", "a: null\n"),
            ("v: 1.10\n", "v: 1.1\n"),
            ("n: 1e3\n", "n: 1000\n"),
        ] {
            let (left, right) = (yaml(l), yaml(r));
            let result = compare(Some(&left), Some(&right));
            assert_eq!(result.summary, summary(0, 0, 2), "{l:?} vs {r:?}");
        }
    }

    #[test]
    fn identical_trees_are_unchanged() {
        for source in [
            "a: 1\nb: [1, 2, {c: d}]\n",
            "{}\n",
            "[]\n",
            "outer:\n  inner: []\n  other: {}\n",
            "- - - deep\n",
        ] {
            let tree = yaml(source);
            let result = compare(Some(&tree), Some(&tree));
            let root = result.root.unwrap();
            assert_eq!(root.diff_type, DiffType::Unchanged, "{source}");
            assert_eq!(result.summary.total, 0, "{source}");
        }
    }

    #[test]
    fn added_key_counts_parent_too() {
        let left = yaml("key1: value1\n");
        let right = yaml("key1: value1\nkey2: value2\n");
        let result = compare(Some(&left), Some(&right));
        let root = result.root.as_ref().unwrap();
        assert_eq!(root.diff_type, DiffType::Modified);
        assert_eq!(root.children.len(), 2);
        let added = &root.children[1];
        assert_eq!(added.diff_type, DiffType::Added);
        assert_eq!(added.right.unwrap().key(), Some("key2"));
        assert_eq!(added.path, "$.key2");
        assert_eq!(result.summary, summary(1, 0, 1));
        assert_side_invariants(root);
    }

    #[test]
    fn removed_key() {
        let left = yaml("key1: value1\nkey2: value2\n");
        let right = yaml("key1: value1\n");
        let result = compare(Some(&left), Some(&right));
        let root = result.root.as_ref().unwrap();
        let removed = &root.children[1];
        assert_eq!(removed.diff_type, DiffType::Removed);
        assert_eq!(removed.left.unwrap().key(), Some("key2"));
        assert_eq!(result.summary, summary(0, 1, 1));
    }

    #[test]
    fn one_changed_child_counts_twice() {
        let left = yaml("a: 1\nb: 2\nc: 3\nd: 4\n");
        let right = yaml("a: 1\nb: 2\nc: changed\nd: 4\n");
        let result = compare(Some(&left), Some(&right));
        assert_eq!(result.summary, summary(0, 0, 2));
    }

    #[test]
    fn keys_are_visited_sorted_and_once() {
        let left = yaml("zeta: 1\nalpha: 2\n");
        let right = yaml("alpha: 2\nmid: 3\nzeta: 1\n");
        let result = compare(Some(&left), Some(&right));
        let paths: Vec<_> = result
            .root
            .unwrap()
            .children
            .iter()
            .map(|c| c.path.clone())
            .collect();
        assert_eq!(paths, vec!["$.alpha", "$.mid", "$.zeta"]);
    }

    #[test]
    fn sequence_grows_by_one() {
        let left = yaml("- item1\n");
        let right = yaml("- item1\n- item2\n");
        let result = compare(Some(&left), Some(&right));
        let root = result.root.as_ref().unwrap();
        assert_eq!(root.diff_type, DiffType::Modified);
        assert_eq!(root.children[0].diff_type, DiffType::Unchanged);
        assert_eq!(root.children[1].diff_type, DiffType::Added);
        assert_eq!(root.children[1].path, "$[1]");
        assert_eq!(result.summary, summary(1, 0, 1));
    }

    #[test]
    fn sequence_shrinks() {
        let left = yaml("- a\n- b\n- c\n");
        let right = yaml("- a\n");
        let result = compare(Some(&left), Some(&right));
        assert_eq!(result.summary, summary(0, 2, 1));
        let root = result.root.unwrap();
        assert_eq!(root.children[2].path, "$[2]");
        assert_eq!(root.children[2].diff_type, DiffType::Removed);
    }

    #[test]
    fn sequence_head_insert_is_positional() {
        let left = yaml("- b\n- c\n");
        let right = yaml("- a\n- b\n- c\n");
        let result = compare(Some(&left), Some(&right));
        let types: Vec<_> = result
            .root
            .unwrap()
            .children
            .iter()
            .map(|c| c.diff_type)
            .collect();
        assert_eq!(
            types,
            vec![DiffType::Modified, DiffType::Modified, DiffType::Added]
        );
        assert_eq!(result.summary, summary(1, 0, 3));
    }

    #[test]
    fn nested_paths() {
        let left = yaml("parent:\n  child: value\n");
        let right = yaml("parent:\n  child: changed\n");
        let result = compare(Some(&left), Some(&right));
        let root = result.root.unwrap();
        assert_eq!(root.path, "$");
        let parent = &root.children[0];
        assert_eq!(parent.path, "$.parent");
        assert_eq!(parent.diff_type, DiffType::Modified);
        let child = &parent.children[0];
        assert_eq!(child.path, "$.parent.child");
        assert_eq!(child.diff_type, DiffType::Modified);
        assert_eq!(child.left.unwrap().value(), "value");
        assert_eq!(child.right.unwrap().value(), "changed");
        assert_eq!(result.summary, summary(0, 0, 3));
    }

    #[test]
    fn mixed_paths_use_brackets_for_items() {
        let left = yaml("items:\n  - name: a\n");
        let right = yaml("items:\n  - name: b\n");
        let result = compare(Some(&left), Some(&right));
        let mut paths = Vec::new();
        result.root.as_ref().unwrap().walk(&mut |n| paths.push(n.path.clone()));
        assert_eq!(paths, vec!["$", "$.items", "$.items[0]", "$.items[0].name"]);
    }

    #[test]
    fn kind_mismatch_is_a_modified_leaf() {
        let left = yaml("a:\n  b: 1\n");
        let right = yaml("a: scalar\n");
        let result = compare(Some(&left), Some(&right));
        let root = result.root.unwrap();
        let a = &root.children[0];
        assert_eq!(a.diff_type, DiffType::Modified);
        assert!(a.children.is_empty());
        assert_eq!(a.left.unwrap().kind(), NodeKind::Mapping);
        assert_eq!(a.right.unwrap().kind(), NodeKind::Scalar);
        assert_eq!(result.summary, summary(0, 0, 2));
    }

    #[test]
    fn empty_containers() {
        let (l, r) = (yaml("{}\n"), yaml("{}\n"));
        let result = compare(Some(&l), Some(&r));
        assert_eq!(result.root.unwrap().diff_type, DiffType::Unchanged);

        let (l, r) = (yaml("[]\n"), yaml("- x\n"));
        let result = compare(Some(&l), Some(&r));
        assert_eq!(result.summary, summary(1, 0, 1));
    }

    #[test]
    fn yaml_and_json_compare_structurally() {
        let left = yaml("name: demo\nports:\n  - 80\n");
        let right = parse_json(r#"{"ports": [80], "name": "demo"}"#).unwrap();
        let result = compare(Some(&left), Some(&right));
        assert_eq!(result.summary.total, 0);
    }

    #[test]
    fn alias_nodes_compare_on_text() {
        let mut left = Tree::new();
        let l_map = left.insert(left.root(), None, crate::tree::NodeData::mapping());
        left.insert(l_map, Some("ref".into()), crate::tree::NodeData::alias("base"));
        let mut right = Tree::new();
        let r_map = right.insert(right.root(), None, crate::tree::NodeData::mapping());
        right.insert(r_map, Some("ref".into()), crate::tree::NodeData::alias("other"));

        let result = compare(Some(&left), Some(&right));
        assert_eq!(result.summary, summary(0, 0, 2));
    }

    #[test]
    fn subtree_comparison() {
        let left = yaml("a:\n  x: 1\nb: 2\n");
        let right = yaml("a:\n  x: 1\nb: 3\n");
        let l = crate::path::get_by_path(&left, ".a").unwrap();
        let r = crate::path::get_by_path(&right, ".a").unwrap();
        let result = compare_at(Some((&left, l)), Some((&right, r)));
        assert_eq!(result.summary.total, 0);
    }
}
