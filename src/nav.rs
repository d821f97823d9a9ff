//! Cursor, viewport, fold and search state over a [`Tree`].
//!
//! The visible list is derived data: it is rebuilt from the tree's fold
//! flags after every structural change. The tree itself is borrowed per
//! call, so only one component mutates it at a time.

use std::collections::HashSet;

use tracing::trace;

use crate::tree::{NodeId, NodeKind, Tree};

#[derive(Clone, Debug)]
pub struct NavState {
    visible: Vec<NodeId>,
    cursor: usize,
    offset: usize,
    viewport_height: usize,
    matches: Vec<usize>,
    match_index: usize,
}

impl NavState {
    pub fn new(tree: &Tree) -> Self {
        let mut nav = Self {
            visible: Vec::new(),
            cursor: 0,
            offset: 0,
            viewport_height: 1,
            matches: Vec::new(),
            match_index: 0,
        };
        nav.rebuild(tree);
        nav
    }

    /// Re-flattens the visible rows. Document nodes are never rows.
    pub fn rebuild(&mut self, tree: &Tree) {
        self.visible = tree
            .flatten_visible(tree.root())
            .into_iter()
            .filter(|id| tree.get(*id).kind() != NodeKind::Document)
            .collect();
        self.clamp_cursor();
        trace!(target: "nav", rows = self.visible.len(), "flattened");
    }

    pub fn visible(&self) -> &[NodeId] {
        &self.visible
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn viewport_height(&self) -> usize {
        self.viewport_height
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height.max(1);
        self.adjust_offset();
    }

    pub fn current(&self) -> Option<NodeId> {
        self.visible.get(self.cursor).copied()
    }

    /// Rows currently inside the viewport, as `(row index, node)`.
    pub fn window(&self) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        self.visible
            .iter()
            .copied()
            .enumerate()
            .skip(self.offset)
            .take(self.viewport_height)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let last = self.visible.len().saturating_sub(1);
        let target = self.cursor.saturating_add_signed(delta);
        self.cursor = target.min(last);
        self.adjust_offset();
    }

    pub fn page_down(&mut self) {
        self.move_cursor(self.page());
    }

    pub fn page_up(&mut self) {
        self.move_cursor(-self.page());
    }

    pub fn half_page_down(&mut self) {
        self.move_cursor(self.page() / 2);
    }

    pub fn half_page_up(&mut self) {
        self.move_cursor(-(self.page() / 2));
    }

    pub fn top(&mut self) {
        self.cursor = 0;
        self.offset = 0;
    }

    pub fn bottom(&mut self) {
        self.cursor = self.visible.len().saturating_sub(1);
        self.adjust_offset();
    }

    /// Flips the fold state of a container with children. Returns whether
    /// anything changed.
    pub fn toggle_fold(&mut self, tree: &mut Tree, id: NodeId) -> bool {
        let node = tree.get(id);
        if !node.is_foldable() {
            return false;
        }
        let collapsed = !node.is_collapsed();
        tree.set_collapsed(id, collapsed);
        trace!(target: "nav", node = id.index(), collapsed, "toggle_fold");
        self.rebuild(tree);
        true
    }

    pub fn toggle_current(&mut self, tree: &mut Tree) -> bool {
        match self.current() {
            Some(id) => self.toggle_fold(tree, id),
            None => false,
        }
    }

    pub fn expand_all(&mut self, tree: &mut Tree) {
        set_all_folds(tree, |_| false);
        self.rebuild(tree);
    }

    /// Collapses every container below the top level, which stays open.
    pub fn collapse_all(&mut self, tree: &mut Tree) {
        set_all_folds(tree, |depth| depth > 0);
        self.rebuild(tree);
        self.offset = 0;
        self.adjust_offset();
    }

    /// Case-insensitive search over keys and values of the whole tree.
    ///
    /// Ancestors of every hit are expanded so the hit becomes visible. The
    /// cursor is left alone; returns the number of matching rows.
    pub fn search(&mut self, tree: &mut Tree, query: &str) -> usize {
        self.clear_search();
        if query.is_empty() {
            return 0;
        }
        let needle = query.to_lowercase();

        let mut hits = Vec::new();
        tree.walk_all(tree.root(), &mut |node| {
            if node.kind() == NodeKind::Document {
                return true;
            }
            let key_hit = node
                .key()
                .is_some_and(|key| key.to_lowercase().contains(&needle));
            if key_hit || node.value().to_lowercase().contains(&needle) {
                hits.push(node.id());
            }
            true
        });

        for hit in &hits {
            expand_ancestors(tree, *hit);
        }
        self.rebuild(tree);
        let hits: HashSet<NodeId> = hits.into_iter().collect();

        self.matches = self
            .visible
            .iter()
            .enumerate()
            .filter(|(_, id)| hits.contains(id))
            .map(|(row, _)| row)
            .collect();
        trace!(target: "nav", query, matches = self.matches.len(), "search");
        self.matches.len()
    }

    /// Opens every ancestor of `id` and puts the cursor on it.
    pub fn reveal(&mut self, tree: &mut Tree, id: NodeId) {
        expand_ancestors(tree, id);
        self.rebuild(tree);
        if let Some(row) = self.visible.iter().position(|visible| *visible == id) {
            self.cursor = row;
            self.adjust_offset();
        }
    }

    pub fn clear_search(&mut self) {
        self.matches.clear();
        self.match_index = 0;
    }

    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    pub fn match_index(&self) -> usize {
        self.match_index
    }

    pub fn is_match(&self, row: usize) -> bool {
        self.matches.binary_search(&row).is_ok()
    }

    pub fn jump_to_first_match(&mut self) {
        if let Some(first) = self.matches.first() {
            self.match_index = 0;
            self.cursor = *first;
            self.adjust_offset();
        }
    }

    pub fn next_match(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        self.match_index = (self.match_index + 1) % self.matches.len();
        self.cursor = self.matches[self.match_index];
        self.adjust_offset();
    }

    pub fn prev_match(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        self.match_index = if self.match_index == 0 {
            self.matches.len() - 1
        } else {
            self.match_index - 1
        };
        self.cursor = self.matches[self.match_index];
        self.adjust_offset();
    }

    fn page(&self) -> isize {
        isize::try_from(self.viewport_height).unwrap_or(isize::MAX)
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.visible.len().saturating_sub(1));
        self.adjust_offset();
    }

    /// Scrolls just enough to keep the cursor row on screen.
    fn adjust_offset(&mut self) {
        if self.cursor < self.offset {
            self.offset = self.cursor;
        }
        if self.cursor >= self.offset + self.viewport_height {
            self.offset = self.cursor + 1 - self.viewport_height;
        }
    }
}

fn expand_ancestors(tree: &mut Tree, id: NodeId) {
    let lineage: Vec<NodeId> = tree.ancestors(id).collect();
    for ancestor in lineage {
        tree.set_collapsed(ancestor, false);
    }
}

fn set_all_folds<F>(tree: &mut Tree, collapse_at: F)
where
    F: Fn(usize) -> bool,
{
    let foldable: Vec<(NodeId, usize)> = tree
        .nodes()
        .filter(|node| node.is_foldable() && node.kind() != NodeKind::Document)
        .map(|node| (node.id(), node.depth()))
        .collect();
    for (id, depth) in foldable {
        tree.set_collapsed(id, collapse_at(depth));
    }
}
