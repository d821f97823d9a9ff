//! Scalar editing with bounded undo/redo and dirty tracking.

use std::collections::{HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::format::{self, FormatOptions};
use crate::parse::Format;
use crate::tree::{NodeId, NodeKind, Tree};

/// Oldest entries are evicted past this depth.
pub const MAX_UNDO: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndoEntry {
    pub node: NodeId,
    pub old_value: String,
    pub new_value: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("Cannot edit: not a scalar value")]
    NotScalar,
    #[error("Cannot edit: read-only (stdin)")]
    ReadOnly,
    #[error("not editing")]
    NotEditing,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Cannot save: read-only (stdin)")]
    ReadOnly,
    #[error("No changes to save")]
    NothingToSave,
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Clone, Debug)]
struct PendingEdit {
    node: NodeId,
    original: String,
}

#[derive(Clone, Debug, Default)]
pub struct EditSession {
    read_only: bool,
    undo_stack: VecDeque<UndoEntry>,
    redo_stack: Vec<UndoEntry>,
    modified_nodes: HashSet<NodeId>,
    modified: bool,
    pending: Option<PendingEdit>,
}

impl EditSession {
    pub fn new(read_only: bool) -> Self {
        Self {
            read_only,
            ..Self::default()
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_editing(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_modified(&self) -> bool {
        self.modified || !self.modified_nodes.is_empty()
    }

    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.modified_nodes.contains(&id)
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Begins editing `id`, returning its current value for the input buffer.
    pub fn start_edit(&mut self, tree: &Tree, id: NodeId) -> Result<String, EditError> {
        let node = tree.get(id);
        if node.kind() != NodeKind::Scalar {
            return Err(EditError::NotScalar);
        }
        if self.read_only {
            return Err(EditError::ReadOnly);
        }
        let original = node.value().to_string();
        self.pending = Some(PendingEdit {
            node: id,
            original: original.clone(),
        });
        Ok(original)
    }

    pub fn cancel_edit(&mut self) {
        self.pending = None;
    }

    /// Applies the pending edit. Returns whether the value changed.
    pub fn confirm_edit(&mut self, tree: &mut Tree, new_value: &str) -> Result<bool, EditError> {
        let pending = self.pending.take().ok_or(EditError::NotEditing)?;
        if new_value == pending.original {
            return Ok(false);
        }

        self.push_undo(UndoEntry {
            node: pending.node,
            old_value: pending.original,
            new_value: new_value.to_string(),
        });
        tree.set_value(pending.node, new_value.to_string());
        self.modified = true;
        self.modified_nodes.insert(pending.node);
        debug!(target: "edit", node = pending.node.index(), "value_changed");
        Ok(true)
    }

    /// Reverts the newest edit. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self, tree: &mut Tree) -> bool {
        let Some(entry) = self.undo_stack.pop_back() else {
            return false;
        };
        tree.set_value(entry.node, entry.old_value.clone());
        self.redo_stack.push(entry);
        self.recompute_dirty(tree);
        true
    }

    /// Re-applies the newest undone edit.
    pub fn redo(&mut self, tree: &mut Tree) -> bool {
        let Some(entry) = self.redo_stack.pop() else {
            return false;
        };
        tree.set_value(entry.node, entry.new_value.clone());
        self.modified = true;
        self.modified_nodes.insert(entry.node);
        self.undo_stack.push_back(entry);
        true
    }

    /// Serializes the whole tree and replaces `path` atomically. History is
    /// kept; only the dirty state is cleared.
    pub fn save(&mut self, tree: &Tree, path: &Path, format: Format) -> Result<(), SaveError> {
        if self.read_only {
            return Err(SaveError::ReadOnly);
        }
        if !self.is_modified() {
            return Err(SaveError::NothingToSave);
        }

        let text = format::serialize(tree, format, &FormatOptions::default());
        format::write_atomic(path, &text).map_err(|source| SaveError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.modified = false;
        self.modified_nodes.clear();
        info!(target: "io", file = %path.display(), bytes = text.len(), "saved");
        Ok(())
    }

    fn push_undo(&mut self, entry: UndoEntry) {
        self.undo_stack.push_back(entry);
        if self.undo_stack.len() > MAX_UNDO {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
    }

    /// A node is dirty while some remaining undo entry shows its current
    /// value differs from an earlier one.
    fn recompute_dirty(&mut self, tree: &Tree) {
        self.modified_nodes = self
            .undo_stack
            .iter()
            .filter(|entry| tree.get(entry.node).value() != entry.old_value)
            .map(|entry| entry.node)
            .collect();
        self.modified = !self.modified_nodes.is_empty();
    }
}
