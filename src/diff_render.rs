//! Text output for `yam diff`.

use crossterm::style::{Color, Stylize};

use crate::diff::{DiffNode, DiffResult, DiffSummary, DiffType};
use crate::tree::{Node, NodeKind};

const ADDED: Color = Color::Rgb {
    r: 166,
    g: 227,
    b: 161,
};
const REMOVED: Color = Color::Rgb {
    r: 243,
    g: 139,
    b: 168,
};
const MODIFIED: Color = Color::Rgb {
    r: 249,
    g: 226,
    b: 175,
};
const UNCHANGED: Color = Color::Rgb {
    r: 108,
    g: 112,
    b: 134,
};
const KEY: Color = Color::Rgb {
    r: 137,
    g: 180,
    b: 250,
};

pub fn diff_color(diff_type: DiffType) -> Color {
    match diff_type {
        DiffType::Added => ADDED,
        DiffType::Removed => REMOVED,
        DiffType::Modified => MODIFIED,
        DiffType::Unchanged => UNCHANGED,
    }
}

struct Painter {
    color: bool,
}

impl Painter {
    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }
}

/// Renders changed entries only, with a `---`/`+++` header and a trailing
/// summary when anything differs.
pub fn render(result: &DiffResult<'_>, left_name: &str, right_name: &str, color: bool) -> String {
    let painter = Painter { color };
    let mut out = String::new();

    if !left_name.is_empty() || !right_name.is_empty() {
        out.push_str(&format!("--- {left_name}\n+++ {right_name}\n\n"));
    }
    if let Some(root) = &result.root {
        render_node(&painter, &mut out, root, "");
    }
    if result.summary.has_changes() {
        out.push('\n');
        out.push_str(&render_summary(&result.summary, color));
        out.push('\n');
    }
    out
}

pub fn render_summary(summary: &DiffSummary, color: bool) -> String {
    if !summary.has_changes() {
        return "Summary: no changes".to_string();
    }
    let painter = Painter { color };
    format!(
        "Summary: {}, {}, {}",
        painter.paint(&format!("{} added", summary.added), ADDED),
        painter.paint(&format!("{} removed", summary.removed), REMOVED),
        painter.paint(&format!("{} modified", summary.modified), MODIFIED),
    )
}

/// Short value text: scalars verbatim, containers as `{...}` / `[N items]`.
pub fn describe(node: &Node) -> String {
    match node.kind() {
        NodeKind::Mapping => "{...}".to_string(),
        NodeKind::Sequence => format!("[{} items]", node.children().len()),
        NodeKind::Alias => format!("*{}", node.value()),
        NodeKind::Scalar | NodeKind::Document => node.value().to_string(),
    }
}

fn render_node(painter: &Painter, out: &mut String, node: &DiffNode<'_>, indent: &str) {
    if !node.is_changed() {
        return;
    }
    let is_container = node
        .primary()
        .is_some_and(|n| matches!(n.kind(), NodeKind::Mapping | NodeKind::Sequence));
    let key = node.label();

    if node.is_document() || (key.is_empty() && is_container && !node.children.is_empty()) {
        for child in &node.children {
            render_node(painter, out, child, indent);
        }
        return;
    }

    let tint = diff_color(node.diff_type);
    out.push_str(&painter.paint(&format!("{}{indent}", node.diff_type.marker()), tint));
    if !key.is_empty() {
        out.push_str(&painter.paint(&key, KEY));
    }

    let rest = match (node.left, node.right) {
        (Some(left), Some(right)) if node.children.is_empty() => {
            format!("{} → {}", describe(left), describe(right))
        }
        _ if is_container && !node.children.is_empty() => String::new(),
        _ => node.primary().map(describe).unwrap_or_default(),
    };
    let separator = match (key.is_empty(), rest.is_empty()) {
        (true, _) => "",
        (false, true) => ":",
        (false, false) => ": ",
    };
    out.push_str(&painter.paint(&format!("{separator}{rest}"), tint));
    out.push('\n');

    let child_indent = format!("{indent}  ");
    for child in &node.children {
        render_node(painter, out, child, &child_indent);
    }
}
