//! Tree rendering: one display line per node, as styled segments plus a
//! plain-text copy for stdout.

use clap::ValueEnum;
use ratatui::style::{Color, Modifier, Style};
use serde::Deserialize;

use crate::tree::{Node, NodeId, NodeKind, ScalarType, Tree};

#[derive(Clone, Debug)]
pub struct StyledSegment {
    pub text: String,
    pub style: Style,
}

#[derive(Clone, Debug)]
pub struct RenderedLine {
    pub node: NodeId,
    pub segments: Vec<StyledSegment>,
    pub plain: String,
}

impl RenderedLine {
    fn new(node: NodeId) -> Self {
        Self {
            node,
            segments: Vec::new(),
            plain: String::new(),
        }
    }

    fn push(&mut self, text: impl Into<String>, style: Style) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.plain.push_str(&text);
        self.segments.push(StyledSegment { text, style });
    }
}

/// Joins rendered lines for non-interactive output.
pub fn plain_text(lines: &[RenderedLine]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&line.plain);
        out.push('\n');
    }
    out
}

#[derive(Clone, Debug)]
pub struct Theme {
    pub key: Style,
    pub separator: Style,
    pub string: Style,
    pub number: Style,
    pub boolean: Style,
    pub null: Style,
    pub timestamp: Style,
    pub alias: Style,
    pub comment: Style,
    pub branch: Style,
    pub collapsed: Style,
    pub type_label: Style,
}

impl Default for Theme {
    fn default() -> Self {
        let muted = Color::Rgb(139, 148, 158);
        Self {
            key: Style::default()
                .fg(Color::Rgb(121, 192, 255))
                .add_modifier(Modifier::BOLD),
            separator: Style::default().fg(Color::Rgb(201, 209, 217)),
            string: Style::default().fg(Color::Rgb(165, 214, 255)),
            number: Style::default().fg(Color::Rgb(121, 192, 255)),
            boolean: Style::default().fg(Color::Rgb(255, 123, 114)),
            null: Style::default().fg(muted).add_modifier(Modifier::ITALIC),
            timestamp: Style::default().fg(Color::Rgb(210, 168, 255)),
            alias: Style::default()
                .fg(Color::Rgb(255, 166, 87))
                .add_modifier(Modifier::ITALIC),
            comment: Style::default().fg(muted).add_modifier(Modifier::ITALIC),
            branch: Style::default().fg(Color::Rgb(72, 79, 88)),
            collapsed: Style::default().fg(muted),
            type_label: Style::default().fg(Color::DarkGray),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeStyle {
    #[default]
    Unicode,
    Ascii,
    Indent,
}

#[derive(Clone, Copy, Debug)]
pub struct TreeChars {
    pub vertical: &'static str,
    pub horizontal: &'static str,
    pub corner: &'static str,
    pub tee: &'static str,
    pub collapsed: &'static str,
    pub expanded: &'static str,
}

impl TreeStyle {
    pub fn chars(self) -> TreeChars {
        match self {
            TreeStyle::Unicode => TreeChars {
                vertical: "│",
                horizontal: "─",
                corner: "└",
                tee: "├",
                collapsed: "▶",
                expanded: "▼",
            },
            TreeStyle::Ascii => TreeChars {
                vertical: "|",
                horizontal: "-",
                corner: "`",
                tee: "+",
                collapsed: "+",
                expanded: "-",
            },
            TreeStyle::Indent => TreeChars {
                vertical: " ",
                horizontal: " ",
                corner: " ",
                tee: " ",
                collapsed: "+",
                expanded: "-",
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RenderOptions {
    pub tree_style: TreeStyle,
    pub show_types: bool,
    /// Adds fold markers in front of containers.
    pub interactive: bool,
}

pub struct TreeRenderer {
    theme: Theme,
    options: RenderOptions,
    chars: TreeChars,
}

impl TreeRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            theme: Theme::default(),
            options,
            chars: options.tree_style.chars(),
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Renders the subtree below `from`, skipping document nodes. With
    /// `visible_only`, collapsed containers hide their descendants.
    pub fn render(&self, tree: &Tree, from: NodeId, visible_only: bool) -> Vec<RenderedLine> {
        let base_depth = tree.get(from).depth();
        let mut lines = Vec::new();
        let mut visit = |node: &Node| {
            if node.kind() != NodeKind::Document {
                lines.push(self.render_line(tree, node.id(), base_depth));
            }
            true
        };
        if visible_only {
            tree.walk_visible(from, &mut visit);
        } else {
            tree.walk_all(from, &mut visit);
        }
        lines
    }

    /// Renders a single row. Nodes at `base_depth` get no branch prefix.
    pub fn render_line(&self, tree: &Tree, id: NodeId, base_depth: usize) -> RenderedLine {
        let node = tree.get(id);
        let mut line = RenderedLine::new(id);

        if node.depth() > base_depth {
            let mut prefix = String::new();
            let mut lineage: Vec<NodeId> = tree
                .ancestors(id)
                .take_while(|a| tree.get(*a).depth() > base_depth)
                .collect();
            lineage.reverse();
            for ancestor in lineage {
                if tree.is_last_child(ancestor) {
                    prefix.push_str("    ");
                } else {
                    prefix.push_str(self.chars.vertical);
                    prefix.push_str("   ");
                }
            }
            let joint = if tree.is_last_child(id) {
                self.chars.corner
            } else {
                self.chars.tee
            };
            prefix.push_str(joint);
            prefix.push_str(self.chars.horizontal);
            prefix.push(' ');
            line.push(prefix, self.theme.branch);
        }

        if self.options.interactive && node.is_foldable() {
            let marker = if node.is_collapsed() {
                self.chars.collapsed
            } else {
                self.chars.expanded
            };
            line.push(format!("{marker} "), self.theme.branch);
        }

        if let Some(key) = node.key().filter(|k| !k.is_empty()) {
            line.push(key, self.theme.key);
            line.push(": ", self.theme.separator);
        }

        match node.kind() {
            NodeKind::Mapping if node.is_collapsed() => line.push("{...}", self.theme.collapsed),
            NodeKind::Sequence if node.is_collapsed() => line.push(
                format!("[{} items]", node.children().len()),
                self.theme.collapsed,
            ),
            NodeKind::Sequence if node.key().is_none() => line.push("-", self.theme.branch),
            NodeKind::Scalar => self.push_value(&mut line, node),
            NodeKind::Alias => line.push(format!("*{}", node.value()), self.theme.alias),
            NodeKind::Mapping | NodeKind::Sequence | NodeKind::Document => {}
        }

        let comment = &node.comments().line;
        if !comment.is_empty() {
            line.push(" ", Style::default());
            line.push(comment.as_str(), self.theme.comment);
        }
        line
    }

    fn push_value(&self, line: &mut RenderedLine, node: &Node) {
        let value = node.value();
        let scalar_type = node.infer_type();
        match scalar_type {
            ScalarType::Null if value.is_empty() || value == "~" => {
                line.push("null", self.theme.null);
            }
            ScalarType::Null => line.push(value, self.theme.null),
            ScalarType::Boolean => line.push(value, self.theme.boolean),
            ScalarType::Number => line.push(value, self.theme.number),
            ScalarType::Timestamp => line.push(value, self.theme.timestamp),
            ScalarType::String if needs_quoting(value) => {
                line.push(format!("{value:?}"), self.theme.string);
            }
            ScalarType::String => line.push(value, self.theme.string),
        }
        if self.options.show_types {
            line.push(" ", Style::default());
            line.push(scalar_type.label(), self.theme.type_label);
        }
    }
}

/// Strings that would read as another type, or that hide whitespace, are
/// displayed quoted.
pub fn needs_quoting(value: &str) -> bool {
    if value.is_empty() {
        return true;
    }
    if matches!(
        value.to_lowercase().as_str(),
        "true" | "false" | "yes" | "no" | "on" | "off" | "null" | "~"
    ) {
        return true;
    }
    if value != value.trim() {
        return true;
    }
    value.contains([':', '#', '\n', '\t'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_yaml;

    fn plain(tree: &Tree, options: RenderOptions) -> Vec<String> {
        TreeRenderer::new(options)
            .render(tree, tree.root(), true)
            .into_iter()
            .map(|line| line.plain)
            .collect()
    }

    #[test]
    fn unicode_branches() {
        let tree = parse_yaml("name: demo\nitems:\n  - a\n  - b\nempty: ''\n").unwrap();
        let lines = plain(&tree, RenderOptions::default());
        assert_eq!(
            lines,
            vec![
                "",
                "├─ name: demo",
                "├─ items: ",
                "│   ├─ a",
                "│   └─ b",
                "└─ empty: \"\"",
            ]
        );
    }

    #[test]
    fn ascii_and_indent_styles() {
        let tree = parse_yaml("a:\n  b: 1\nc: 2\n").unwrap();
        let ascii = plain(
            &tree,
            RenderOptions {
                tree_style: TreeStyle::Ascii,
                ..RenderOptions::default()
            },
        );
        assert_eq!(ascii, vec!["", "+- a: ", "|   `- b: 1", "`- c: 2"]);

        let indent = plain(
            &tree,
            RenderOptions {
                tree_style: TreeStyle::Indent,
                ..RenderOptions::default()
            },
        );
        assert_eq!(indent[2], "       b: 1");
    }

    #[test]
    fn fold_markers_and_collapsed_summaries() {
        let mut tree = parse_yaml("meta:\n  a: 1\nlist:\n  - x\n  - y\n").unwrap();
        let top = tree.top().unwrap();
        let meta = tree.get(top).children()[0];
        let list = tree.get(top).children()[1];
        tree.set_collapsed(meta, true);
        tree.set_collapsed(list, true);

        let lines = plain(
            &tree,
            RenderOptions {
                interactive: true,
                ..RenderOptions::default()
            },
        );
        assert_eq!(
            lines,
            vec!["▼ ", "├─ ▶ meta: {...}", "└─ ▶ list: [2 items]"]
        );
    }

    #[test]
    fn scalar_values_and_type_labels() {
        let tree = parse_yaml("n: ~\nb: true\ns: 'yes'\ni: 3\nq: 'a: b'\n").unwrap();
        let lines = plain(
            &tree,
            RenderOptions {
                show_types: true,
                ..RenderOptions::default()
            },
        );
        assert_eq!(lines[1], "├─ n: null <null>");
        assert_eq!(lines[2], "├─ b: true <bool>");
        assert_eq!(lines[3], "├─ s: \"yes\" <str>");
        assert_eq!(lines[4], "├─ i: 3 <int>");
        assert_eq!(lines[5], "└─ q: \"a: b\" <str>");
    }

    #[test]
    fn keyless_sequences_show_dash() {
        let tree = parse_yaml("- - inner\n").unwrap();
        let lines = plain(&tree, RenderOptions::default());
        assert_eq!(lines, vec!["-", "└─ -", "    └─ inner"]);
    }

    #[test]
    fn subtree_rendering_starts_flush() {
        let tree = parse_yaml("a:\n  b:\n    c: 1\n").unwrap();
        let b = crate::path::get_by_path(&tree, ".a.b").unwrap();
        let lines: Vec<_> = TreeRenderer::new(RenderOptions::default())
            .render(&tree, b, false)
            .into_iter()
            .map(|l| l.plain)
            .collect();
        assert_eq!(lines, vec!["b: ", "└─ c: 1"]);
    }

    #[test]
    fn quoting_rules() {
        assert!(needs_quoting(""));
        assert!(needs_quoting("No"));
        assert!(needs_quoting(" padded"));
        assert!(needs_quoting("a#b"));
        assert!(needs_quoting("tab\there"));
        assert!(!needs_quoting("plain text"));
        assert!(!needs_quoting("http//x"));
    }
}
