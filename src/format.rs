//! Serializers: tree back to YAML or JSON text.
//!
//! The YAML emitter writes block style with a configurable indent, trims
//! trailing blanks from scalar values and only quotes a string when reading
//! it back unquoted would change its meaning.

use std::io::{self, Write};
use std::path::Path;

use serde_json::Value as JsonValue;
use tempfile::NamedTempFile;

use crate::parse::Format;
use crate::tree::{infer_plain, Node, NodeId, NodeKind, ScalarType, Tree};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatOptions {
    pub indent: usize,
    pub sort_keys: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            sort_keys: false,
        }
    }
}

pub fn serialize(tree: &Tree, format: Format, options: &FormatOptions) -> String {
    match format {
        Format::Yaml => to_yaml(tree, options),
        Format::Json => {
            let mut out = to_json(tree, tree.root(), true);
            out.push('\n');
            out
        }
    }
}

pub fn to_yaml(tree: &Tree, options: &FormatOptions) -> String {
    let emitter = YamlEmitter {
        tree,
        indent: options.indent.max(2),
        sort_keys: options.sort_keys,
    };
    let mut lines = Vec::new();
    match tree.top() {
        Some(top) => emitter.emit_top(&mut lines, top),
        None => lines.push("null".to_string()),
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

struct YamlEmitter<'a> {
    tree: &'a Tree,
    indent: usize,
    sort_keys: bool,
}

impl YamlEmitter<'_> {
    fn emit_top(&self, lines: &mut Vec<String>, id: NodeId) {
        let node = self.tree.get(id);
        push_comment_lines(lines, "", &node.comments().head);
        match node.kind() {
            NodeKind::Mapping | NodeKind::Sequence if node.has_children() => {
                self.emit_block(lines, id, 0);
            }
            _ => lines.push(with_line_comment(self.inline_value(node), node)),
        }
        push_comment_lines(lines, "", &node.comments().foot);
    }

    /// Emits the contents of a non-empty container with every line starting
    /// at column `col`.
    fn emit_block(&self, lines: &mut Vec<String>, id: NodeId, col: usize) {
        let node = self.tree.get(id);
        let pad = " ".repeat(col);
        match node.kind() {
            NodeKind::Mapping => {
                for child_id in self.ordered_children(node) {
                    let child = self.tree.get(child_id);
                    push_comment_lines(lines, &pad, &child.comments().head);
                    let key = quote_if_needed(child.key().unwrap_or_default());
                    if child.is_container() && child.has_children() {
                        lines.push(with_line_comment(format!("{pad}{key}:"), child));
                        self.emit_block(lines, child_id, col + self.indent);
                    } else {
                        let value = self.inline_value(child);
                        lines.push(with_line_comment(format!("{pad}{key}: {value}"), child));
                    }
                    push_comment_lines(lines, &pad, &child.comments().foot);
                }
            }
            NodeKind::Sequence => {
                let dash = format!("-{}", " ".repeat(self.indent - 1));
                for child_id in node.children().iter().copied() {
                    let child = self.tree.get(child_id);
                    push_comment_lines(lines, &pad, &child.comments().head);
                    if child.is_container() && child.has_children() {
                        let start = lines.len();
                        self.emit_block(lines, child_id, col + self.indent);
                        // the item's first line carries the dash in place of its indent
                        if let Some(first) = lines.get_mut(start) {
                            let body = first[col + self.indent..].to_string();
                            *first = format!("{pad}{dash}{body}");
                        }
                    } else {
                        let value = self.inline_value(child);
                        lines.push(with_line_comment(format!("{pad}{dash}{value}"), child));
                    }
                    push_comment_lines(lines, &pad, &child.comments().foot);
                }
            }
            NodeKind::Document => {
                if let Some(top) = node.children().first() {
                    self.emit_block(lines, *top, col);
                }
            }
            NodeKind::Scalar | NodeKind::Alias => {
                lines.push(format!("{pad}{}", self.inline_value(node)));
            }
        }
    }

    fn ordered_children(&self, node: &Node) -> Vec<NodeId> {
        let mut children = node.children().to_vec();
        if self.sort_keys {
            children.sort_by(|a, b| self.tree.get(*a).key().cmp(&self.tree.get(*b).key()));
        }
        children
    }

    fn inline_value(&self, node: &Node) -> String {
        match node.kind() {
            NodeKind::Mapping => "{}".to_string(),
            NodeKind::Sequence => "[]".to_string(),
            NodeKind::Document => "null".to_string(),
            NodeKind::Alias => format!("*{}", node.value()),
            NodeKind::Scalar => scalar_text(node),
        }
    }
}

fn push_comment_lines(lines: &mut Vec<String>, pad: &str, comment: &str) {
    for line in comment.lines() {
        let line = line.trim_end();
        if line.starts_with('#') {
            lines.push(format!("{pad}{line}"));
        } else {
            lines.push(format!("{pad}# {line}"));
        }
    }
}

fn with_line_comment(mut line: String, node: &Node) -> String {
    let comment = node.comments().line.trim_end();
    if !comment.is_empty() {
        line.push(' ');
        if !comment.starts_with('#') {
            line.push_str("# ");
        }
        line.push_str(comment);
    }
    line
}

fn scalar_text(node: &Node) -> String {
    let value = node.value().trim_end_matches([' ', '\t']);
    match node.infer_type() {
        ScalarType::Null if value.is_empty() || value == "~" => "null".to_string(),
        ScalarType::String => quote_if_needed(value),
        // plain only when reading it back yields the same type
        kind => {
            let unsigned = value.strip_prefix('-').unwrap_or(value);
            if can_be_unquoted(unsigned) && infer_plain(value) == kind {
                value.to_string()
            } else {
                double_quoted(value)
            }
        }
    }
}

/// Plain text when it would read back as the same string, double-quoted otherwise.
fn quote_if_needed(value: &str) -> String {
    if can_be_unquoted(value) && infer_plain(value) == ScalarType::String {
        value.to_string()
    } else {
        double_quoted(value)
    }
}

fn double_quoted(value: &str) -> String {
    JsonValue::String(value.to_string()).to_string()
}

fn can_be_unquoted(value: &str) -> bool {
    if value.is_empty() || value != value.trim() {
        return false;
    }
    let special = [
        ':', '#', '[', ']', '{', '}', ',', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`', ' ',
        '\n', '\r', '\t',
    ];
    if value.contains(special) {
        return false;
    }
    !value.starts_with(['-', '?', ':'])
}

/// JSON text for the subtree at `from`. Mapping order is preserved.
pub fn to_json(tree: &Tree, from: NodeId, pretty: bool) -> String {
    let value = to_json_value(tree, from);
    if pretty {
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}

pub fn to_json_value(tree: &Tree, id: NodeId) -> JsonValue {
    let node = tree.get(id);
    match node.kind() {
        NodeKind::Document => node
            .children()
            .first()
            .map_or(JsonValue::Null, |top| to_json_value(tree, *top)),
        NodeKind::Mapping => {
            let mut map = serde_json::Map::new();
            for child in node.children() {
                let key = tree.get(*child).key().unwrap_or_default().to_string();
                map.insert(key, to_json_value(tree, *child));
            }
            JsonValue::Object(map)
        }
        NodeKind::Sequence => JsonValue::Array(
            node.children()
                .iter()
                .map(|child| to_json_value(tree, *child))
                .collect(),
        ),
        NodeKind::Scalar => scalar_to_json(node),
        NodeKind::Alias => JsonValue::String(node.value().to_string()),
    }
}

fn scalar_to_json(node: &Node) -> JsonValue {
    let value = node.value();
    match node.infer_type() {
        ScalarType::Null => JsonValue::Null,
        ScalarType::Boolean => {
            JsonValue::Bool(matches!(value.to_lowercase().as_str(), "true" | "yes" | "on"))
        }
        ScalarType::Number => {
            if let Ok(i) = value.parse::<i64>() {
                return JsonValue::from(i);
            }
            value
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map_or_else(|| JsonValue::String(value.to_string()), JsonValue::Number)
        }
        ScalarType::String | ScalarType::Timestamp => JsonValue::String(value.to_string()),
    }
}

/// Replaces `path` with `contents` only once the new bytes are fully on disk.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_json, parse_yaml};
    use crate::tree::{Comments, NodeData};

    fn yaml(source: &str, options: FormatOptions) -> String {
        to_yaml(&parse_yaml(source).unwrap(), &options)
    }

    #[test]
    fn nested_mappings_use_requested_indent() {
        let source = "app:\n  name: test\n  nested:\n    key: value\n";
        assert_eq!(yaml(source, FormatOptions::default()), source);

        let wide = yaml(source, FormatOptions { indent: 4, sort_keys: false });
        assert_eq!(wide, "app:\n    name: test\n    nested:\n        key: value\n");
    }

    #[test]
    fn sequences_of_mappings_put_dash_on_first_entry() {
        let source = "items:\n- name: a\n  port: 80\n- name: b\n- plain\n";
        let out = yaml(source, FormatOptions::default());
        assert_eq!(
            out,
            "items:\n  - name: a\n    port: 80\n  - name: b\n  - plain\n"
        );
    }

    #[test]
    fn nested_sequences_stack_dashes() {
        let out = yaml("- [1, 2]\n- []\n- {}\n", FormatOptions::default());
        assert_eq!(out, "- - 1\n  - 2\n- []\n- {}\n");
    }

    #[test]
    fn strings_are_quoted_only_when_needed() {
        let source = "a: 'plain'\nb: 'true'\nc: '123'\nd: 'has: colon'\ne: ''\nf: \"line\\nbreak\"\ng: 'trailing   '\n";
        let out = yaml(source, FormatOptions::default());
        assert_eq!(
            out,
            "a: plain\nb: \"true\"\nc: \"123\"\nd: \"has: colon\"\ne: \"\"\nf: \"line\\nbreak\"\ng: trailing\n"
        );
    }

    #[test]
    fn plain_scalars_keep_their_spelling() {
        let source = "version: 1.10\nmask: 0x1F\nbig: 1e3\nflag: True\nneg: -5\n";
        assert_eq!(yaml(source, FormatOptions::default()), source);
    }

    #[test]
    fn edited_typed_scalars_are_quoted_when_text_changes_meaning() {
        let mut tree = parse_yaml("port: 80\nok: true\nnone: null\n").unwrap();
        let top = tree.top().unwrap();
        let ids = tree.get(top).children().to_vec();
        tree.set_value(ids[0], "host: 80".to_string());
        tree.set_value(ids[1], "maybe".to_string());
        tree.set_value(ids[2], "#".to_string());
        let out = to_yaml(&tree, &FormatOptions::default());
        assert_eq!(out, "port: \"host: 80\"\nok: \"maybe\"\nnone: \"#\"\n");
        assert!(parse_yaml(&out).is_ok());
    }

    #[test]
    fn sort_keys_is_recursive() {
        let out = yaml(
            "zeta: 1\nalpha:\n  y: 2\n  b: 3\n",
            FormatOptions {
                indent: 2,
                sort_keys: true,
            },
        );
        assert_eq!(out, "alpha:\n  b: 3\n  y: 2\nzeta: 1\n");
    }

    #[test]
    fn formatted_output_reparses_to_same_shape() {
        let source = "server:\n  host: example.com\n  ports: [80, 443]\n  tls: true\nnote: \"a # b\"\n";
        let tree = parse_yaml(source).unwrap();
        let again = parse_yaml(&to_yaml(&tree, &FormatOptions::default())).unwrap();
        assert_eq!(
            to_json_value(&tree, tree.root()),
            to_json_value(&again, again.root())
        );
    }

    #[test]
    fn comments_are_emitted() {
        let mut tree = Tree::new();
        let map = tree.insert(tree.root(), None, NodeData::mapping());
        let name = tree.insert(map, Some("name".into()), NodeData::scalar("demo"));
        tree.set_comments(
            name,
            Comments {
                head: "# Top comment".into(),
                line: "inline".into(),
                foot: String::new(),
            },
        );
        let out = to_yaml(&tree, &FormatOptions::default());
        assert_eq!(out, "# Top comment\nname: demo # inline\n");
    }

    #[test]
    fn json_encoding_uses_inferred_types() {
        let tree = parse_yaml("n: ~\nb: true\ni: 42\nf: 1.5\ns: hello\nl: [1, two]\n").unwrap();
        let json = to_json(&tree, tree.root(), false);
        assert_eq!(
            json,
            r#"{"n":null,"b":true,"i":42,"f":1.5,"s":"hello","l":[1,"two"]}"#
        );
    }

    #[test]
    fn json_round_trip_keeps_order() {
        let source = r#"{"b":1,"a":{"c":[true,null]}}"#;
        let tree = parse_json(source).unwrap();
        assert_eq!(to_json(&tree, tree.root(), false), source);
    }

    #[test]
    fn write_atomic_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.yaml");
        std::fs::write(&path, "old: 1\n").unwrap();
        write_atomic(&path, "new: 2\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new: 2\n");
    }
}
