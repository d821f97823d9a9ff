//! Path queries such as `.server.containers[0].image`.

use thiserror::Error;

use crate::tree::{NodeId, NodeKind, Tree};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path must start with '.': {0}")]
    MissingDot(String),
    #[error("unclosed bracket in path: {0}")]
    UnclosedBracket(String),
    #[error("invalid array index: {0}")]
    InvalidIndex(String),
    #[error("path not found: {0}")]
    NotFound(String),
    #[error("expected array index, got: {0}")]
    ExpectedIndex(String),
    #[error("array index out of bounds: {index} (length: {len})")]
    OutOfBounds { index: usize, len: usize },
    #[error("cannot traverse into scalar value at: {0}")]
    ScalarTraversal(String),
}

/// Splits a query into raw segments. `""` and `"."` address the root.
///
/// Bracketed segments must be integers; dotted segments are kept verbatim so
/// `.items.0` still addresses a sequence element.
pub fn parse_path(query: &str) -> Result<Vec<String>, PathError> {
    if query.is_empty() || query == "." {
        return Ok(Vec::new());
    }
    let Some(rest) = query.strip_prefix('.') else {
        return Err(PathError::MissingDot(query.to_string()));
    };

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while let Some(c) = rest[i..].chars().next() {
        match c {
            '.' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                i += 1;
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                let Some(end) = rest[i..].find(']') else {
                    return Err(PathError::UnclosedBracket(rest.to_string()));
                };
                let index = &rest[i + 1..i + end];
                if index.parse::<usize>().is_err() {
                    return Err(PathError::InvalidIndex(index.to_string()));
                }
                segments.push(index.to_string());
                i += end + 1;
            }
            _ => {
                current.push(c);
                i += c.len_utf8();
            }
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }
    Ok(segments)
}

/// Resolves a query against the tree, starting below the document node.
pub fn get_by_path(tree: &Tree, query: &str) -> Result<NodeId, PathError> {
    let segments = parse_path(query)?;
    let mut current = tree.root();
    if let Some(top) = tree.top() {
        current = top;
    }
    if segments.is_empty() {
        return Ok(current);
    }

    for segment in segments {
        let node = tree.get(current);
        current = match node.kind() {
            NodeKind::Mapping => node
                .children()
                .iter()
                .copied()
                .find(|child| tree.get(*child).key() == Some(segment.as_str()))
                .ok_or_else(|| PathError::NotFound(segment.clone()))?,
            NodeKind::Sequence => {
                let index: usize = segment
                    .parse()
                    .map_err(|_| PathError::ExpectedIndex(segment.clone()))?;
                let len = node.children().len();
                *node
                    .children()
                    .get(index)
                    .ok_or(PathError::OutOfBounds { index, len })?
            }
            NodeKind::Document | NodeKind::Scalar | NodeKind::Alias => {
                return Err(PathError::ScalarTraversal(segment));
            }
        };
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_yaml;

    #[test]
    fn parses_dotted_and_bracketed_segments() {
        assert_eq!(parse_path("").unwrap(), Vec::<String>::new());
        assert_eq!(parse_path(".").unwrap(), Vec::<String>::new());
        assert_eq!(
            parse_path(".server.containers[0].image").unwrap(),
            vec!["server", "containers", "0", "image"]
        );
        assert_eq!(parse_path(".items[12][3]").unwrap(), vec!["items", "12", "3"]);
    }

    #[test]
    fn rejects_malformed_queries() {
        assert_eq!(
            parse_path("server"),
            Err(PathError::MissingDot("server".to_string()))
        );
        assert!(matches!(
            parse_path(".items[0"),
            Err(PathError::UnclosedBracket(_))
        ));
        assert_eq!(
            parse_path(".items[x]"),
            Err(PathError::InvalidIndex("x".to_string()))
        );
    }

    #[test]
    fn resolves_nodes() {
        let tree = parse_yaml("data:\n  host: localhost\n  ports: [80, 443]\n").unwrap();
        let host = get_by_path(&tree, ".data.host").unwrap();
        assert_eq!(tree.get(host).value(), "localhost");
        let port = get_by_path(&tree, ".data.ports[1]").unwrap();
        assert_eq!(tree.get(port).value(), "443");
        let dotted = get_by_path(&tree, ".data.ports.0").unwrap();
        assert_eq!(tree.get(dotted).value(), "80");
        assert_eq!(get_by_path(&tree, ".").unwrap(), tree.top().unwrap());
    }

    #[test]
    fn reports_lookup_failures() {
        let tree = parse_yaml("data:\n  host: localhost\n  ports: [80]\n").unwrap();
        assert_eq!(
            get_by_path(&tree, ".data.user"),
            Err(PathError::NotFound("user".to_string()))
        );
        assert_eq!(
            get_by_path(&tree, ".data.ports[3]"),
            Err(PathError::OutOfBounds { index: 3, len: 1 })
        );
        assert_eq!(
            get_by_path(&tree, ".data.ports.first"),
            Err(PathError::ExpectedIndex("first".to_string()))
        );
        assert_eq!(
            get_by_path(&tree, ".data.host.name"),
            Err(PathError::ScalarTraversal("name".to_string()))
        );
    }
}
