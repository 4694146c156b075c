//! Parsed binding path: nodes and indices.

use std::fmt::{self, Write as _};

/// One step of a binding path: an optional property access followed by an
/// optional indexer access.
///
/// `Items[0]` is a single node with property `Items` and one index; `[0]` (only
/// valid as the first node) has no property.
#[derive(Debug, Clone, PartialEq)]
pub struct PathNode {
    pub property: Option<String>,
    pub indices: Vec<Index>,
}

impl PathNode {
    /// A node that only accesses a property.
    pub fn property(name: impl Into<String>) -> Self {
        Self {
            property: Some(name.into()),
            indices: Vec::new(),
        }
    }

    /// Append an index (builder).
    pub fn with_index(mut self, index: Index) -> Self {
        self.indices.push(index);
        self
    }
}

/// An indexer argument as written in the path.
#[derive(Debug, Clone, PartialEq)]
pub enum Index {
    Boolean(bool),
    String(String),
    Number(f64),
    /// A nested path, evaluated against the binding's root data context.
    Path(Vec<PathNode>),
}

/// A parsed binding path expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingPath {
    pub(crate) nodes: Vec<PathNode>,
}

impl BindingPath {
    /// Wrap already-built nodes.
    pub fn from_nodes(nodes: Vec<PathNode>) -> Self {
        Self { nodes }
    }

    /// The nodes in evaluation order.
    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the path has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Canonical rendering
// ---------------------------------------------------------------------------

fn write_nodes(f: &mut fmt::Formatter<'_>, nodes: &[PathNode]) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            f.write_char('.')?;
        }
        write!(f, "{node}")?;
    }
    Ok(())
}

impl fmt::Display for BindingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_nodes(f, &self.nodes)
    }
}

impl fmt::Display for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.property {
            f.write_str(name)?;
        }
        if !self.indices.is_empty() {
            f.write_char('[')?;
            for (i, index) in self.indices.iter().enumerate() {
                if i > 0 {
                    f.write_char(',')?;
                }
                write!(f, "{index}")?;
            }
            f.write_char(']')?;
        }
        Ok(())
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::Boolean(b) => write!(f, "{b}"),
            Index::Number(n) => write!(f, "{n}"),
            Index::String(s) => write_quoted(f, s),
            Index::Path(nodes) => write_nodes(f, nodes),
        }
    }
}

/// Write `s` as a double-quoted literal the parser reads back unchanged.
fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if (c as u32) < 0x20 || c == '\u{7f}' => write!(f, "\\x{:02x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}
