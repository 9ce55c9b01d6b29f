//! Tree node types.

use std::path::PathBuf;
use std::time::SystemTime;

/// Handle into the tree arena.
///
/// Slots are never reused, so a stale id can never alias a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(super) u32);

impl NodeId {
    /// The tree root (always slot 0).
    pub const ROOT: Self = Self(0);

    #[inline]
    pub(super) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Classification assigned when a node enters the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    /// Structured data document (YAML)
    Data,
    /// Narrative document (markdown)
    Narrative,
    /// File copied byte-for-byte into the output
    Asset,
    /// Template source (theme tree only)
    Template,
    Other,
}

/// Extracted content, present only for kinds with an extraction rule.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Parsed YAML document
    Record(serde_yaml::Value),
    /// Markdown converted to HTML, post-processing applied
    Html(String),
    /// Raw template text
    Template(String),
}

impl NodeData {
    pub fn as_record(&self) -> Option<&serde_yaml::Value> {
        match self {
            Self::Record(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_template(&self) -> Option<&str> {
        match self {
            Self::Template(text) => Some(text),
            _ => None,
        }
    }
}

/// Filesystem metadata captured at snapshot time.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeStat {
    pub modified: Option<SystemTime>,
    pub size: u64,
}

impl NodeStat {
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        Self {
            modified: meta.modified().ok(),
            size: meta.len(),
        }
    }
}

/// One snapshot tree node.
///
/// `full_path` is tree-relative (empty for the root); `physical_path`
/// is the absolute filesystem location it mirrors.
#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub full_path: PathBuf,
    pub physical_path: PathBuf,
    pub is_dir: bool,
    pub kind: NodeKind,
    pub stat: NodeStat,
    pub data: Option<NodeData>,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
}

impl Node {
    /// A directory node; name and full_path are filled in on insert.
    pub fn directory(physical_path: PathBuf, stat: NodeStat) -> Self {
        Self {
            name: String::new(),
            full_path: PathBuf::new(),
            physical_path,
            is_dir: true,
            kind: NodeKind::Directory,
            stat,
            data: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// A file node; name and full_path are filled in on insert.
    pub fn file(physical_path: PathBuf, kind: NodeKind, stat: NodeStat) -> Self {
        Self {
            name: String::new(),
            full_path: PathBuf::new(),
            physical_path,
            is_dir: false,
            kind,
            stat,
            data: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}
