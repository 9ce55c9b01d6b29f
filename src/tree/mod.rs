//! Snapshot tree mirroring a source directory.
//!
//! An arena-backed ownership tree: each source provider holds one,
//! rooted at its source directory. Nodes are addressed by tree-relative
//! path. Arena slots are append-only; removal detaches a subtree from
//! its parent without visiting descendants, and re-adding a path always
//! allocates a fresh node.

mod node;

pub use node::{Node, NodeData, NodeId, NodeKind, NodeStat};

use std::path::{Component, Path, PathBuf};

pub struct SnapshotTree {
    nodes: Vec<Node>,
}

impl SnapshotTree {
    /// Create a tree whose root mirrors `physical_root`.
    pub fn new(physical_root: PathBuf) -> Self {
        let mut root = Node::directory(physical_root, NodeStat::default());
        root.full_path = PathBuf::new();
        Self { nodes: vec![root] }
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Child ids of `id`, in insertion order.
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Look up a direct child by name.
    pub fn child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[id.index()]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child.index()].name == name)
    }

    /// Resolve a tree-relative path. The empty path is the root.
    pub fn get_node_by_path(&self, path: &Path) -> Option<NodeId> {
        let mut current = NodeId::ROOT;
        for component in path.components() {
            let Component::Normal(name) = component else {
                return None;
            };
            current = self.child_by_name(current, &name.to_string_lossy())?;
        }
        Some(current)
    }

    /// Insert `node` at `path`, returning its id.
    ///
    /// The parent directory must already exist (scans enumerate
    /// shortest-path-first, so it always does in practice). If a child
    /// with the same name exists it is replaced in place: a fresh arena
    /// slot takes over its position in the parent's child list and the
    /// old node is orphaned.
    pub fn add_node_by_path(&mut self, path: &Path, mut node: Node) -> Option<NodeId> {
        let parent_path = path.parent().unwrap_or(Path::new(""));
        let name = path.file_name()?.to_string_lossy().into_owned();
        let parent = self.get_node_by_path(parent_path)?;
        if !self.nodes[parent.index()].is_dir {
            return None;
        }

        node.name = name.clone();
        node.full_path = path.to_path_buf();
        node.parent = Some(parent);

        let id = NodeId(u32::try_from(self.nodes.len()).ok()?);
        self.nodes.push(node);

        let position = self.nodes[parent.index()]
            .children
            .iter()
            .position(|&child| self.nodes[child.index()].name == name);
        match position {
            Some(slot) => {
                let old = self.nodes[parent.index()].children[slot];
                self.nodes[old.index()].parent = None;
                self.nodes[parent.index()].children[slot] = id;
            }
            None => self.nodes[parent.index()].children.push(id),
        }
        Some(id)
    }

    /// Detach the subtree at `path` from its parent.
    ///
    /// Descendants are not visited; the whole subtree simply becomes
    /// unreachable. Returns the detached id, or `None` if the path does
    /// not resolve (or names the root).
    pub fn remove_node_by_path(&mut self, path: &Path) -> Option<NodeId> {
        let id = self.get_node_by_path(path)?;
        let parent = self.nodes[id.index()].parent?;
        self.nodes[parent.index()].children.retain(|&child| child != id);
        self.nodes[id.index()].parent = None;
        Some(id)
    }

    /// Depth-first preorder walk of the subtree rooted at `id`.
    pub fn walk(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for &child in self.nodes[current.index()].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }
}
