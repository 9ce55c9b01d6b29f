//! Source providers.
//!
//! A provider owns the snapshot tree for one source directory and is
//! the only thing that mutates it. Two instances exist: the content
//! provider (`content/`) and the theme provider (`theme/`), differing
//! only in their template extension and dispatch policy (see the
//! `content` and `theme` submodules).

pub mod content;
pub mod theme;

use crate::index::DependencyIndex;
use crate::log;
use crate::scheduler::RenderScheduler;
use crate::markdown;
use crate::site::site;
use crate::tree::{Node, NodeData, NodeId, NodeKind, NodeStat, SnapshotTree};
use crate::utils::slash_path;
use jwalk::WalkDir;
use std::path::{Path, PathBuf};

/// Filesystem change kinds the providers understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEvent {
    Add,
    AddDir,
    Change,
    Unlink,
    UnlinkDir,
}

impl FsEvent {
    pub fn label(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::AddDir => "addDir",
            Self::Change => "change",
            Self::Unlink => "unlink",
            Self::UnlinkDir => "unlinkDir",
        }
    }
}

/// Which source a provider mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Content,
    Theme,
}

/// Borrowed view of the engine state a dispatch may touch. The tree is
/// the dispatching provider's own.
pub struct DispatchCtx<'a> {
    pub tree: &'a SnapshotTree,
    pub index: &'a mut DependencyIndex,
    pub scheduler: &'a mut RenderScheduler,
}

/// Extensions copied byte-for-byte into the output.
const ASSET_EXTS: [&str; 7] = ["jpg", "jpeg", "svg", "png", "pdf", "css", "bmp"];

/// An asset is either a known binary/stylesheet extension or anything
/// under an `assets` path segment.
pub fn is_asset_path(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if ASSET_EXTS.contains(&ext.to_ascii_lowercase().as_str()) {
            return true;
        }
    }
    path.components()
        .any(|c| c.as_os_str().eq_ignore_ascii_case("assets"))
}

pub struct SourceProvider {
    pub root: PathBuf,
    /// Basenames skipped entirely (OS metadata files)
    ignore: Vec<String>,
    /// Extension classified as Template (theme provider only)
    template_ext: Option<&'static str>,
    pub tree: SnapshotTree,
}

impl SourceProvider {
    pub fn content(root: PathBuf, ignore: Vec<String>) -> Self {
        Self {
            tree: SnapshotTree::new(root.clone()),
            root,
            ignore,
            template_ext: None,
        }
    }

    pub fn theme(root: PathBuf, ignore: Vec<String>) -> Self {
        Self {
            tree: SnapshotTree::new(root.clone()),
            root,
            ignore,
            template_ext: Some("html"),
        }
    }

    /// Enumerate the source directory, shortest paths first so every
    /// directory precedes its children. Returns synthetic add events
    /// for the engine to feed through the normal pipeline.
    pub fn scan(&self) -> Vec<(FsEvent, PathBuf)> {
        let mut entries: Vec<(PathBuf, bool)> = WalkDir::new(&self.root)
            .skip_hidden(false)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.depth > 0)
            .map(|entry| (entry.path(), entry.file_type().is_dir()))
            .collect();
        entries.sort_by(|a, b| {
            let depth_a = a.0.components().count();
            let depth_b = b.0.components().count();
            depth_a.cmp(&depth_b).then_with(|| a.0.cmp(&b.0))
        });

        entries
            .into_iter()
            .map(|(path, is_dir)| {
                let event = if is_dir { FsEvent::AddDir } else { FsEvent::Add };
                (event, path)
            })
            .collect()
    }

    /// Apply one filesystem event to the tree.
    ///
    /// Returns the affected node for add/change events so the caller
    /// can dispatch render decisions. Ignored basenames and unlink
    /// events return `None` (unlinks are handled by the engine before
    /// the tree mutation).
    pub fn process(&mut self, event: FsEvent, path: &Path) -> Option<NodeId> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let name = rel.file_name()?.to_string_lossy();
        if self.ignore.iter().any(|ignored| ignored == name.as_ref()) {
            return None;
        }

        match event {
            FsEvent::Add | FsEvent::AddDir => self.insert(rel, path),
            FsEvent::Change => match self.tree.get_node_by_path(rel) {
                Some(id) => {
                    self.refresh(id, path);
                    Some(id)
                }
                // A change for a node we never saw is an add in disguise.
                None => self.insert(rel, path),
            },
            FsEvent::Unlink | FsEvent::UnlinkDir => None,
        }
    }

    fn insert(&mut self, rel: &Path, path: &Path) -> Option<NodeId> {
        let meta = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) => {
                log!("error"; "cannot stat {}: {e}", path.display());
                return None;
            }
        };
        let stat = NodeStat::from_metadata(&meta);

        let node = if meta.is_dir() {
            Node::directory(path.to_path_buf(), stat)
        } else {
            let kind = self.classify(rel);
            let mut node = Node::file(path.to_path_buf(), kind, stat);
            node.data = self.cast(kind, rel, path);
            node
        };

        let id = self.tree.add_node_by_path(rel, node);
        if id.is_none() {
            log!("error"; "no parent in tree for {}", slash_path(rel));
        }
        id
    }

    fn refresh(&mut self, id: NodeId, path: &Path) {
        if let Ok(meta) = std::fs::metadata(path) {
            self.tree.node_mut(id).stat = NodeStat::from_metadata(&meta);
        }
        let (kind, rel) = {
            let node = self.tree.node(id);
            (node.kind, node.full_path.clone())
        };
        if !self.tree.node(id).is_dir {
            let data = self.cast(kind, &rel, path);
            self.tree.node_mut(id).data = data;
        }
    }

    /// Classification by extension, in declaration order. Directories
    /// never reach this.
    fn classify(&self, rel: &Path) -> NodeKind {
        let ext = rel
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "yaml" | "yml" => NodeKind::Data,
            "md" | "markdown" => NodeKind::Narrative,
            _ if Some(ext.as_str()) == self.template_ext => NodeKind::Template,
            _ if is_asset_path(rel) => NodeKind::Asset,
            _ => NodeKind::Other,
        }
    }

    /// Extract node data according to kind.
    ///
    /// A malformed document is a hard extraction failure: the node
    /// carries no data at all, and consumers see it as missing.
    fn cast(&self, kind: NodeKind, rel: &Path, path: &Path) -> Option<NodeData> {
        let read = || match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                log!("error"; "cannot read {}: {e}", path.display());
                None
            }
        };

        match kind {
            NodeKind::Data => {
                let text = read()?;
                match serde_yaml::from_str::<serde_yaml::Value>(&text) {
                    Ok(value) => Some(NodeData::Record(value)),
                    Err(e) => {
                        log!("error"; "malformed yaml in {}: {e}", slash_path(rel));
                        None
                    }
                }
            }
            NodeKind::Narrative => {
                let text = read()?;
                let html = markdown::to_html(&text);
                let dir = slash_path(rel.parent().unwrap_or(Path::new("")));
                Some(NodeData::Html(markdown::postprocess(&html, &dir, &site())))
            }
            NodeKind::Template => Some(NodeData::Template(read()?)),
            _ => None,
        }
    }
}
