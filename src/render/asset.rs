//! Asset rendering: byte-for-byte copies into the dist tree.

use super::{RenderError, RenderOutcome, Renderer};
use crate::tree::{NodeId, NodeKind, SnapshotTree};
use std::fs;

/// Copy an asset node into the dist tree, mirroring its tree path.
///
/// The copy is skipped when the destination already exists and is not
/// strictly older than the snapshot's modification time. Non-asset
/// nodes and directories are skipped outright.
pub fn render_asset(
    renderer: &Renderer,
    tree: &SnapshotTree,
    id: NodeId,
) -> Result<RenderOutcome, RenderError> {
    let node = tree.node(id);
    if node.is_dir || node.kind != NodeKind::Asset {
        return Ok(RenderOutcome::Skipped);
    }

    let dest = renderer.dist.join(&node.full_path);
    if let (Ok(dest_meta), Some(src_modified)) = (fs::metadata(&dest), node.stat.modified) {
        let dest_modified = dest_meta.modified().ok();
        if dest_modified.is_some_and(|dest_time| dest_time >= src_modified) {
            return Ok(RenderOutcome::Skipped);
        }
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(&node.physical_path, &dest)?;
    Ok(RenderOutcome::Copied(dest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FsEvent, SourceProvider};
    use std::path::Path;
    use tempfile::TempDir;

    fn provider_with(files: &[(&str, &str)]) -> SourceProvider {
        let tmp = TempDir::new().unwrap();
        let root = tmp.keep();
        for (rel, content) in files {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
        }
        let mut provider = SourceProvider::content(root, vec![]);
        for (event, path) in provider.scan() {
            provider.process(event, &path);
        }
        provider
    }

    #[test]
    fn test_copies_into_mirrored_path() {
        let provider = provider_with(&[("blog/pic.png", "pngbytes")]);
        let dist = TempDir::new().unwrap();
        let renderer = Renderer::new(dist.path().to_path_buf(), false);
        let id = provider
            .tree
            .get_node_by_path(Path::new("blog/pic.png"))
            .unwrap();

        let outcome = render_asset(&renderer, &provider.tree, id).unwrap();
        let expected = dist.path().join("blog/pic.png");
        assert_eq!(outcome, RenderOutcome::Copied(expected.clone()));
        assert_eq!(fs::read_to_string(expected).unwrap(), "pngbytes");
    }

    #[test]
    fn test_up_to_date_copy_is_skipped() {
        let provider = provider_with(&[("pic.png", "pngbytes")]);
        let dist = TempDir::new().unwrap();
        let renderer = Renderer::new(dist.path().to_path_buf(), false);
        let id = provider.tree.get_node_by_path(Path::new("pic.png")).unwrap();

        assert!(matches!(
            render_asset(&renderer, &provider.tree, id).unwrap(),
            RenderOutcome::Copied(_)
        ));
        // Destination now at least as new as the snapshot.
        assert_eq!(
            render_asset(&renderer, &provider.tree, id).unwrap(),
            RenderOutcome::Skipped
        );
    }

    #[test]
    fn test_newer_source_recopies() {
        let mut provider = provider_with(&[("pic.png", "v1")]);
        let dist = TempDir::new().unwrap();
        let renderer = Renderer::new(dist.path().to_path_buf(), false);
        let id = provider.tree.get_node_by_path(Path::new("pic.png")).unwrap();
        render_asset(&renderer, &provider.tree, id).unwrap();

        // Bump the source past the copied destination.
        std::thread::sleep(std::time::Duration::from_millis(20));
        let src = provider.root.join("pic.png");
        fs::write(&src, "v2").unwrap();
        provider.process(FsEvent::Change, &src).unwrap();

        assert!(matches!(
            render_asset(&renderer, &provider.tree, id).unwrap(),
            RenderOutcome::Copied(_)
        ));
        assert_eq!(
            fs::read_to_string(dist.path().join("pic.png")).unwrap(),
            "v2"
        );
    }

    #[test]
    fn test_non_asset_is_skipped() {
        let provider = provider_with(&[("notes.txt", "text")]);
        let dist = TempDir::new().unwrap();
        let renderer = Renderer::new(dist.path().to_path_buf(), false);
        let id = provider
            .tree
            .get_node_by_path(Path::new("notes.txt"))
            .unwrap();
        assert_eq!(
            render_asset(&renderer, &provider.tree, id).unwrap(),
            RenderOutcome::Skipped
        );
        assert!(!dist.path().join("notes.txt").exists());
    }
}
