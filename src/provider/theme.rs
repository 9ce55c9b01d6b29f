//! Theme-side dispatch policy.
//!
//! Template files register themselves in the dependency index by file
//! stem; a template change propagates through the fragment-usage graph
//! to the content pages that must re-render. Non-template theme files
//! go through the asset render like content assets.

use super::{DispatchCtx, FsEvent};
use crate::scheduler::RenderTask;
use crate::tree::{NodeId, NodeKind};
use rustc_hash::FxHashSet;

/// Route a processed theme add/change.
pub fn dispatch(ctx: &mut DispatchCtx, event: FsEvent, id: NodeId) {
    let node = ctx.tree.node(id);
    if node.is_dir {
        return;
    }

    match node.kind {
        NodeKind::Template => {
            let Some(stem) = node.full_path.file_stem().and_then(|s| s.to_str()) else {
                return;
            };
            let stem = stem.to_string();
            let path = node.full_path.clone();
            ctx.index.register_template(&stem, &path);
            if event == FsEvent::Change {
                propagate(ctx, &stem);
            }
        }
        _ => ctx.scheduler.feed(RenderTask::theme(&node.full_path)),
    }
}

/// Re-render every page transitively affected by a template change.
///
/// Leaf templates re-render their registered pages directly. A
/// fragment (a template under a `components` segment) is resolved
/// through textual scanning: every template whose stored text contains
/// an inclusion directive naming the fragment joins the walk. The
/// visited set caps each template at one expansion, so inclusion
/// cycles terminate.
fn propagate(ctx: &mut DispatchCtx, changed: &str) {
    let mut visited: FxHashSet<String> = FxHashSet::default();
    visited.insert(changed.to_string());
    let mut worklist = vec![changed.to_string()];

    while let Some(name) = worklist.pop() {
        for page in ctx.index.pages_for(&name) {
            ctx.scheduler.feed(RenderTask::content(&page));
        }

        if !is_fragment(ctx, &name) {
            continue;
        }
        for id in ctx.tree.walk(NodeId::ROOT) {
            let node = ctx.tree.node(id);
            if node.kind != NodeKind::Template {
                continue;
            }
            let Some(stem) = node.full_path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if visited.contains(stem) {
                continue;
            }
            let Some(text) = node.data.as_ref().and_then(|data| data.as_template()) else {
                continue;
            };
            if uses_fragment(text, &name) {
                visited.insert(stem.to_string());
                worklist.push(stem.to_string());
            }
        }
    }
}

fn is_fragment(ctx: &DispatchCtx, name: &str) -> bool {
    ctx.index
        .template_path(name)
        .is_some_and(|path| path.components().any(|c| c.as_os_str() == "components"))
}

/// The two accepted textual inclusion forms.
fn uses_fragment(text: &str, name: &str) -> bool {
    text.contains(&format!(r#"include "../{name}/{name}.html""#))
        || text.contains(&format!(r#"include "../components/{name}/{name}.html""#))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DependencyIndex;
    use crate::provider::SourceProvider;
    use crate::scheduler::{RenderScheduler, RenderTarget};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn setup(files: &[(&str, &str)]) -> (SourceProvider, DependencyIndex, RenderScheduler) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.keep();
        for (rel, content) in files {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
        }
        let mut provider = SourceProvider::theme(root, vec![]);
        let mut index = DependencyIndex::new();
        let mut scheduler = RenderScheduler::new();
        for (event, path) in provider.scan() {
            if let Some(id) = provider.process(event, &path) {
                let mut ctx = DispatchCtx {
                    tree: &provider.tree,
                    index: &mut index,
                    scheduler: &mut scheduler,
                };
                dispatch(&mut ctx, event, id);
            }
        }
        scheduler.drain();
        (provider, index, scheduler)
    }

    fn change(
        provider: &mut SourceProvider,
        index: &mut DependencyIndex,
        scheduler: &mut RenderScheduler,
        rel: &str,
    ) {
        let path = provider.root.join(rel);
        let id = provider.process(FsEvent::Change, &path).unwrap();
        let mut ctx = DispatchCtx {
            tree: &provider.tree,
            index,
            scheduler,
        };
        dispatch(&mut ctx, FsEvent::Change, id);
    }

    #[test]
    fn test_scan_registers_templates_by_stem() {
        let (_, index, _) = setup(&[
            ("post/post.html", "<main></main>"),
            ("components/nav/nav.html", "<nav></nav>"),
        ]);
        assert_eq!(index.template_path("post"), Some(Path::new("post/post.html")));
        assert_eq!(
            index.template_path("nav"),
            Some(Path::new("components/nav/nav.html"))
        );
    }

    #[test]
    fn test_leaf_change_renders_registered_pages() {
        let (mut provider, mut index, mut scheduler) =
            setup(&[("post/post.html", "<main></main>")]);
        index.register_page("post", Path::new("blog/a"));
        index.register_page("post", Path::new("blog/b"));

        change(&mut provider, &mut index, &mut scheduler, "post/post.html");

        let targets: Vec<_> = scheduler.drain().into_iter().map(|t| t.target).collect();
        assert!(targets.contains(&RenderTarget::Content(PathBuf::from("blog/a"))));
        assert!(targets.contains(&RenderTarget::Content(PathBuf::from("blog/b"))));
    }

    #[test]
    fn test_fragment_change_propagates_to_users() {
        let (mut provider, mut index, mut scheduler) = setup(&[
            (
                "post/post.html",
                r#"<body>{% include "../components/nav/nav.html" %}</body>"#,
            ),
            ("page/page.html", "<body>no includes</body>"),
            ("components/nav/nav.html", "<nav></nav>"),
        ]);
        index.register_page("post", Path::new("blog/a"));
        index.register_page("page", Path::new("about"));

        change(
            &mut provider,
            &mut index,
            &mut scheduler,
            "components/nav/nav.html",
        );

        let targets: Vec<_> = scheduler.drain().into_iter().map(|t| t.target).collect();
        assert!(targets.contains(&RenderTarget::Content(PathBuf::from("blog/a"))));
        assert!(!targets.contains(&RenderTarget::Content(PathBuf::from("about"))));
    }

    #[test]
    fn test_fragment_chain_propagates_transitively() {
        let (mut provider, mut index, mut scheduler) = setup(&[
            (
                "post/post.html",
                r#"{% include "../components/card/card.html" %}"#,
            ),
            (
                "components/card/card.html",
                r#"{% include "../icon/icon.html" %}"#,
            ),
            ("components/icon/icon.html", "<svg></svg>"),
        ]);
        index.register_page("post", Path::new("blog/a"));

        change(
            &mut provider,
            &mut index,
            &mut scheduler,
            "components/icon/icon.html",
        );

        let targets: Vec<_> = scheduler.drain().into_iter().map(|t| t.target).collect();
        assert!(targets.contains(&RenderTarget::Content(PathBuf::from("blog/a"))));
    }

    #[test]
    fn test_cyclic_includes_terminate() {
        let (mut provider, mut index, mut scheduler) = setup(&[
            (
                "components/a/a.html",
                r#"{% include "../b/b.html" %}"#,
            ),
            (
                "components/b/b.html",
                r#"{% include "../a/a.html" %}"#,
            ),
        ]);
        index.register_page("a", Path::new("pa"));
        index.register_page("b", Path::new("pb"));

        change(
            &mut provider,
            &mut index,
            &mut scheduler,
            "components/a/a.html",
        );

        let targets: Vec<_> = scheduler.drain().into_iter().map(|t| t.target).collect();
        assert!(targets.contains(&RenderTarget::Content(PathBuf::from("pa"))));
        assert!(targets.contains(&RenderTarget::Content(PathBuf::from("pb"))));
    }

    #[test]
    fn test_non_template_theme_file_feeds_asset_render() {
        let (mut provider, mut index, mut scheduler) = setup(&[("assets/site.css", "body{}")]);
        change(&mut provider, &mut index, &mut scheduler, "assets/site.css");
        let targets: Vec<_> = scheduler.drain().into_iter().map(|t| t.target).collect();
        assert_eq!(
            targets,
            [RenderTarget::Theme(PathBuf::from("assets/site.css"))]
        );
    }

    #[test]
    fn test_template_change_wins_registration_race() {
        let (mut provider, mut index, mut scheduler) =
            setup(&[("post/post.html", "<main></main>")]);
        // A change re-registers even if the index entry was dropped.
        index.remove_template("post");
        change(&mut provider, &mut index, &mut scheduler, "post/post.html");
        assert_eq!(index.template_path("post"), Some(Path::new("post/post.html")));
    }
}
