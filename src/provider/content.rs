//! Content-side dispatch policy.
//!
//! Decides, per processed content event, what must re-render and what
//! the dependency index must learn. Two documents get special handling:
//! the per-directory layout declaration (`conf.yaml`) and the
//! site-level configuration (`site.yaml` at the content root).

use super::DispatchCtx;
use crate::scheduler::RenderTask;
use crate::site::{SiteData, replace_site};
use crate::tree::{NodeId, NodeKind};
use crate::{debug, log};
use std::path::Path;

/// Per-directory layout declaration document.
pub const LAYOUT_FILE: &str = "conf.yaml";
/// Site-level configuration document, recognized at the tree root only.
pub const SITE_FILE: &str = "site.yaml";

/// Route a processed content add/change to index updates and render
/// requests.
pub fn dispatch(ctx: &mut DispatchCtx, id: NodeId) {
    let node = ctx.tree.node(id);

    if node.is_dir {
        ctx.scheduler.feed(RenderTask::content(&node.full_path));
        return;
    }

    if node.name == LAYOUT_FILE {
        update_layout_index(ctx, id);
    }

    if node.full_path == Path::new(SITE_FILE) {
        reload_site(ctx, id);
        return;
    }

    // Documents render through their page directory; everything else
    // is its own target (the renderer copies assets, skips the rest).
    let node = ctx.tree.node(id);
    match node.kind {
        NodeKind::Data | NodeKind::Narrative => {
            let parent = node.full_path.parent().unwrap_or(Path::new(""));
            ctx.scheduler.feed(RenderTask::content(parent));
        }
        _ => ctx.scheduler.feed(RenderTask::content(&node.full_path)),
    }
}

/// Register the declaring directory under its `template` name.
fn update_layout_index(ctx: &mut DispatchCtx, id: NodeId) {
    let node = ctx.tree.node(id);
    let template = node
        .data
        .as_ref()
        .and_then(|data| data.as_record())
        .and_then(|record| record.get("template"))
        .and_then(|value| value.as_str());
    let Some(template) = template else {
        return;
    };
    let page = node.full_path.parent().unwrap_or(Path::new(""));
    ctx.index.register_page(template, page);
}

/// Replace the global site data and fan a render request out to every
/// directory in the tree.
fn reload_site(ctx: &mut DispatchCtx, id: NodeId) {
    let record = ctx
        .tree
        .node(id)
        .data
        .as_ref()
        .and_then(|data| data.as_record());
    let Some(record) = record else {
        return;
    };
    match SiteData::from_value(record) {
        Ok(data) => {
            replace_site(data);
            log!("watch"; "site configuration reloaded");
        }
        Err(e) => {
            log!("error"; "invalid {}: {e}", SITE_FILE);
            return;
        }
    }

    let mut queued = 0usize;
    for dir in ctx.tree.walk(NodeId::ROOT) {
        let node = ctx.tree.node(dir);
        if node.is_dir {
            ctx.scheduler.feed(RenderTask::content(&node.full_path));
            queued += 1;
        }
    }
    debug!("watch"; "site change queued {queued} directory renders");
}
