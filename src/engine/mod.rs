//! Engine: providers, index, scheduler and renderer wired together.
//!
//! `build` runs the initial crawl and drains one render batch;
//! `watch` (in the `watch` submodule) keeps feeding filesystem events
//! through the same path afterwards.

mod watch;


use crate::index::DependencyIndex;
use crate::logger::{status_error, status_success};
use crate::provider::content::LAYOUT_FILE;
use crate::provider::{DispatchCtx, FsEvent, SourceKind, SourceProvider, content, theme};
use crate::render::asset::render_asset;
use crate::render::page::render_page;
use crate::render::{RenderError, RenderOutcome, Renderer};
use crate::scheduler::{RenderScheduler, RenderTarget, RenderTask};
use crate::tree::NodeKind;
use crate::utils::{normalize_path, slash_path};
use crate::{debug, log};
use anyhow::{Context, bail};
use std::path::Path;

pub struct Engine {
    content: SourceProvider,
    theme: SourceProvider,
    index: DependencyIndex,
    scheduler: RenderScheduler,
    renderer: Renderer,
    /// Initial build finished; switches logging to watch status lines.
    ready: bool,
}

impl Engine {
    /// Set up an engine over `<root>/content`, `<root>/theme` and
    /// `<root>/dist`. Missing source roots are fatal here, before any
    /// pipeline work starts.
    pub fn new(root: &Path, production: bool) -> anyhow::Result<Self> {
        let root = normalize_path(root);
        let content_root = root.join("content");
        let theme_root = root.join("theme");
        if !content_root.is_dir() {
            bail!("content directory not found at {}", content_root.display());
        }
        if !theme_root.is_dir() {
            bail!("theme directory not found at {}", theme_root.display());
        }

        let ignore = vec![".DS_Store".to_string()];
        Ok(Self {
            content: SourceProvider::content(content_root, ignore.clone()),
            theme: SourceProvider::theme(theme_root, ignore),
            index: DependencyIndex::new(),
            scheduler: RenderScheduler::new(),
            renderer: Renderer::new(root.join("dist"), production),
            ready: false,
        })
    }

    /// Full build: clear dist, crawl both sources through the normal
    /// event path, drain the resulting render batch once.
    pub fn build(&mut self) -> anyhow::Result<()> {
        if self.renderer.dist.exists() {
            std::fs::remove_dir_all(&self.renderer.dist).with_context(|| {
                format!("cannot clear dist at {}", self.renderer.dist.display())
            })?;
        }
        std::fs::create_dir_all(&self.renderer.dist)?;

        // Theme first so templates are registered before pages ask for
        // them.
        for (event, path) in self.theme.scan() {
            self.handle_event(SourceKind::Theme, event, &path);
        }
        for (event, path) in self.content.scan() {
            self.handle_event(SourceKind::Content, event, &path);
        }

        let tasks = self.scheduler.drain();
        log!("render"; "building {} targets", tasks.len());
        for task in tasks {
            self.render(&task);
        }
        self.scheduler.finish_startup();
        self.ready = true;
        log!("render"; "build finished -> {}", self.renderer.dist.display());
        Ok(())
    }

    /// Feed one normalized filesystem event through provider, index
    /// and scheduler.
    pub fn handle_event(&mut self, source: SourceKind, event: FsEvent, path: &Path) {
        match event {
            FsEvent::Unlink | FsEvent::UnlinkDir => self.remove(source, path),
            _ => {
                let provider = match source {
                    SourceKind::Content => &mut self.content,
                    SourceKind::Theme => &mut self.theme,
                };
                let Some(id) = provider.process(event, path) else {
                    return;
                };
                let mut ctx = DispatchCtx {
                    tree: &provider.tree,
                    index: &mut self.index,
                    scheduler: &mut self.scheduler,
                };
                match source {
                    SourceKind::Content => content::dispatch(&mut ctx, id),
                    SourceKind::Theme => theme::dispatch(&mut ctx, event, id),
                }
            }
        }
    }

    /// Unlink handling: clean up index entries, then detach the node.
    fn remove(&mut self, source: SourceKind, path: &Path) {
        let provider = match source {
            SourceKind::Content => &mut self.content,
            SourceKind::Theme => &mut self.theme,
        };
        let Ok(rel) = path.strip_prefix(&provider.root) else {
            return;
        };
        let rel = rel.to_path_buf();

        match source {
            SourceKind::Content => {
                if rel.file_name().is_some_and(|name| name == LAYOUT_FILE) {
                    // The page loses its layout, not just one file.
                    let page = rel.parent().unwrap_or(Path::new(""));
                    self.index.unregister_page(page);
                } else if provider
                    .tree
                    .get_node_by_path(&rel)
                    .is_some_and(|id| provider.tree.node(id).is_dir)
                {
                    self.index.unregister_page(&rel);
                }
            }
            SourceKind::Theme => {
                let is_template = provider
                    .tree
                    .get_node_by_path(&rel)
                    .is_some_and(|id| provider.tree.node(id).kind == NodeKind::Template);
                if is_template {
                    if let Some(stem) = rel.file_stem().and_then(|s| s.to_str()) {
                        // Leave the entry alone if another file took
                        // the name over in the meantime.
                        if self.index.template_path(stem) == Some(rel.as_path()) {
                            self.index.remove_template(stem);
                        }
                    }
                }
            }
        }

        if provider.tree.remove_node_by_path(&rel).is_some() {
            debug!("watch"; "removed {}", slash_path(&rel));
        }
    }

    /// Execute a due render task. The target is re-resolved by path;
    /// a node deleted since scheduling is a silent no-op.
    fn render(&mut self, task: &RenderTask) {
        match &task.target {
            RenderTarget::Content(path) => {
                let Some(id) = self.content.tree.get_node_by_path(path) else {
                    return;
                };
                let result = if self.content.tree.node(id).is_dir {
                    render_page(
                        &self.renderer,
                        &self.content.tree,
                        id,
                        &self.index,
                        &self.theme.tree,
                    )
                } else {
                    render_asset(&self.renderer, &self.content.tree, id)
                };
                self.report(path, result);
            }
            RenderTarget::Theme(path) => {
                let Some(id) = self.theme.tree.get_node_by_path(path) else {
                    return;
                };
                let result = render_asset(&self.renderer, &self.theme.tree, id);
                self.report(path, result);
            }
        }
    }

    fn report(&self, path: &Path, result: Result<RenderOutcome, RenderError>) {
        let label = slash_path(path);
        match result {
            Ok(RenderOutcome::Written(_) | RenderOutcome::Copied(_)) => {
                if self.ready {
                    status_success(&label);
                } else {
                    debug!("render"; "{label}");
                }
            }
            Ok(RenderOutcome::Skipped) => {}
            Err(RenderError::MissingTemplate(name)) => {
                log!("render"; "skipped {label}: no template '{name}'");
            }
            Err(e) => {
                // Render the full cause chain, not just the top error.
                let chain = format!("{:#}", anyhow::Error::new(e));
                if self.ready {
                    status_error(&format!("failed: {label}"), &chain);
                } else {
                    log!("error"; "failed: {label}: {chain}");
                }
            }
        }
    }
}
