//! Watch mode: filesystem events into the render pipeline.
//!
//! A notify watcher covers both source roots. Its callback runs on the
//! watcher's own thread, so events hop over a std channel and a bridge
//! thread into the tokio channel the single-threaded event loop reads.
//! The loop alternates between receiving events and draining the
//! scheduler when the nearest debounce deadline passes.

use super::Engine;
use crate::provider::{FsEvent, SourceKind};
use crate::state::is_shutdown;
use crate::{debug, log};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::Path;
use std::time::{Duration, Instant};

/// Cap on the debounce sleep so the shutdown flag stays responsive.
const MAX_SLEEP: Duration = Duration::from_millis(500);

impl Engine {
    pub async fn watch(&mut self) -> anyhow::Result<()> {
        let (std_tx, std_rx) = std::sync::mpsc::channel::<Event>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                std_tx.send(event).ok();
            }
        })?;
        watcher.watch(&self.content.root, RecursiveMode::Recursive)?;
        watcher.watch(&self.theme.root, RecursiveMode::Recursive)?;

        let (tx, mut rx) = tokio::sync::mpsc::channel::<Event>(64);
        std::thread::spawn(move || {
            while let Ok(event) = std_rx.recv() {
                if tx.blocking_send(event).is_err() {
                    break;
                }
            }
        });

        log!("watch"; "watching {} and {}",
            self.content.root.display(), self.theme.root.display());

        loop {
            if is_shutdown() {
                break;
            }
            let sleep = self.scheduler.sleep_duration().min(MAX_SLEEP);
            tokio::select! {
                biased;
                event = rx.recv() => {
                    match event {
                        Some(event) => self.on_notify(event),
                        None => break,
                    }
                }
                () = tokio::time::sleep(sleep) => {
                    for task in self.scheduler.take_due(Instant::now()) {
                        self.render(&task);
                    }
                    if !self.scheduler.is_empty() {
                        debug!("watch"; "{} renders pending", self.scheduler.len());
                    }
                }
            }
        }

        log!("watch"; "stopped");
        Ok(())
    }

    fn on_notify(&mut self, event: Event) {
        match event.kind {
            // Reads and metadata-only touches never change content.
            EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(_)) => return,
            _ => {}
        }

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            let source = if path.starts_with(&self.content.root) {
                SourceKind::Content
            } else if path.starts_with(&self.theme.root) {
                SourceKind::Theme
            } else {
                continue;
            };
            let Some(fs_event) = self.normalize_event(source, path) else {
                continue;
            };
            debug!("watch"; "{} {}", fs_event.label(), path.display());
            self.handle_event(source, fs_event, path);
        }
    }

    /// Reconcile a raw watcher event with tree and filesystem reality.
    ///
    /// Watchers report creates for paths the tree already knows (and
    /// vice versa, e.g. editors that replace files on save), so the
    /// event kind is decided from what is actually true now: gone and
    /// known is an unlink, present and known is a change, present and
    /// unknown is an add.
    fn normalize_event(&self, source: SourceKind, path: &Path) -> Option<FsEvent> {
        let provider = match source {
            SourceKind::Content => &self.content,
            SourceKind::Theme => &self.theme,
        };
        let rel = path.strip_prefix(&provider.root).ok()?;
        let known = provider.tree.get_node_by_path(rel);

        if !path.exists() {
            let id = known?;
            return Some(if provider.tree.node(id).is_dir {
                FsEvent::UnlinkDir
            } else {
                FsEvent::Unlink
            });
        }
        if known.is_some() {
            Some(FsEvent::Change)
        } else if path.is_dir() {
            Some(FsEvent::AddDir)
        } else {
            Some(FsEvent::Add)
        }
    }
}

/// Editor artifacts that must never reach the pipeline.
fn is_temp_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if name.starts_with('.') || name.ends_with('~') {
        return true;
    }
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
    )
}
