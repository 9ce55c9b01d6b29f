//! Render scheduler with per-target debouncing.
//!
//! Each render target has a stable id; feeding an id that is already
//! pending cancels its timer and starts a fresh quiet window, so a
//! burst of events on one file collapses into a single render. The
//! scheduler holds no timer of its own: the engine event loop sleeps
//! for `sleep_duration()` and then drains `take_due()`.

use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Quiet window before a pending render fires.
const QUIET_MS: u64 = 100;

/// Sleep when nothing is pending (the loop wakes on events anyway).
const IDLE_SLEEP: Duration = Duration::from_secs(86_400);

/// What a scheduled render points at. Paths are tree-relative and
/// re-resolved against the tree when the task fires, so a target
/// deleted mid-debounce renders as a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    /// A node in the content tree (page directory or asset file)
    Content(PathBuf),
    /// A node in the theme tree (non-template theme asset)
    Theme(PathBuf),
}

#[derive(Debug, Clone)]
pub struct RenderTask {
    pub id: String,
    pub target: RenderTarget,
}

impl RenderTask {
    pub fn content(path: &Path) -> Self {
        Self {
            id: format!("content:{}", path.display()),
            target: RenderTarget::Content(path.to_path_buf()),
        }
    }

    pub fn theme(path: &Path) -> Self {
        Self {
            id: format!("theme:{}", path.display()),
            target: RenderTarget::Theme(path.to_path_buf()),
        }
    }
}

struct Entry {
    task: RenderTask,
    deadline: Instant,
}

pub struct RenderScheduler {
    pending: FxHashMap<String, Entry>,
    /// Startup mode: tasks become due immediately and are drained once
    /// after the initial crawl.
    immediate: bool,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self {
            pending: FxHashMap::default(),
            immediate: true,
        }
    }

    /// Leave startup mode; subsequent feeds debounce normally.
    pub fn finish_startup(&mut self) {
        self.immediate = false;
    }

    /// Enqueue a task, replacing any pending entry with the same id.
    pub fn feed(&mut self, task: RenderTask) {
        let delay = if self.immediate {
            Duration::ZERO
        } else {
            Duration::from_millis(QUIET_MS)
        };
        let deadline = Instant::now() + delay;
        self.pending.insert(task.id.clone(), Entry { task, deadline });
    }

    /// Remove and return every task whose quiet window has expired.
    pub fn take_due(&mut self, now: Instant) -> Vec<RenderTask> {
        let due: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        due.into_iter()
            .filter_map(|id| self.pending.remove(&id).map(|entry| entry.task))
            .collect()
    }

    /// Remove and return every pending task regardless of deadline.
    pub fn drain(&mut self) -> Vec<RenderTask> {
        self.pending.drain().map(|(_, entry)| entry.task).collect()
    }

    /// How long the event loop should sleep before the next drain.
    ///
    /// The nearest deadline, clamped to at least 1ms so a just-expired
    /// entry cannot spin the loop.
    pub fn sleep_duration(&self) -> Duration {
        let now = Instant::now();
        self.pending
            .values()
            .map(|entry| entry.deadline.saturating_duration_since(now))
            .min()
            .map_or(IDLE_SLEEP, |d| d.max(Duration::from_millis(1)))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
