//! Template -> page dependency index.
//!
//! Two maps: template name to the set of page directories declaring it,
//! and template name to the template's tree path. Both sides store
//! tree-relative paths rather than node handles, so entries that
//! outlive their nodes simply fail to resolve at render time instead of
//! dangling.

use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct DependencyIndex {
    pages_by_template: FxHashMap<String, FxHashSet<PathBuf>>,
    template_nodes: FxHashMap<String, PathBuf>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the page at `page` declares `template`.
    ///
    /// A page declares at most one template, so it is first dropped
    /// from every other template's set. Re-registering under the same
    /// template is a no-op.
    pub fn register_page(&mut self, template: &str, page: &Path) {
        for (name, pages) in &mut self.pages_by_template {
            if name != template {
                pages.remove(page);
            }
        }
        self.pages_by_template
            .entry(template.to_string())
            .or_default()
            .insert(page.to_path_buf());
    }

    /// Drop the page at `page` from every template's set.
    pub fn unregister_page(&mut self, page: &Path) {
        for pages in self.pages_by_template.values_mut() {
            pages.remove(page);
        }
    }

    /// Page directories currently declaring `template`.
    pub fn pages_for(&self, template: &str) -> Vec<PathBuf> {
        self.pages_by_template
            .get(template)
            .map(|pages| pages.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Record where `template` lives in the theme tree. Last write wins.
    pub fn register_template(&mut self, template: &str, path: &Path) {
        self.template_nodes
            .insert(template.to_string(), path.to_path_buf());
    }

    /// Forget `template`'s location (its source file was unlinked).
    pub fn remove_template(&mut self, template: &str) {
        self.template_nodes.remove(template);
    }

    /// Tree path of `template`, if registered.
    pub fn template_path(&self, template: &str) -> Option<&Path> {
        self.template_nodes.get(template).map(PathBuf::as_path)
    }
}
