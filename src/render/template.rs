//! Template expansion boundary.
//!
//! Templates and fragments live as text in the theme snapshot tree,
//! keyed by slash path. Each expansion builds a fresh environment over
//! a clone of those sources, so a render always sees a consistent
//! snapshot even while the tree keeps changing.

use crate::utils::slash_path;
use minijinja::{AutoEscape, Environment};
use rustc_hash::FxHashMap;
use std::path::{Component, Path, PathBuf};

/// Expand the template stored under `entry` with `ctx`.
///
/// Auto-escaping is off: extracted markdown HTML is inserted verbatim,
/// escaping is the template author's call.
pub fn expand(
    entry: &str,
    sources: &FxHashMap<String, String>,
    ctx: &serde_json::Value,
) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::None);
    let sources = sources.clone();
    env.set_loader(move |name| Ok(resolve(&sources, name)));
    let template = env.get_template(entry)?;
    template.render(ctx)
}

/// Resolve an inclusion name against the stored sources.
///
/// Inclusion directives are written relative to the including template
/// (`../nav/nav.html`, `../components/nav/nav.html`) but the loader
/// receives them verbatim. Resolution tries the name as-is, then with
/// `.`/`..` components stripped, then by path-suffix match.
fn resolve(sources: &FxHashMap<String, String>, name: &str) -> Option<String> {
    if let Some(text) = sources.get(name) {
        return Some(text.clone());
    }

    let stripped: PathBuf = Path::new(name)
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    let key = slash_path(&stripped);
    if let Some(text) = sources.get(&key) {
        return Some(text.clone());
    }

    sources
        .iter()
        .find(|(stored, _)| Path::new(stored).ends_with(&stripped))
        .map(|(_, text)| text.clone())
}
