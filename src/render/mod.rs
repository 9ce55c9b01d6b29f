//! Rendering: page expansion and asset copying into the dist tree.

pub mod asset;
pub mod page;
pub mod template;

use std::path::PathBuf;
use thiserror::Error;

/// Render failures a caller can tell apart.
///
/// `MissingTemplate` means the page is skipped until the template
/// appears; `Expand` abandons this render only; `Io` covers the
/// dist-side filesystem work.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no template registered under '{0}'")]
    MissingTemplate(String),

    #[error("template expansion failed for {target}")]
    Expand {
        target: String,
        #[source]
        source: minijinja::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What a render call did.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Page written to this output path
    Written(PathBuf),
    /// Asset copied to this output path
    Copied(PathBuf),
    /// Nothing to do (not a renderable target, or output up to date)
    Skipped,
}

/// Immutable render settings shared by all render calls.
pub struct Renderer {
    pub dist: PathBuf,
    pub production: bool,
}

impl Renderer {
    pub fn new(dist: PathBuf, production: bool) -> Self {
        Self { dist, production }
    }
}
