//! Site-level configuration data.
//!
//! Parsed from `site.yaml` at the content tree root. Holds the public
//! root URL, markdown substitution directives, and any extra keys the
//! site author wants exposed to templates.

mod handle;

pub use handle::{replace_site, site};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Global site data, replaced wholesale whenever `site.yaml` changes.
/// Serialized back out as the `site` key of every render context.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SiteData {
    /// Public base URL prepended to root-relative links
    #[serde(rename = "rootURL", default)]
    pub root_url: String,

    /// Markdown post-processing directives
    #[serde(default)]
    pub markdown: MarkdownDirectives,

    /// Any other top-level keys, passed through to render contexts
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Substitution directives applied to converted markdown HTML.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MarkdownDirectives {
    /// `!name(args)!` command templates; `#N` in the value is replaced
    /// by comma-separated argument N, counted from zero
    #[serde(default)]
    pub commands: BTreeMap<String, String>,

    /// `!alias!` straight text replacements
    #[serde(default)]
    pub alias: BTreeMap<String, String>,
}

impl SiteData {
    /// Build site data from a parsed YAML document.
    ///
    /// A trailing `/` on `rootURL` is trimmed so link rewriting can
    /// join with a single separator.
    pub fn from_value(value: &serde_yaml::Value) -> anyhow::Result<Self> {
        let mut data: Self = serde_yaml::from_value(value.clone())?;
        while data.root_url.ends_with('/') {
            data.root_url.pop();
        }
        Ok(data)
    }
}
