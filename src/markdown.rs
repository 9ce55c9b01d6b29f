//! Markdown conversion and site-specific post-processing.
//!
//! Conversion itself is pulldown-cmark with the common extensions
//! enabled. Post-processing applies the `site.yaml` markdown
//! directives to the produced HTML:
//! - `!name(args)!` command substitution (`#N` picks argument N, zero-based)
//! - `!alias!` straight replacement
//! - `src`/`href` starting with `/` rewritten relative to the page
//! - `src`/`href` starting with `~/` rewritten relative to the site root

use crate::site::SiteData;
use pulldown_cmark::{Options, Parser, html};
use regex::Regex;
use std::sync::LazyLock;

static COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!(\w+)\(([^)]*)\)!").expect("valid regex"));
static ROOT_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(src|href)="/"#).expect("valid regex"));
static TILDE_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(src|href)="~/"#).expect("valid regex"));

/// Convert markdown source to HTML.
pub fn to_html(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(source, options);
    let mut output = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

/// Apply the site's markdown directives to converted HTML.
///
/// `page_dir` is the tree-relative directory of the document, as a
/// slash path (empty at the content root).
pub fn postprocess(html: &str, page_dir: &str, site: &SiteData) -> String {
    let mut output = COMMAND_RE
        .replace_all(html, |caps: &regex::Captures| {
            let Some(template) = site.markdown.commands.get(&caps[1]) else {
                return caps[0].to_string();
            };
            let mut expanded = template.clone();
            for (i, arg) in caps[2].split(',').enumerate() {
                expanded = expanded.replace(&format!("#{i}"), arg.trim());
            }
            expanded
        })
        .into_owned();

    for (alias, replacement) in &site.markdown.alias {
        output = output.replace(&format!("!{alias}!"), replacement);
    }

    let page_base = if page_dir.is_empty() {
        site.root_url.clone()
    } else {
        format!("{}/{}", site.root_url, page_dir)
    };
    let output = ROOT_ATTR_RE
        .replace_all(&output, |caps: &regex::Captures| {
            format!(r#"{}="{}/"#, &caps[1], page_base)
        })
        .into_owned();

    TILDE_ATTR_RE
        .replace_all(&output, |caps: &regex::Captures| {
            format!(r#"{}="{}/"#, &caps[1], site.root_url)
        })
        .into_owned()
}
