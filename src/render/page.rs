//! Page rendering.
//!
//! A page is a content directory with a layout declaration. Rendering
//! assembles a context from the directory's extracted documents
//! (recursively), resolves `bind` references, expands the declared
//! template, relocates inline styles into the style slot, optionally
//! minifies, and writes `index.html` under the mirrored dist path.

use super::{RenderError, RenderOutcome, Renderer, template};
use crate::index::DependencyIndex;
use crate::log;
use crate::provider::content::LAYOUT_FILE;
use crate::site::site;
use crate::tree::{NodeData, NodeId, NodeKind, NodeStat, SnapshotTree};
use crate::utils::slash_path;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value, json};
use std::fs;
use std::sync::LazyLock;
use std::time::UNIX_EPOCH;

/// Marker a template places where relocated `<style>` blocks land.
const STYLE_SLOT: &str = "<!-- styles -->";

static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<style[^>]*>.*?</style>").expect("valid regex"));

/// Render the page at `id` in the content tree.
///
/// Directories without a layout declaration (or without a `template`
/// key) are not pages and are skipped. A declared but unregistered
/// template is `MissingTemplate`; the caller logs it and moves on.
pub fn render_page(
    renderer: &Renderer,
    tree: &SnapshotTree,
    id: NodeId,
    index: &DependencyIndex,
    theme: &SnapshotTree,
) -> Result<RenderOutcome, RenderError> {
    let node = tree.node(id);
    if !node.is_dir {
        return Ok(RenderOutcome::Skipped);
    }
    let Some(conf) = layout_record(tree, id) else {
        return Ok(RenderOutcome::Skipped);
    };
    let Some(template_name) = conf.get("template").and_then(|v| v.as_str()) else {
        return Ok(RenderOutcome::Skipped);
    };

    let mut ctx = assemble(tree, id);
    if let Some(obj) = ctx.as_object_mut() {
        if let Some(bind) = conf.get("bind").and_then(|v| v.as_mapping()) {
            obj.insert("bind".into(), resolve_binds(tree, id, bind));
        }
        obj.insert(
            "source_path".into(),
            Value::String(slash_path(&node.full_path)),
        );
        obj.insert(
            "site".into(),
            serde_json::to_value(&*site()).unwrap_or(Value::Null),
        );
    }

    let template_path = index
        .template_path(template_name)
        .ok_or_else(|| RenderError::MissingTemplate(template_name.to_string()))?;
    let entry_key = slash_path(template_path);
    let sources = template_sources(theme);
    if !sources.contains_key(&entry_key) {
        // Stale index entry: the template node left the theme tree.
        return Err(RenderError::MissingTemplate(template_name.to_string()));
    }

    let html = template::expand(&entry_key, &sources, &ctx).map_err(|e| RenderError::Expand {
        target: slash_path(&node.full_path),
        source: e,
    })?;
    let html = relocate_styles(html);
    let html = if renderer.production {
        minify(&html)
    } else {
        html
    };

    let trim_prefix = conf
        .get("trimPrefix")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let mut out_dir = renderer.dist.join(&node.full_path);
    if trim_prefix && node.full_path.file_name().is_some() {
        if let Some(parent) = out_dir.parent() {
            out_dir = parent.to_path_buf();
        }
    }
    fs::create_dir_all(&out_dir)?;
    let out = out_dir.join("index.html");
    fs::write(&out, html)?;
    Ok(RenderOutcome::Written(out))
}

/// The parsed layout declaration of the directory at `id`, if any.
fn layout_record(tree: &SnapshotTree, id: NodeId) -> Option<&serde_yaml::Value> {
    let conf = tree.child_by_name(id, LAYOUT_FILE)?;
    tree.node(conf).data.as_ref()?.as_record()
}

/// Recursively assemble the render context for a directory.
///
/// Extracted file children appear under `data` keyed by filename
/// (documents without data, Other files included, are absent);
/// directory children recurse into the `children` array in tree order.
fn assemble(tree: &SnapshotTree, id: NodeId) -> Value {
    let node = tree.node(id);
    let mut obj = Map::new();
    obj.insert("name".into(), Value::String(node.name.clone()));
    obj.insert("stat".into(), stat_json(&node.stat));

    let mut data = Map::new();
    let mut dirs = Vec::new();
    for &child in tree.children(id) {
        let child_node = tree.node(child);
        if child_node.is_dir {
            dirs.push(assemble(tree, child));
            continue;
        }
        let value = match &child_node.data {
            Some(NodeData::Record(record)) => yaml_to_json(record),
            Some(NodeData::Html(html)) => Value::String(html.clone()),
            _ => continue,
        };
        data.insert(child_node.name.clone(), value);
    }
    obj.insert("data".into(), Value::Object(data));
    obj.insert("children".into(), Value::Array(dirs));
    Value::Object(obj)
}

/// Resolve each `bind` entry to its target directory's assembled data,
/// merged with the entry's own extra configuration. Unresolvable
/// targets are logged and left out.
fn resolve_binds(tree: &SnapshotTree, id: NodeId, bind: &serde_yaml::Mapping) -> Value {
    let mut bound = Map::new();
    for (key, extra) in bind {
        let Some(rel) = key.as_str() else { continue };
        let Some(target) = resolve_bind_path(tree, id, rel) else {
            log!("render"; "bind target '{rel}' missing for {}",
                slash_path(&tree.node(id).full_path));
            continue;
        };
        let mut entry = assemble(tree, target);
        if let (Some(entry), Some(extra)) = (entry.as_object_mut(), yaml_to_json(extra).as_object())
        {
            for (k, v) in extra {
                entry.insert(k.clone(), v.clone());
            }
        }
        bound.insert(rel.to_string(), entry);
    }
    Value::Object(bound)
}

/// Walk a `bind` path from the page directory. `..` ascends; anything
/// else descends into a named child.
fn resolve_bind_path(tree: &SnapshotTree, id: NodeId, rel: &str) -> Option<NodeId> {
    let mut current = id;
    for segment in rel.split('/') {
        match segment {
            "" | "." => {}
            ".." => current = tree.node(current).parent()?,
            name => current = tree.child_by_name(current, name)?,
        }
    }
    Some(current)
}

fn stat_json(stat: &NodeStat) -> Value {
    let modified = stat
        .modified
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs());
    json!({ "modified": modified, "size": stat.size })
}

fn yaml_to_json(value: &serde_yaml::Value) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// All template texts in the theme tree, keyed by slash path.
fn template_sources(theme: &SnapshotTree) -> FxHashMap<String, String> {
    let mut sources = FxHashMap::default();
    for id in theme.walk(NodeId::ROOT) {
        let node = theme.node(id);
        if node.kind != NodeKind::Template {
            continue;
        }
        if let Some(text) = node.data.as_ref().and_then(|data| data.as_template()) {
            sources.insert(slash_path(&node.full_path), text.to_string());
        }
    }
    sources
}

/// Move every `<style>` block into the style slot, preserving
/// document order. Without the marker the document is left alone.
fn relocate_styles(html: String) -> String {
    if !html.contains(STYLE_SLOT) {
        return html;
    }
    let bundle: String = STYLE_RE
        .find_iter(&html)
        .map(|m| m.as_str())
        .collect();
    let stripped = STYLE_RE.replace_all(&html, "");
    stripped.replacen(STYLE_SLOT, &bundle, 1)
}

fn minify(html: &str) -> String {
    let cfg = minify_html::Cfg {
        minify_css: true,
        minify_js: true,
        ..minify_html::Cfg::default()
    };
    let out = minify_html::minify(html.as_bytes(), &cfg);
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SourceProvider;
    use std::path::Path;
    use tempfile::TempDir;

    fn provider(kind: &str, files: &[(&str, &str)]) -> SourceProvider {
        let tmp = TempDir::new().unwrap();
        let root = tmp.keep();
        for (rel, content) in files {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
        }
        let mut provider = if kind == "theme" {
            SourceProvider::theme(root, vec![])
        } else {
            SourceProvider::content(root, vec![])
        };
        for (event, path) in provider.scan() {
            provider.process(event, &path);
        }
        provider
    }

    fn index_for(theme: &SourceProvider) -> DependencyIndex {
        let mut index = DependencyIndex::new();
        for id in theme.tree.walk(NodeId::ROOT) {
            let node = theme.tree.node(id);
            if node.kind == NodeKind::Template {
                let stem = node.full_path.file_stem().unwrap().to_str().unwrap();
                index.register_template(stem, &node.full_path);
            }
        }
        index
    }

    #[test]
    fn test_page_written_under_mirrored_path() {
        let content = provider(
            "content",
            &[
                ("about/conf.yaml", "template: page\ntitle: About\n"),
                ("about/body.md", "# Hello"),
            ],
        );
        let theme = provider(
            "theme",
            &[("page/page.html", r#"<main>{{ data["body.md"] }}</main>"#)],
        );
        let index = index_for(&theme);
        let dist = TempDir::new().unwrap();
        let renderer = Renderer::new(dist.path().to_path_buf(), false);
        let id = content.tree.get_node_by_path(Path::new("about")).unwrap();

        let outcome = render_page(&renderer, &content.tree, id, &index, &theme.tree).unwrap();
        let expected = dist.path().join("about/index.html");
        assert_eq!(outcome, RenderOutcome::Written(expected.clone()));
        let html = fs::read_to_string(expected).unwrap();
        assert!(html.contains("<h1>Hello</h1>"));
    }

    #[test]
    fn test_trim_prefix_writes_one_level_up() {
        let content = provider(
            "content",
            &[("blog/home/conf.yaml", "template: page\ntrimPrefix: true\n")],
        );
        let theme = provider("theme", &[("page/page.html", "<main>{{ name }}</main>")]);
        let index = index_for(&theme);
        let dist = TempDir::new().unwrap();
        let renderer = Renderer::new(dist.path().to_path_buf(), false);
        let id = content
            .tree
            .get_node_by_path(Path::new("blog/home"))
            .unwrap();

        let outcome = render_page(&renderer, &content.tree, id, &index, &theme.tree).unwrap();
        assert_eq!(
            outcome,
            RenderOutcome::Written(dist.path().join("blog/index.html"))
        );
    }

    #[test]
    fn test_directory_without_layout_is_skipped() {
        let content = provider("content", &[("notes/scratch.md", "# x")]);
        let theme = provider("theme", &[]);
        let index = index_for(&theme);
        let dist = TempDir::new().unwrap();
        let renderer = Renderer::new(dist.path().to_path_buf(), false);
        let id = content.tree.get_node_by_path(Path::new("notes")).unwrap();

        assert_eq!(
            render_page(&renderer, &content.tree, id, &index, &theme.tree).unwrap(),
            RenderOutcome::Skipped
        );
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let content = provider("content", &[("about/conf.yaml", "template: ghost\n")]);
        let theme = provider("theme", &[]);
        let index = index_for(&theme);
        let dist = TempDir::new().unwrap();
        let renderer = Renderer::new(dist.path().to_path_buf(), false);
        let id = content.tree.get_node_by_path(Path::new("about")).unwrap();

        let err = render_page(&renderer, &content.tree, id, &index, &theme.tree).unwrap_err();
        assert!(matches!(err, RenderError::MissingTemplate(name) if name == "ghost"));
    }

    #[test]
    fn test_bind_exposes_sibling_data() {
        let content = provider(
            "content",
            &[
                ("home/conf.yaml", "template: page\nbind:\n  ../posts:\n    limit: 3\n"),
                ("posts/list.yaml", "count: 2\n"),
            ],
        );
        let theme = provider(
            "theme",
            &[(
                "page/page.html",
                "{{ bind[\"../posts\"].limit }}:{{ bind[\"../posts\"].data[\"list.yaml\"].count }}",
            )],
        );
        let index = index_for(&theme);
        let dist = TempDir::new().unwrap();
        let renderer = Renderer::new(dist.path().to_path_buf(), false);
        let id = content.tree.get_node_by_path(Path::new("home")).unwrap();

        let outcome = render_page(&renderer, &content.tree, id, &index, &theme.tree).unwrap();
        let RenderOutcome::Written(path) = outcome else {
            panic!("expected a written page");
        };
        assert_eq!(fs::read_to_string(path).unwrap(), "3:2");
    }

    #[test]
    fn test_assemble_exposes_children_in_tree_order() {
        let content = provider(
            "content",
            &[
                ("blog/conf.yaml", "template: page\n"),
                ("blog/a/post.yaml", "n: 1\n"),
                ("blog/b/post.yaml", "n: 2\n"),
            ],
        );
        let id = content.tree.get_node_by_path(Path::new("blog")).unwrap();
        let ctx = assemble(&content.tree, id);
        let children = ctx.get("children").unwrap().as_array().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].get("name").unwrap(), "a");
        assert_eq!(children[1].get("name").unwrap(), "b");
    }

    #[test]
    fn test_relocate_styles_preserves_order() {
        let html = "<head><!-- styles --></head>\
                    <style>.a{}</style><p>x</p><style>.b{}</style>";
        let out = relocate_styles(html.to_string());
        assert_eq!(out, "<head><style>.a{}</style><style>.b{}</style></head><p>x</p>");
    }

    #[test]
    fn test_relocate_without_marker_is_identity() {
        let html = "<style>.a{}</style><p>x</p>";
        assert_eq!(relocate_styles(html.to_string()), html);
    }
}
