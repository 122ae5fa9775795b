//! Collection building: pick a collection's files, parse them, fold them.
//!
//! # Fold
//!
//! ```text
//! anchor = documents[0]
//!
//! diff(anchor, d1) ──► current
//! diff(anchor, d2) ──► next ──┐
//!                              ├── base   = current.base ⊕ next.base
//!                              ├── layout = (current.layout ⊕ next.layout).normalized()
//!                              ├── pages  = current.pages ↻ next.base  ∪  next.pages ↻ current.base
//! diff(anchor, d3) ──► next ──┘   ...
//!
//! every page ↻ final layout
//! ```
//!
//! `⊕` is the layout merge, `↻` a page re-projection. Every diff is taken
//! against the same anchor so placeholder names stay comparable across steps.

use crate::config::CollectionConfig;
use crate::diagnostics::Diagnostics;
use crate::document::Document;
use crate::layout::Layout;
use crate::page::Page;
use crate::parser::{ParseOptions, Selector};
use anyhow::{Context, Result};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::{fs, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("collection `{collection}` needs at least 2 html files to infer a layout, found {found}")]
    InsufficientInput { collection: String, found: usize },
}

/// A file found in the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the source directory, `/`-separated.
    pub pathname: String,
    pub path: PathBuf,
}

impl SourceFile {
    pub fn is_html(&self) -> bool {
        self.pathname.ends_with(".html") || self.pathname.ends_with(".htm")
    }
}

/// One inferred layout plus the data of every page folded into it.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionResponse {
    pub pages: Vec<Page>,
    pub layout: Layout,
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

/// Files of `sources` that belong to the collection described by `config`.
///
/// Only HTML files qualify. An `only` list selects exactly its pathnames;
/// otherwise `include` and `exclude` override the `sub_path` prefix match.
pub fn select<'a>(config: &CollectionConfig, sources: &'a [SourceFile]) -> Vec<&'a SourceFile> {
    sources
        .iter()
        .filter(|file| file.is_html())
        .filter(|file| {
            let pathname = &file.pathname;
            if let Some(only) = &config.only {
                return only.contains(pathname);
            }
            if config.include.contains(pathname) {
                return true;
            }
            if config.exclude.contains(pathname) {
                return false;
            }
            pathname.starts_with(&config.sub_path)
        })
        .collect()
}

/// Read and parse `files` in parallel, keeping their order.
///
/// `on_parsed` is called once per parsed file, from worker threads.
pub fn read_documents<F>(
    files: &[&SourceFile],
    options: &ParseOptions,
    content: Option<&Selector>,
    on_parsed: F,
) -> Result<Vec<Document>>
where
    F: Fn() + Sync,
{
    files
        .par_iter()
        .map(|file| -> Result<Document> {
            let raw = fs::read_to_string(&file.path)
                .with_context(|| format!("Failed to read {}", file.path.display()))?;
            let document = Document::parse(file.pathname.clone(), &raw, options, content)?;
            on_parsed();
            Ok(document)
        })
        .collect()
}

/// Fold `documents` into one layout, anchored on the first document.
pub fn build(collection: &str, documents: &[Document]) -> Result<CollectionResponse, BuildError> {
    let insufficient = || BuildError::InsufficientInput {
        collection: collection.to_owned(),
        found: documents.len(),
    };
    let (anchor, rest) = documents.split_first().ok_or_else(insufficient)?;
    let (second, rest) = rest.split_first().ok_or_else(insufficient)?;

    let first = anchor.diff(second);
    let mut diagnostics = first.diagnostics;
    let mut base = first.base;
    let mut layout = first.layout;
    let mut pages: Vec<Page> = first.pages.into();

    for document in rest {
        let next = anchor.diff(document);
        diagnostics.extend(next.diagnostics);

        let old_pages: Vec<Page> = pages.iter().map(|page| page.merge(&next.base)).collect();
        let new_pages: Vec<Page> = next.pages.iter().map(|page| page.merge(&base)).collect();

        // Attribute losses in the base repeat the ones reported for the layout
        base = base.merge(&next.base, &mut Diagnostics::new());
        layout = layout.merge(&next.layout, &mut diagnostics).normalized();
        pages = union(old_pages, new_pages);
    }

    let pages = pages
        .iter()
        .map(|page| page.project(&layout, &mut diagnostics))
        .collect();

    Ok(CollectionResponse {
        pages,
        layout,
        diagnostics,
    })
}

/// Pages of `current` followed by the pages of `next` not seen yet.
///
/// A page present in both keeps its position in `current` and picks up any
/// value only the `next` copy recorded.
fn union(mut current: Vec<Page>, next: Vec<Page>) -> Vec<Page> {
    let mut seen: FxHashSet<String> = current.iter().map(|page| page.pathname.clone()).collect();

    for page in next {
        if seen.insert(page.pathname.clone()) {
            current.push(page);
            continue;
        }
        if let Some(existing) = current.iter_mut().find(|p| p.pathname == page.pathname) {
            for (reference, value) in page.data {
                existing.data.entry(reference).or_insert(value);
            }
        }
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;
    use crate::page::Value;
    use tempfile::TempDir;

    fn doc(pathname: &str, html: &str) -> Document {
        Document::parse(pathname, html, &ParseOptions::default(), None).unwrap()
    }

    fn source(pathname: &str) -> SourceFile {
        SourceFile {
            pathname: pathname.into(),
            path: PathBuf::from(pathname),
        }
    }

    fn pathnames(files: Vec<&SourceFile>) -> Vec<&str> {
        files.into_iter().map(|file| file.pathname.as_str()).collect()
    }

    fn assert_round_trip(documents: &[Document], response: &CollectionResponse) {
        assert_eq!(response.pages.len(), documents.len());
        for document in documents {
            let page = response
                .pages
                .iter()
                .find(|page| page.pathname == document.pathname)
                .unwrap();
            assert_eq!(page.render(&response.layout), *document.tree, "{}", document.pathname);
        }
    }

    #[test]
    fn test_single_document_is_rejected() {
        let documents = vec![doc("only.html", "<p>x</p>")];

        let result = build("pages", &documents);

        assert!(matches!(
            result,
            Err(BuildError::InsufficientInput { found: 1, .. })
        ));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = build("posts", &[]).unwrap_err();
        assert!(err.to_string().contains("`posts`"));
    }

    #[test]
    fn test_two_documents() {
        let documents = vec![
            doc("hello.html", "<div><h1>Hello</h1></div>"),
            doc("goodbye.html", "<div><h1>Goodbye</h1></div>"),
        ];

        let response = build("pages", &documents).unwrap();

        assert_eq!(
            response.layout.tree,
            vec![Node::element(
                "div",
                vec![],
                vec![Node::element("h1", vec![], vec![Node::variable("var1")])],
            )]
        );
        assert_eq!(response.pages[0].pathname, "hello.html");
        assert_eq!(
            response.pages[0].data.get("var1"),
            Some(&Value::Text("Hello".into()))
        );
        assert_eq!(
            response.pages[1].data.get("var1"),
            Some(&Value::Text("Goodbye".into()))
        );
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn test_three_documents_round_trip() {
        let documents = vec![
            doc("a.html", "<main><h1>A</h1><p>one</p></main>"),
            doc("b.html", "<main><h1>B</h1><p>two</p></main>"),
            doc("c.html", "<main><h1>C</h1><p>three</p><footer>f</footer></main>"),
        ];

        let response = build("pages", &documents).unwrap();

        let names: Vec<_> = response.pages.iter().map(|p| p.pathname.as_str()).collect();
        assert_eq!(names, vec!["a.html", "b.html", "c.html"]);
        assert_eq!(response.layout.references(), vec!["var1", "var2", "extra1_2_1"]);
        assert_eq!(
            response.pages[2].data.get("extra1_2_1"),
            Some(&Value::Flag(true))
        );
        assert_eq!(
            response.pages[0].data.get("extra1_2_1"),
            Some(&Value::Flag(false))
        );
        assert_round_trip(&documents, &response);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn test_anchor_choice_may_change_layout() {
        let a = doc("a.html", "<main><h1>A</h1><aside>x</aside></main>");
        let b = doc("b.html", "<main><h1>B</h1></main>");
        let c = doc("c.html", "<main><h1>C</h1><nav>n</nav></main>");

        let abc_docs = [a.clone(), b.clone(), c.clone()];
        let bac_docs = [b, a, c];
        let abc = build("pages", &abc_docs).unwrap();
        let bac = build("pages", &bac_docs).unwrap();

        // Layouts may differ, but every page has to come back from either one
        assert_round_trip(&abc_docs, &abc);
        assert_round_trip(&bac_docs, &bac);
    }

    #[test]
    fn test_optional_element_keeps_varying_text() {
        let documents = vec![
            doc("a.html", "<main><h1>A</h1><p>x</p></main>"),
            doc("b.html", "<main><h1>B</h1></main>"),
            doc("c.html", "<main><h1>C</h1><p>y</p></main>"),
        ];

        let response = build("pages", &documents).unwrap();

        assert_eq!(response.layout.references(), vec!["var1", "show4", "var2"]);
        assert_eq!(response.pages[1].data.get("show4"), Some(&Value::Flag(false)));
        assert_eq!(
            response.pages[2].data.get("var2"),
            Some(&Value::Text("y".into()))
        );
        assert_round_trip(&documents, &response);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn test_conditional_and_variable_share_a_slot() {
        let a = doc("a.html", "<main><h1>A</h1><p>x</p></main>");
        let b = doc("b.html", "<main><h1>B</h1></main>");
        let c = doc("c.html", "<main><h1>C</h1><p>y</p></main>");
        let d = doc("d.html", "<main><h1>D</h1><p>w</p></main>");

        for documents in [
            vec![a.clone(), b.clone(), c.clone(), d.clone()],
            vec![a.clone(), c.clone(), b.clone(), d.clone()],
            vec![a.clone(), d.clone(), c.clone(), b.clone()],
        ] {
            let response = build("pages", &documents).unwrap();
            assert_round_trip(&documents, &response);
            assert!(response.diagnostics.is_empty());
        }
    }

    #[test]
    fn test_attribute_only_on_anchor_is_dropped() {
        let documents = vec![
            doc("a.html", r#"<img src="a.png" loading="lazy">"#),
            doc("b.html", r#"<img src="b.png">"#),
        ];

        let response = build("pages", &documents).unwrap();

        let Node::Element { attrs, .. } = &response.layout.tree[0] else {
            panic!("expected element");
        };
        assert!(attrs.iter().all(|attr| attr.name() != "loading"));
        assert!(!response.diagnostics.is_empty());
    }

    #[test]
    fn test_response_json_shape() {
        let documents = vec![doc("a.html", "<p>a</p>"), doc("b.html", "<p>b</p>")];

        let response = build("pages", &documents).unwrap();
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["pages"][0]["pathname"], "a.html");
        assert_eq!(json["pages"][1]["data"]["var1"], "b");
        assert_eq!(json["layout"]["tree"][0]["children"][0]["type"], "variable");
        assert!(json.get("diagnostics").is_none());
    }

    #[test]
    fn test_select_by_sub_path() {
        let sources = vec![
            source("index.html"),
            source("posts/a.html"),
            source("posts/b.html"),
            source("posts/style.css"),
        ];
        let config = CollectionConfig {
            sub_path: "posts/".into(),
            ..Default::default()
        };

        assert_eq!(pathnames(select(&config, &sources)), vec!["posts/a.html", "posts/b.html"]);
    }

    #[test]
    fn test_select_include_exclude_only() {
        let sources = vec![source("index.html"), source("posts/a.html"), source("posts/b.html")];

        let config = CollectionConfig {
            sub_path: "posts/".into(),
            include: vec!["index.html".into()],
            exclude: vec!["posts/b.html".into()],
            ..Default::default()
        };
        assert_eq!(pathnames(select(&config, &sources)), vec!["index.html", "posts/a.html"]);

        let config = CollectionConfig {
            only: Some(vec!["posts/b.html".into()]),
            include: vec!["index.html".into()],
            ..Default::default()
        };
        assert_eq!(pathnames(select(&config, &sources)), vec!["posts/b.html"]);
    }

    #[test]
    fn test_read_documents_in_order() {
        let dir = TempDir::new().unwrap();
        let mut files = Vec::new();
        for (name, body) in [("a.html", "<p>a</p>"), ("b.html", "<p>b</p>"), ("c.html", "<p>c</p>")] {
            let path = dir.path().join(name);
            fs::write(&path, body).unwrap();
            files.push(SourceFile {
                pathname: name.into(),
                path,
            });
        }
        let refs: Vec<&SourceFile> = files.iter().collect();
        let parsed = std::sync::atomic::AtomicUsize::new(0);

        let documents = read_documents(&refs, &ParseOptions::default(), None, || {
            parsed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        })
        .unwrap();

        let names: Vec<_> = documents.iter().map(|d| d.pathname.as_str()).collect();
        assert_eq!(names, vec!["a.html", "b.html", "c.html"]);
        assert_eq!(parsed.into_inner(), 3);
    }

    #[test]
    fn test_read_documents_missing_file() {
        let missing = source("/nonexistent/refold/missing.html");
        let result = read_documents(&[&missing], &ParseOptions::default(), None, || {});
        assert!(result.is_err());
    }

    #[test]
    fn test_union_keeps_first_position() {
        let page = |pathname: &str, key: &str| {
            let mut data = crate::page::Data::new();
            data.insert(key.into(), Value::Flag(true));
            Page::new(pathname, data, vec![], std::sync::Arc::new(vec![]))
        };

        let merged = union(
            vec![page("a.html", "x"), page("b.html", "x")],
            vec![page("a.html", "y"), page("c.html", "y")],
        );

        let names: Vec<_> = merged.iter().map(|p| p.pathname.as_str()).collect();
        assert_eq!(names, vec!["a.html", "b.html", "c.html"]);
        assert!(merged[0].data.contains_key("x"));
        assert!(merged[0].data.contains_key("y"));
    }
}
