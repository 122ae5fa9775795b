//! Hugo target.
//!
//! ```text
//! <output>/
//! ├── config.toml
//! ├── layouts/_default/<collection>.html
//! ├── content/[<collection>/]<pathname>      # `+++` TOML front matter + body
//! └── static/                                # non-HTML source files
//! ```

use super::{ExportEngine, FileExport, Scope};
use crate::config::ExportConfig;
use crate::layout::Layout;
use crate::page::{Data, Page};
use anyhow::{Context, Result};
use serde::Serialize;

/// Collection whose pages go straight under `content/`.
const ROOT_COLLECTION: &str = "pages";

#[derive(Debug, Clone, Copy, Default)]
pub struct HugoExportEngine;

#[derive(Serialize)]
struct HugoConfig<'a> {
    #[serde(rename = "baseURL")]
    base_url: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    title: &'a str,
}

#[derive(Serialize)]
struct FrontMatter<'a> {
    layout: &'a str,
    #[serde(flatten)]
    data: &'a Data,
}

/// `.Params.x` at page level, `.x` inside a `range` block.
fn param(reference: &str, scope: Scope) -> String {
    match scope {
        Scope::Page => format!(".Params.{reference}"),
        Scope::Item => format!(".{reference}"),
    }
}

impl ExportEngine for HugoExportEngine {
    fn static_directory(&self) -> &'static str {
        "static"
    }

    fn engine_config(&self, config: &ExportConfig) -> Result<FileExport> {
        let contents = toml::to_string(&HugoConfig {
            base_url: &config.base_url,
            title: &config.title,
        })
        .context("Failed to serialize hugo config")?;

        Ok(FileExport {
            pathname: "config.toml".into(),
            contents,
        })
    }

    fn export_layout(&self, layout: &Layout, collection: &str) -> FileExport {
        FileExport {
            pathname: format!("layouts/_default/{collection}.html"),
            contents: self.render_tree(&layout.tree),
        }
    }

    fn export_collection_item(&self, page: &Page, collection: &str) -> Result<FileExport> {
        let folder = if collection == ROOT_COLLECTION {
            String::new()
        } else {
            format!("{collection}/")
        };
        let front_matter = toml::to_string(&FrontMatter {
            layout: collection,
            data: &page.data,
        })
        .with_context(|| format!("Failed to serialize front matter of `{}`", page.pathname))?;

        Ok(FileExport {
            pathname: format!("content/{folder}{}", page.pathname),
            contents: format!("+++\n{front_matter}+++\n{}", self.render_tree(&page.content)),
        })
    }

    fn render_variable(&self, reference: &str, scope: Scope) -> String {
        format!("{{{{ {} }}}}", param(reference, scope))
    }

    fn render_markdown_variable(&self, reference: &str, scope: Scope) -> String {
        format!("{{{{ {} | markdownify }}}}", param(reference, scope))
    }

    fn render_conditional(&self, reference: &str, body: &str, scope: Scope) -> String {
        format!("{{{{ if {} }}}}{body}{{{{ end }}}}", param(reference, scope))
    }

    fn render_loop(&self, reference: &str, body: &str, scope: Scope) -> String {
        format!("{{{{ range {} }}}}{body}{{{{ end }}}}", param(reference, scope))
    }

    fn render_content(&self) -> String {
        "{{ .Content }}".into()
    }

    fn render_variable_attribute(&self, name: &str, reference: &str, scope: Scope) -> String {
        format!(" {name}=\"{}\"", self.render_variable(reference, scope))
    }

    fn render_conditional_attribute(&self, name: &str, reference: &str, scope: Scope) -> String {
        let attribute = self.render_variable_attribute(name, reference, scope);
        format!("{{{{ if {} }}}}{attribute}{{{{ end }}}}", param(reference, scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Attribute, Node};
    use crate::page::Value;
    use std::sync::Arc;

    fn el(name: &str, children: Vec<Node>) -> Node {
        Node::element(name, vec![], children)
    }

    #[test]
    fn test_export_layout() {
        let layout = Layout::new(vec![el(
            "div",
            vec![
                el("h1", vec![Node::variable("var1")]),
                Node::conditional("show3", el("p", vec![Node::text("note")])),
                el("main", vec![Node::Content]),
            ],
        )]);

        let file = HugoExportEngine.export_layout(&layout, "posts");

        assert_eq!(file.pathname, "layouts/_default/posts.html");
        assert_eq!(
            file.contents,
            "<div><h1>{{ .Params.var1 }}</h1>{{ if .Params.show3 }}<p>note</p>{{ end }}\
             <main>{{ .Content }}</main></div>"
        );
    }

    #[test]
    fn test_loop_body_uses_item_scope() {
        let tree = vec![el(
            "ul",
            vec![Node::Loop {
                reference: "items".into(),
                template: Box::new(Node::element(
                    "li",
                    vec![Attribute::VariableAttribute {
                        name: "class".into(),
                        reference: "kind".into(),
                    }],
                    vec![Node::variable("label")],
                )),
            }],
        )];

        assert_eq!(
            HugoExportEngine.render_tree(&tree),
            "<ul>{{ range .Params.items }}<li class=\"{{ .kind }}\">{{ .label }}</li>{{ end }}</ul>"
        );
    }

    #[test]
    fn test_attributes_and_markdown() {
        let tree = vec![Node::element(
            "a",
            vec![
                Attribute::VariableAttribute {
                    name: "href".into(),
                    reference: "attr1".into(),
                },
                Attribute::ConditionalAttribute {
                    name: "target".into(),
                    reference: "attr2".into(),
                },
            ],
            vec![Node::MarkdownVariable {
                reference: "label".into(),
            }],
        )];

        assert_eq!(
            HugoExportEngine.render_tree(&tree),
            "<a href=\"{{ .Params.attr1 }}\"{{ if .Params.attr2 }} target=\"{{ .Params.attr2 }}\"{{ end }}>\
             {{ .Params.label | markdownify }}</a>"
        );
    }

    #[test]
    fn test_export_collection_item() {
        let mut data = Data::new();
        data.insert("var1".into(), Value::Text("Hello".into()));
        data.insert("show3".into(), Value::Flag(false));
        let page = Page::new(
            "about/index.html",
            data,
            vec![el("p", vec![Node::text("body")])],
            Arc::new(vec![]),
        );

        let posts = HugoExportEngine.export_collection_item(&page, "posts").unwrap();
        let pages = HugoExportEngine.export_collection_item(&page, "pages").unwrap();

        assert_eq!(posts.pathname, "content/posts/about/index.html");
        assert_eq!(pages.pathname, "content/about/index.html");
        assert!(posts.contents.starts_with("+++\n"));
        assert!(posts.contents.ends_with("+++\n<p>body</p>"));

        let front_matter = posts.contents.trim_start_matches("+++\n").split("+++\n").next().unwrap();
        let parsed: toml::Table = toml::from_str(front_matter).unwrap();
        assert_eq!(parsed["layout"].as_str(), Some("posts"));
        assert_eq!(parsed["var1"].as_str(), Some("Hello"));
        assert_eq!(parsed["show3"].as_bool(), Some(false));
    }

    #[test]
    fn test_engine_config() {
        let config = ExportConfig {
            base_url: "https://example.com/".into(),
            title: "Example".into(),
            ..Default::default()
        };

        let file = HugoExportEngine.engine_config(&config).unwrap();

        assert_eq!(file.pathname, "config.toml");
        let parsed: toml::Table = toml::from_str(&file.contents).unwrap();
        assert_eq!(parsed["baseURL"].as_str(), Some("https://example.com/"));
        assert_eq!(parsed["title"].as_str(), Some("Example"));
    }
}
