//! Export engines: turn a collection result into a static-site project.
//!
//! An engine decides where files go and how placeholders are spelled in its
//! template language. Walking the tree and writing plain HTML is shared:
//!
//! | Node                 | Written by                      |
//! |----------------------|---------------------------------|
//! | doctype/element/text | [`ExportEngine::render_tree`]   |
//! | comment              | [`ExportEngine::render_tree`]   |
//! | variable             | `render_variable`               |
//! | markdown-variable    | `render_markdown_variable`      |
//! | conditional          | `render_conditional`            |
//! | loop                 | `render_loop`                   |
//! | content              | `render_content`                |

pub mod hugo;

pub use hugo::HugoExportEngine;

use crate::ast::{Attribute, Node, is_raw_text_element, is_void_element};
use crate::config::{EngineKind, ExportConfig};
use crate::layout::Layout;
use crate::page::Page;
use anyhow::Result;
use quick_xml::escape::{escape, partial_escape};

/// A file to write, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileExport {
    pub pathname: String,
    pub contents: String,
}

/// Where a placeholder is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Top level of a page: references resolve against page data.
    Page,
    /// Inside a loop body: references resolve against the current item.
    Item,
}

pub trait ExportEngine: Sync {
    /// Directory, relative to the output root, that holds copied static files.
    fn static_directory(&self) -> &'static str;

    /// Site-wide configuration file of the target generator.
    fn engine_config(&self, config: &ExportConfig) -> Result<FileExport>;

    fn export_layout(&self, layout: &Layout, collection: &str) -> FileExport;

    fn export_collection_item(&self, page: &Page, collection: &str) -> Result<FileExport>;

    fn render_variable(&self, reference: &str, scope: Scope) -> String;

    fn render_markdown_variable(&self, reference: &str, scope: Scope) -> String;

    fn render_conditional(&self, reference: &str, body: &str, scope: Scope) -> String;

    fn render_loop(&self, reference: &str, body: &str, scope: Scope) -> String;

    fn render_content(&self) -> String;

    /// ` name="..."` for an attribute whose value comes from data.
    fn render_variable_attribute(&self, name: &str, reference: &str, scope: Scope) -> String;

    /// An attribute written only when its data value is present.
    fn render_conditional_attribute(&self, name: &str, reference: &str, scope: Scope) -> String;

    /// Render a whole tree at page scope.
    fn render_tree(&self, tree: &[Node]) -> String {
        let mut out = String::new();
        self.render_nodes(tree, Scope::Page, false, &mut out);
        out
    }

    /// Render `nodes` into `out`. Text is written unescaped when `raw` is set.
    fn render_nodes(&self, nodes: &[Node], scope: Scope, raw: bool, out: &mut String) {
        for node in nodes {
            match node {
                Node::Doctype { value } => {
                    out.push_str("<!DOCTYPE ");
                    out.push_str(value);
                    out.push('>');
                }
                Node::Element {
                    name,
                    attrs,
                    children,
                } => {
                    out.push('<');
                    out.push_str(name);
                    self.render_attributes(attrs, scope, out);
                    out.push('>');
                    if is_void_element(name) {
                        continue;
                    }
                    self.render_nodes(children, scope, is_raw_text_element(name), out);
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
                Node::Text { value } if raw => out.push_str(value),
                Node::Text { value } => out.push_str(&partial_escape(value.as_str())),
                Node::Comment { value } => {
                    out.push_str("<!-- ");
                    out.push_str(value);
                    out.push_str(" -->");
                }
                Node::Variable { reference } => {
                    out.push_str(&self.render_variable(reference, scope));
                }
                Node::MarkdownVariable { reference } => {
                    out.push_str(&self.render_markdown_variable(reference, scope));
                }
                Node::Conditional { reference, child } => {
                    let mut body = String::new();
                    self.render_nodes(std::slice::from_ref(child.as_ref()), scope, raw, &mut body);
                    out.push_str(&self.render_conditional(reference, &body, scope));
                }
                Node::Loop {
                    reference,
                    template,
                } => {
                    let mut body = String::new();
                    self.render_nodes(std::slice::from_ref(template.as_ref()), Scope::Item, raw, &mut body);
                    out.push_str(&self.render_loop(reference, &body, scope));
                }
                Node::Content => out.push_str(&self.render_content()),
            }
        }
    }

    fn render_attributes(&self, attrs: &[Attribute], scope: Scope, out: &mut String) {
        for attr in attrs {
            match attr {
                Attribute::Attribute { name, value } if value.is_empty() => {
                    out.push(' ');
                    out.push_str(name);
                }
                Attribute::Attribute { name, value } => {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape(value.as_str()));
                    out.push('"');
                }
                Attribute::VariableAttribute { name, reference } => {
                    out.push_str(&self.render_variable_attribute(name, reference, scope));
                }
                Attribute::ConditionalAttribute { name, reference } => {
                    out.push_str(&self.render_conditional_attribute(name, reference, scope));
                }
            }
        }
    }
}

/// Engine selected by the `[export]` section.
pub fn engine_for(config: &ExportConfig) -> Box<dyn ExportEngine> {
    match config.engine {
        EngineKind::Hugo => Box::new(HugoExportEngine),
    }
}
