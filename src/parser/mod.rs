//! Rendered HTML → [`Node`] tree.
//!
//! Built on the `quick-xml` event reader with every well-formedness check
//! disabled, plus the few HTML rules an XML reader does not know about:
//!
//! - void elements (`<br>`, `<meta ...>`) never wait for a closing tag
//! - `<script>`/`<style>` bodies are read verbatim up to their end tag
//! - a stray or mismatched end tag closes the nearest matching open element
//! - entity references (`&amp;`, `&#169;`) are decoded into the text

pub mod selector;

pub use selector::{Selector, extract_content};

use crate::ast::{Attribute, Node, is_raw_text_element, is_void_element};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use std::borrow::Cow;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed markup at byte {position}")]
    Syntax {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },
}

/// Knobs for turning markup into a tree.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Collapse whitespace runs in text and drop whitespace-only text.
    pub trim_whitespace: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            trim_whitespace: true,
        }
    }
}

#[inline]
fn create_html_reader(content: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(content.as_bytes());
    let config = reader.config_mut();
    config.trim_text(false);
    config.enable_all_checks(false);
    config.allow_unmatched_ends = true;
    reader
}

/// Parse `content` into a list of top-level nodes.
pub fn parse_html(content: &str, options: &ParseOptions) -> Result<Vec<Node>, ParseError> {
    let mut reader = create_html_reader(content);
    let mut builder = TreeBuilder::new(options);

    loop {
        let event = reader.read_event().map_err(|source| ParseError::Syntax {
            position: reader.error_position() as u64,
            source,
        })?;

        match event {
            Event::Start(elem) => {
                let (name, attrs) = element_parts(&elem);
                if is_void_element(&name) {
                    builder.push(Node::element(name, attrs, vec![]));
                } else if is_raw_text_element(&name) {
                    let span = reader
                        .read_to_end(elem.name())
                        .map_err(|source| ParseError::Syntax {
                            position: reader.error_position() as u64,
                            source,
                        })?;
                    let body = &content.as_bytes()[span.start as usize..span.end as usize];
                    let text = String::from_utf8_lossy(body);
                    let children = if text.trim().is_empty() {
                        vec![]
                    } else {
                        vec![Node::text(text.into_owned())]
                    };
                    builder.push(Node::element(name, attrs, children));
                } else {
                    builder.open(name, attrs);
                }
            }
            Event::Empty(elem) => {
                let (name, attrs) = element_parts(&elem);
                builder.push(Node::element(name, attrs, vec![]));
            }
            Event::End(elem) => {
                let name = String::from_utf8_lossy(elem.name().as_ref()).to_ascii_lowercase();
                builder.close(&name);
            }
            Event::Text(text) => builder.text(&String::from_utf8_lossy(&text)),
            Event::CData(data) => builder.text(&String::from_utf8_lossy(&data)),
            Event::GeneralRef(entity) => {
                let raw = format!("&{};", String::from_utf8_lossy(&entity));
                builder.text(&unescape(&raw));
            }
            Event::Comment(comment) => {
                let value = String::from_utf8_lossy(&comment).trim().to_owned();
                builder.push(Node::Comment { value });
            }
            Event::DocType(doctype) => {
                let value = String::from_utf8_lossy(&doctype).trim().to_owned();
                builder.push(Node::Doctype { value });
            }
            Event::Decl(_) | Event::PI(_) => {}
            Event::Eof => break,
        }
    }

    Ok(builder.finish())
}

/// Lower-cased tag name plus its attributes in source order.
///
/// Boolean attributes (`<input disabled>`) get an empty value and repeated
/// names keep their first occurrence.
fn element_parts(elem: &BytesStart<'_>) -> (String, Vec<Attribute>) {
    let name = String::from_utf8_lossy(elem.name().as_ref()).to_ascii_lowercase();
    let mut attrs: Vec<Attribute> = Vec::new();
    for attr in elem.html_attributes().with_checks(false).flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        if attrs.iter().any(|a| a.name() == key) {
            continue;
        }
        let value = unescape(&String::from_utf8_lossy(&attr.value));
        attrs.push(Attribute::new(key, value));
    }
    (name, attrs)
}

/// Decode entity references, leaving unknown ones as written.
fn unescape(raw: &str) -> String {
    quick_xml::escape::unescape(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_owned())
}

// ============================================================================
// Tree Builder
// ============================================================================

struct OpenElement {
    name: String,
    attrs: Vec<Attribute>,
    children: Vec<Node>,
}

/// Assembles nodes from reader events, tolerating unbalanced markup.
struct TreeBuilder<'a> {
    options: &'a ParseOptions,
    root: Vec<Node>,
    stack: Vec<OpenElement>,
    /// Text and entity events are split by the reader; glue them back here.
    pending: String,
}

impl<'a> TreeBuilder<'a> {
    fn new(options: &'a ParseOptions) -> Self {
        Self {
            options,
            root: Vec::new(),
            stack: Vec::new(),
            pending: String::new(),
        }
    }

    fn text(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    fn open(&mut self, name: String, attrs: Vec<Attribute>) {
        self.flush_text();
        self.stack.push(OpenElement {
            name,
            attrs,
            children: Vec::new(),
        });
    }

    fn push(&mut self, node: Node) {
        self.flush_text();
        self.append(node);
    }

    fn close(&mut self, name: &str) {
        self.flush_text();
        // Ignore end tags with no open element to close
        let Some(depth) = self.stack.iter().rposition(|open| open.name == name) else {
            return;
        };
        while self.stack.len() > depth {
            self.pop();
        }
    }

    fn finish(mut self) -> Vec<Node> {
        self.flush_text();
        while !self.stack.is_empty() {
            self.pop();
        }
        self.root
    }

    fn pop(&mut self) {
        if let Some(open) = self.stack.pop() {
            self.append(Node::element(open.name, open.attrs, open.children));
        }
    }

    fn append(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    fn flush_text(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let raw = std::mem::take(&mut self.pending);
        let value = if self.options.trim_whitespace {
            collapse_whitespace(&raw)
        } else {
            raw
        };
        if !value.is_empty() {
            self.append(Node::Text { value });
        }
    }
}

/// Collapse whitespace runs to one space and trim both ends.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
