//! Parsed input documents and the pairwise differ.
//!
//! # Reference naming
//!
//! Placeholder names are derived from positions in the anchor document, so
//! diffing several documents against the same anchor yields the same name for
//! the same anchor slot:
//!
//! | Name              | Placeholder                                   | Position                               |
//! |-------------------|-----------------------------------------------|----------------------------------------|
//! | `var{n}`          | text that differs                             | n-th text node of the anchor           |
//! | `attr{n}`         | attribute value that differs                  | n-th attribute of the anchor           |
//! | `show{n}`         | anchor node missing from the other document   | n-th node of the anchor (pre-order)    |
//! | `extra{p}_{i}_{k}`| node only the other document has              | k-th insertion before child i of node p|

use crate::ast::{Attribute, Node, walk};
use crate::diagnostics::{Diagnostics, Side, Warning};
use crate::layout::{AlignPolicy, Cursor, Layout, align_with, equivalent};
use crate::page::{Data, Page, Value};
use crate::parser::{ParseOptions, Selector, extract_content, parse_html};
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// One rendered HTML file, parsed once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Document {
    pub pathname: String,
    /// Parsed tree; the page body is replaced by a `content` node when a
    /// content selector matched.
    pub tree: Arc<Vec<Node>>,
    /// Children of the content element, empty without a selector.
    pub content: Vec<Node>,
}

/// Outcome of comparing two documents.
#[derive(Debug, Clone)]
pub struct DiffResult {
    /// Converged tree with anchor-relative names, used as a folding target.
    pub base: Layout,
    /// Anchor page first, then the other document's page.
    pub pages: [Page; 2],
    /// Reportable layout: `base` with unique references.
    pub layout: Layout,
    pub diagnostics: Diagnostics,
}

impl Document {
    /// Parse `raw` markup, lifting out the body matched by `content`.
    pub fn parse(
        pathname: impl Into<String>,
        raw: &str,
        options: &ParseOptions,
        content: Option<&Selector>,
    ) -> Result<Self> {
        let pathname = pathname.into();
        let mut tree =
            parse_html(raw, options).with_context(|| format!("Failed to parse `{pathname}`"))?;
        let body = content
            .and_then(|selector| extract_content(&mut tree, selector))
            .unwrap_or_default();

        Ok(Self {
            pathname,
            tree: Arc::new(tree),
            content: body,
        })
    }

    /// Compare this document (the anchor) with `other`.
    ///
    /// Texts at corresponding positions always pair up: equal ones stay
    /// literal, different ones become a `variable`. Nodes only one side has
    /// become a `conditional`. Both pages record the concrete value of every
    /// placeholder introduced.
    pub fn diff(&self, other: &Document) -> DiffResult {
        let mut differ = Differ::default();
        let tree = align_with(&self.tree, &other.tree, &mut differ);

        let base = Layout::new(tree);
        let layout = base.clone().normalized();
        let pages = [
            Page::new(
                self.pathname.clone(),
                differ.anchor,
                self.content.clone(),
                Arc::clone(&self.tree),
            ),
            Page::new(
                other.pathname.clone(),
                differ.other,
                other.content.clone(),
                Arc::clone(&other.tree),
            ),
        ];

        DiffResult {
            base,
            pages,
            layout,
            diagnostics: differ.diagnostics,
        }
    }
}

// ============================================================================
// Differ
// ============================================================================

/// Alignment policy that turns literal differences into placeholders.
///
/// Anchor nodes are visited exactly once and in document order (matched ones
/// through `merge_pair`, missing ones through `unmatched`), which is what
/// keeps the ordinal counters in step with the anchor tree.
#[derive(Default)]
struct Differ {
    anchor: Data,
    other: Data,
    diagnostics: Diagnostics,
    /// Pre-order ordinal of the last anchor node visited.
    nodes: usize,
    /// Ordinal of the last anchor text node visited.
    texts: usize,
    /// Ordinal of the last anchor attribute visited.
    attrs: usize,
    /// Ordinals of the enclosing anchor elements.
    parents: Vec<usize>,
    /// Last insertion point and the number of insertions made there.
    insertion: Option<(usize, usize, usize)>,
}

impl Differ {
    /// Account for a whole anchor subtree that is not descended into.
    fn skip_subtree(&mut self, node: &Node) {
        walk(std::slice::from_ref(node), &mut |n| {
            self.nodes += 1;
            match n {
                Node::Text { .. } => self.texts += 1,
                Node::Element { attrs, .. } => self.attrs += attrs.len(),
                _ => {}
            }
        });
    }

    fn record(&mut self, reference: &str, anchor: Value, other: Value) {
        self.anchor.insert(reference.to_owned(), anchor);
        self.other.insert(reference.to_owned(), other);
    }

    fn attributes(&mut self, element: &str, anchor: &[Attribute], other: &[Attribute]) -> Vec<Attribute> {
        let mut remaining: FxHashMap<&str, &Attribute> =
            other.iter().map(|attr| (attr.name(), attr)).collect();
        let mut merged = Vec::with_capacity(anchor.len());

        for attr in anchor {
            self.attrs += 1;
            let Some(counterpart) = remaining.remove(attr.name()) else {
                self.diagnostics.push(Warning::UnresolvedAttribute {
                    element: element.to_owned(),
                    name: attr.name().to_owned(),
                    side: Side::First,
                });
                continue;
            };
            match (attr, counterpart) {
                (Attribute::Attribute { name, value: a }, Attribute::Attribute { value: b, .. })
                    if a != b =>
                {
                    let reference = format!("attr{}", self.attrs);
                    self.record(&reference, Value::Text(a.clone()), Value::Text(b.clone()));
                    merged.push(Attribute::VariableAttribute {
                        name: name.clone(),
                        reference,
                    });
                }
                _ => merged.push(attr.clone()),
            }
        }

        // Walk `other` again so leftovers are reported in source order
        for attr in other {
            if remaining.contains_key(attr.name()) {
                self.diagnostics.push(Warning::UnresolvedAttribute {
                    element: element.to_owned(),
                    name: attr.name().to_owned(),
                    side: Side::Second,
                });
            }
        }

        merged
    }
}

impl AlignPolicy for Differ {
    fn corresponds(&mut self, first: &Node, second: &Node) -> bool {
        match (first, second) {
            (Node::Text { .. }, Node::Text { .. }) => true,
            _ => equivalent(first, second),
        }
    }

    fn merge_pair(&mut self, first: &Node, second: &Node) -> Node {
        match (first, second) {
            (Node::Text { value: a }, Node::Text { value: b }) => {
                self.nodes += 1;
                self.texts += 1;
                if a == b {
                    return first.clone();
                }
                let reference = format!("var{}", self.texts);
                self.record(&reference, Value::Text(a.clone()), Value::Text(b.clone()));
                Node::variable(reference)
            }
            (
                Node::Element {
                    name,
                    attrs: first_attrs,
                    children: first_children,
                },
                Node::Element {
                    attrs: second_attrs,
                    children: second_children,
                    ..
                },
            ) => {
                self.nodes += 1;
                let ordinal = self.nodes;
                let attrs = self.attributes(name, first_attrs, second_attrs);

                self.parents.push(ordinal);
                let children = align_with(first_children, second_children, self);
                self.parents.pop();

                Node::element(name.clone(), attrs, children)
            }
            _ => {
                self.skip_subtree(first);
                first.clone()
            }
        }
    }

    fn unmatched(&mut self, node: &Node, side: Side, cursor: Cursor) -> Node {
        let reference = match side {
            Side::First => {
                let reference = format!("show{}", self.nodes + 1);
                self.skip_subtree(node);
                self.record(&reference, Value::Flag(true), Value::Flag(false));
                reference
            }
            Side::Second => {
                let parent = self.parents.last().copied().unwrap_or(0);
                let count = match self.insertion {
                    Some((p, i, k)) if p == parent && i == cursor.first => k + 1,
                    _ => 1,
                };
                self.insertion = Some((parent, cursor.first, count));
                let reference = format!("extra{parent}_{}_{count}", cursor.first);
                self.record(&reference, Value::Flag(false), Value::Flag(true));
                reference
            }
        };
        Node::conditional(reference, node.clone())
    }
}
