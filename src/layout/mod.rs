//! Layout inference engine.
//!
//! - **equiv**: whether two nodes may share a layout slot
//! - **attrs**: attribute reconciliation for matched elements
//! - **align**: the greedy sibling-list alignment everything builds on
//!
//! # Flow
//!
//! ```text
//! Document::diff() ──► Layout (per pair) ──► Layout::merge() ──► Layout::normalized()
//!                                               (align)            (unique references)
//! ```

pub mod align;
pub mod attrs;
pub mod equiv;

pub use align::{AlignPolicy, Cursor, align, align_with};
pub use equiv::equivalent;

use crate::ast::{Attribute, Node};
use crate::diagnostics::Diagnostics;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// Template tree shared by every page of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub tree: Vec<Node>,
}

impl Layout {
    pub const fn new(tree: Vec<Node>) -> Self {
        Self { tree }
    }

    /// Align this layout with `other`, producing a new layout.
    pub fn merge(&self, other: &Layout, diagnostics: &mut Diagnostics) -> Layout {
        Layout::new(align(&self.tree, &other.tree, diagnostics))
    }

    /// Rename repeated references so every placeholder slot has its own name.
    ///
    /// The first occurrence (document order) keeps its name, later ones get
    /// `_2`, `_3`, ... appended. Loop templates form their own namespace.
    pub fn normalized(self) -> Layout {
        let mut names = Namespace::default();
        Layout::new(names.rename_all(self.tree))
    }

    /// All top-level references in document order (loop templates excluded).
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        collect_references(&self.tree, &mut refs);
        refs
    }
}

fn collect_references<'a>(tree: &'a [Node], refs: &mut Vec<&'a str>) {
    for node in tree {
        match node {
            Node::Element {
                attrs, children, ..
            } => {
                refs.extend(attrs.iter().filter_map(|attr| match attr {
                    Attribute::Attribute { .. } => None,
                    Attribute::VariableAttribute { reference, .. }
                    | Attribute::ConditionalAttribute { reference, .. } => Some(reference.as_str()),
                }));
                collect_references(children, refs);
            }
            Node::Conditional { reference, child } => {
                refs.push(reference);
                collect_references(std::slice::from_ref(child.as_ref()), refs);
            }
            Node::Variable { reference }
            | Node::MarkdownVariable { reference }
            | Node::Loop { reference, .. } => refs.push(reference),
            Node::Doctype { .. } | Node::Text { .. } | Node::Comment { .. } | Node::Content => {}
        }
    }
}

#[derive(Default)]
struct Namespace {
    seen: FxHashSet<String>,
    counters: FxHashMap<String, usize>,
}

impl Namespace {
    fn unique(&mut self, reference: String) -> String {
        if self.seen.insert(reference.clone()) {
            return reference;
        }
        let counter = self.counters.entry(reference.clone()).or_insert(1);
        loop {
            *counter += 1;
            let candidate = format!("{reference}_{counter}");
            if self.seen.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    fn rename_all(&mut self, tree: Vec<Node>) -> Vec<Node> {
        tree.into_iter().map(|node| self.rename(node)).collect()
    }

    fn rename(&mut self, node: Node) -> Node {
        match node {
            Node::Element {
                name,
                attrs,
                children,
            } => {
                let attrs = attrs
                    .into_iter()
                    .map(|attr| match attr {
                        Attribute::VariableAttribute { name, reference } => {
                            Attribute::VariableAttribute {
                                name,
                                reference: self.unique(reference),
                            }
                        }
                        Attribute::ConditionalAttribute { name, reference } => {
                            Attribute::ConditionalAttribute {
                                name,
                                reference: self.unique(reference),
                            }
                        }
                        attr @ Attribute::Attribute { .. } => attr,
                    })
                    .collect();
                let children = self.rename_all(children);
                Node::Element {
                    name,
                    attrs,
                    children,
                }
            }
            Node::Variable { reference } => Node::Variable {
                reference: self.unique(reference),
            },
            Node::MarkdownVariable { reference } => Node::MarkdownVariable {
                reference: self.unique(reference),
            },
            Node::Conditional { reference, child } => {
                let reference = self.unique(reference);
                Node::Conditional {
                    reference,
                    child: Box::new(self.rename(*child)),
                }
            }
            Node::Loop {
                reference,
                template,
            } => {
                let reference = self.unique(reference);
                let template = Namespace::default().rename(*template);
                Node::Loop {
                    reference,
                    template: Box::new(template),
                }
            }
            node @ (Node::Doctype { .. } | Node::Text { .. } | Node::Comment { .. } | Node::Content) => {
                node
            }
        }
    }
}
