//! Per-document data bound to a layout's placeholders.
//!
//! A [`Page`] keeps a read-only handle on the tree it was parsed from, so it
//! can be re-projected whenever the layout it is measured against changes:
//!
//! ```text
//! layout:  <h1>{{var1}}</h1> {{#if show3}}<p>..</p>{{/if}}
//! source:  <h1>Hello</h1>
//! data:    { var1 = "Hello", show3 = false }
//! ```

use crate::ast::{Attribute, Node};
use crate::diagnostics::{Diagnostics, Warning};
use crate::layout::{Layout, equivalent};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Placeholder name → concrete value.
pub type Data = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Presence of a conditional node or attribute.
    Flag(bool),
    Text(String),
    /// One record per repetition of a loop template.
    List(Vec<Data>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether a conditional guarded by this value renders.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Text(text) => !text.is_empty(),
            Self::List(items) => !items.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub pathname: String,
    pub data: Data,
    /// Page body, injected where the layout has a `content` node.
    pub content: Vec<Node>,
    #[serde(skip)]
    source: Arc<Vec<Node>>,
}

impl Page {
    pub fn new(
        pathname: impl Into<String>,
        data: Data,
        content: Vec<Node>,
        source: Arc<Vec<Node>>,
    ) -> Self {
        Self {
            pathname: pathname.into(),
            data,
            content,
            source,
        }
    }

    /// Tree this page was derived from (body replaced by `content`, if any).
    pub fn source(&self) -> &[Node] {
        &self.source
    }

    /// Re-project onto another base while keeping what this page already knows.
    ///
    /// Values recovered from `base` take precedence; stored values for
    /// references `base` does not mention are carried over unchanged, so the
    /// result covers the union of both bases.
    pub fn merge(&self, base: &Layout) -> Page {
        // Mismatches against a partial base are expected; the final projection reports them
        let mut scratch = Diagnostics::new();
        let mut data = self.data.clone();
        data.extend(self.resolve(&base.tree, &mut scratch));
        self.with_data(data)
    }

    /// Re-project onto the final `layout`, reporting anything that does not fit.
    ///
    /// Data is rebuilt from scratch for the references of `layout`. A text
    /// placeholder the source tree cannot supply falls back to the value this
    /// page already stored under the same name, and is left absent otherwise.
    pub fn project(&self, layout: &Layout, diagnostics: &mut Diagnostics) -> Page {
        let mut data = self.resolve(&layout.tree, diagnostics);
        for reference in layout.references() {
            if data.contains_key(reference) {
                continue;
            }
            if let Some(stored) = self.data.get(reference) {
                data.insert(reference.to_owned(), stored.clone());
            }
        }
        self.with_data(data)
    }

    /// Substitute this page's data into `layout`, giving back a concrete tree.
    pub fn render(&self, layout: &Layout) -> Vec<Node> {
        let mut out = Vec::with_capacity(layout.tree.len());
        self.render_into(&layout.tree, &self.data, &mut out);
        out
    }

    fn with_data(&self, data: Data) -> Page {
        Page {
            pathname: self.pathname.clone(),
            data,
            content: self.content.clone(),
            source: Arc::clone(&self.source),
        }
    }

    fn resolve(&self, layout: &[Node], diagnostics: &mut Diagnostics) -> Data {
        let mut projector = Projector {
            pathname: &self.pathname,
            diagnostics,
        };
        let mut data = Data::new();
        projector.sequence(layout, self.source(), &mut data);
        data
    }

    fn render_into(&self, layout: &[Node], scope: &Data, out: &mut Vec<Node>) {
        for node in layout {
            match node {
                Node::Variable { reference } | Node::MarkdownVariable { reference } => {
                    if let Some(text) = scope.get(reference).and_then(Value::as_text) {
                        out.push(Node::text(text));
                    }
                }
                Node::Conditional { reference, child } => {
                    if scope.get(reference).is_some_and(Value::is_truthy) {
                        self.render_into(std::slice::from_ref(child.as_ref()), scope, out);
                    }
                }
                Node::Loop {
                    reference,
                    template,
                } => {
                    if let Some(Value::List(items)) = scope.get(reference) {
                        for item in items {
                            self.render_into(std::slice::from_ref(template.as_ref()), item, out);
                        }
                    }
                }
                Node::Content => out.extend(self.content.iter().cloned()),
                Node::Element {
                    name,
                    attrs,
                    children,
                } => {
                    let attrs = attrs
                        .iter()
                        .filter_map(|attr| render_attribute(attr, scope))
                        .collect();
                    let mut rendered = Vec::with_capacity(children.len());
                    self.render_into(children, scope, &mut rendered);
                    out.push(Node::element(name.clone(), attrs, rendered));
                }
                Node::Doctype { .. } | Node::Text { .. } | Node::Comment { .. } => {
                    out.push(node.clone());
                }
            }
        }
    }
}

fn render_attribute(attr: &Attribute, scope: &Data) -> Option<Attribute> {
    match attr {
        Attribute::Attribute { .. } => Some(attr.clone()),
        Attribute::VariableAttribute { name, reference } => {
            let value = scope.get(reference).and_then(Value::as_text).unwrap_or_default();
            Some(Attribute::new(name.clone(), value))
        }
        Attribute::ConditionalAttribute { name, reference } => scope
            .get(reference)
            .and_then(Value::as_text)
            .map(|value| Attribute::new(name.clone(), value)),
    }
}

// ============================================================================
// Projection
// ============================================================================

/// Matches a layout against a concrete tree, collecting placeholder values.
struct Projector<'a> {
    pathname: &'a str,
    diagnostics: &'a mut Diagnostics,
}

impl Projector<'_> {
    fn sequence(&mut self, layout: &[Node], concrete: &[Node], data: &mut Data) {
        let (mut i, mut j) = (0, 0);

        while i < layout.len() {
            let node = &layout[i];
            // Leave enough concrete nodes for the slots that must be filled later
            let spare = concrete.len() - j > required(&layout[i + 1..]);

            match node {
                Node::Conditional { reference, child } => {
                    let present = spare && accepts(child, &concrete[j]);
                    if present {
                        self.node(child, &concrete[j], data);
                        j += 1;
                    }
                    data.insert(reference.clone(), Value::Flag(present));
                    i += 1;
                }
                Node::Loop {
                    reference,
                    template,
                } => {
                    let mut items = Vec::new();
                    while j < concrete.len()
                        && concrete.len() - j > required(&layout[i + 1..])
                        && accepts(template, &concrete[j])
                    {
                        let mut item = Data::new();
                        self.node(template, &concrete[j], &mut item);
                        items.push(item);
                        j += 1;
                    }
                    data.insert(reference.clone(), Value::List(items));
                    i += 1;
                }
                _ if j < concrete.len() && accepts(node, &concrete[j]) => {
                    self.node(node, &concrete[j], data);
                    i += 1;
                    j += 1;
                }
                _ if j < concrete.len() && concrete.len() - j > layout.len() - i => {
                    self.unmatched(format!(
                        "{} has no slot in the layout",
                        concrete[j].describe()
                    ));
                    j += 1;
                }
                _ => {
                    self.unmatched(format!(
                        "layout expects {} which the page lacks",
                        node.describe()
                    ));
                    i += 1;
                }
            }
        }

        for extra in &concrete[j..] {
            self.unmatched(format!("{} has no slot in the layout", extra.describe()));
        }
    }

    fn node(&mut self, template: &Node, concrete: &Node, data: &mut Data) {
        match (template, concrete) {
            (
                Node::Variable { reference } | Node::MarkdownVariable { reference },
                Node::Text { value },
            ) => {
                data.insert(reference.clone(), Value::Text(value.clone()));
            }
            (
                Node::Element {
                    name,
                    attrs,
                    children,
                },
                Node::Element {
                    attrs: concrete_attrs,
                    children: concrete_children,
                    ..
                },
            ) => {
                self.attributes(name, attrs, concrete_attrs, data);
                self.sequence(children, concrete_children, data);
            }
            _ => {}
        }
    }

    fn attributes(&mut self, element: &str, attrs: &[Attribute], concrete: &[Attribute], data: &mut Data) {
        let values: FxHashMap<&str, &String> = concrete
            .iter()
            .filter_map(|attr| match attr {
                Attribute::Attribute { name, value } => Some((name.as_str(), value)),
                _ => None,
            })
            .collect();
        let lookup = |name: &str| values.get(name).copied();

        for attr in attrs {
            match attr {
                Attribute::Attribute { .. } => {}
                Attribute::VariableAttribute { name, reference } => match lookup(name) {
                    Some(value) => {
                        data.insert(reference.clone(), Value::Text(value.clone()));
                    }
                    None => self.unmatched(format!(
                        "attribute `{name}` on <{element}> is missing from the page"
                    )),
                },
                Attribute::ConditionalAttribute { name, reference } => {
                    let value = lookup(name).map_or(Value::Flag(false), |v| Value::Text(v.clone()));
                    data.insert(reference.clone(), value);
                }
            }
        }
    }

    fn unmatched(&mut self, detail: String) {
        self.diagnostics.push(Warning::UnmatchedNode {
            pathname: self.pathname.to_owned(),
            detail,
        });
    }
}

/// Whether `concrete` can fill the layout slot `template`.
fn accepts(template: &Node, concrete: &Node) -> bool {
    match (template, concrete) {
        (Node::MarkdownVariable { .. }, Node::Text { .. }) => true,
        _ => equivalent(template, concrete),
    }
}

/// Number of concrete nodes `layout` needs at minimum.
fn required(layout: &[Node]) -> usize {
    layout
        .iter()
        .filter(|node| !matches!(node, Node::Conditional { .. } | Node::Loop { .. }))
        .count()
}
