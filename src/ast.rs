//! Tree model shared by the parser, the layout engine and the exporters.
//!
//! Nodes and attributes serialize with an internal `"type"` tag so the JSON
//! output reads like:
//!
//! ```json
//! { "type": "element", "name": "h1", "attrs": [], "children": [
//!     { "type": "variable", "reference": "var1" }
//! ] }
//! ```

use serde::{Deserialize, Serialize};

/// Elements that never have children or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text content is written verbatim (no entity escaping).
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[inline]
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

#[inline]
pub fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

// ============================================================================
// Nodes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Node {
    Doctype {
        value: String,
    },
    Element {
        name: String,
        #[serde(default)]
        attrs: Vec<Attribute>,
        #[serde(default)]
        children: Vec<Node>,
    },
    Text {
        value: String,
    },
    Comment {
        value: String,
    },
    /// Literal text that differs between documents.
    Variable {
        reference: String,
    },
    /// A node that only some documents contain.
    Conditional {
        reference: String,
        child: Box<Node>,
    },
    /// Injection point for the page body.
    Content,
    MarkdownVariable {
        reference: String,
    },
    Loop {
        reference: String,
        template: Box<Node>,
    },
}

/// Discriminant of a [`Node`], used for diagnostics and equivalence checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Doctype,
    Element,
    Text,
    Comment,
    Variable,
    Conditional,
    Content,
    MarkdownVariable,
    Loop,
}

impl NodeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Doctype => "doctype",
            Self::Element => "element",
            Self::Text => "text",
            Self::Comment => "comment",
            Self::Variable => "variable",
            Self::Conditional => "conditional",
            Self::Content => "content",
            Self::MarkdownVariable => "markdown-variable",
            Self::Loop => "loop",
        }
    }
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    pub fn variable(reference: impl Into<String>) -> Self {
        Self::Variable {
            reference: reference.into(),
        }
    }

    pub fn element(name: impl Into<String>, attrs: Vec<Attribute>, children: Vec<Node>) -> Self {
        Self::Element {
            name: name.into(),
            attrs,
            children,
        }
    }

    pub fn conditional(reference: impl Into<String>, child: Node) -> Self {
        Self::Conditional {
            reference: reference.into(),
            child: Box::new(child),
        }
    }

    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Doctype { .. } => NodeKind::Doctype,
            Self::Element { .. } => NodeKind::Element,
            Self::Text { .. } => NodeKind::Text,
            Self::Comment { .. } => NodeKind::Comment,
            Self::Variable { .. } => NodeKind::Variable,
            Self::Conditional { .. } => NodeKind::Conditional,
            Self::Content => NodeKind::Content,
            Self::MarkdownVariable { .. } => NodeKind::MarkdownVariable,
            Self::Loop { .. } => NodeKind::Loop,
        }
    }

    /// Placeholders absorb literal nodes when two trees are merged.
    pub const fn is_placeholder(&self) -> bool {
        matches!(self, Self::Variable { .. } | Self::Conditional { .. })
    }

    /// Short human-readable label, e.g. `<h1>` or `text "Hello"`.
    pub fn describe(&self) -> String {
        match self {
            Self::Element { name, .. } => format!("<{name}>"),
            Self::Text { value } => format!("text {value:?}"),
            Self::Doctype { value } => format!("doctype {value:?}"),
            Self::Comment { value } => format!("comment {value:?}"),
            Self::Content => "content".into(),
            Self::Variable { reference }
            | Self::Conditional { reference, .. }
            | Self::MarkdownVariable { reference }
            | Self::Loop { reference, .. } => format!("{} {reference}", self.kind().as_str()),
        }
    }
}

// ============================================================================
// Attributes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Attribute {
    Attribute { name: String, value: String },
    VariableAttribute { name: String, reference: String },
    ConditionalAttribute { name: String, reference: String },
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Attribute {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Attribute { name, .. }
            | Self::VariableAttribute { name, .. }
            | Self::ConditionalAttribute { name, .. } => name,
        }
    }

    pub const fn is_placeholder(&self) -> bool {
        !matches!(self, Self::Attribute { .. })
    }
}

// ============================================================================
// Traversal
// ============================================================================

/// Visit every node of `tree` in document (pre-)order.
///
/// Conditional children and loop templates are visited after their wrapper.
pub fn walk<'a>(tree: &'a [Node], visit: &mut impl FnMut(&'a Node)) {
    for node in tree {
        visit(node);
        match node {
            Node::Element { children, .. } => walk(children, visit),
            Node::Conditional { child, .. } => walk(std::slice::from_ref(child.as_ref()), visit),
            Node::Loop { template, .. } => walk(std::slice::from_ref(template.as_ref()), visit),
            _ => {}
        }
    }
}
