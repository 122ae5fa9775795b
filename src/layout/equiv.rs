//! Positional equivalence between two nodes.
//!
//! Two nodes are equivalent when they may occupy the same slot of a layout.
//! This is deliberately shallower than equality: elements only compare their
//! tag name, and attributes/children are reconciled after the match.

use crate::ast::Node;

/// Decide whether `first` and `second` align with each other.
///
/// Rules, in order:
/// 1. a `conditional` is compared through its child,
/// 2. `text` and `variable` always align,
/// 3. otherwise the kinds must match, plus an equal value for `doctype`,
///    `text` and `variable`, and an equal tag name for `element`.
pub fn equivalent(first: &Node, second: &Node) -> bool {
    match (first, second) {
        (_, Node::Conditional { child, .. }) => equivalent(first, child),
        (Node::Conditional { child, .. }, _) => equivalent(child, second),

        (Node::Text { .. }, Node::Variable { .. }) | (Node::Variable { .. }, Node::Text { .. }) => {
            true
        }

        (Node::Doctype { value: a }, Node::Doctype { value: b }) => a == b,
        (Node::Variable { reference: a }, Node::Variable { reference: b }) => a == b,
        (Node::Text { value: a }, Node::Text { value: b }) => a == b,
        (Node::Element { name: a, .. }, Node::Element { name: b, .. }) => a == b,

        // comment, content, loop, markdown-variable: same kind is enough
        (a, b) => a.kind() == b.kind(),
    }
}
