//! Greedy alignment of two ordered sibling lists.
//!
//! # Algorithm
//!
//! ```text
//! first:  [a] [b] [c]          cursors advance together on a match,
//!          ^                   otherwise the side with strictly more
//! second: [a] [x] [b] [c]      remaining nodes emits its node alone
//!          ^
//! ```
//!
//! One forward pass, no backtracking. When both sides have the same number of
//! nodes left and the heads do not match, the second side is emitted first,
//! which can misalign lists that differ by a substitution rather than an
//! insertion. The trade-off keeps the walk linear and deterministic.

use crate::ast::Node;
use crate::diagnostics::{Diagnostics, Side};

use super::attrs::reconcile_attributes;
use super::equiv::equivalent;

/// Cursor positions at the moment a node is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub first: usize,
    pub second: usize,
}

/// What to do at each step of the walk.
///
/// The layout merge and the document differ share the cursor walk and differ
/// only in how nodes correspond and what a pair or a lone node turns into.
pub trait AlignPolicy {
    fn corresponds(&mut self, first: &Node, second: &Node) -> bool;

    fn merge_pair(&mut self, first: &Node, second: &Node) -> Node;

    fn unmatched(&mut self, node: &Node, side: Side, cursor: Cursor) -> Node;
}

/// Run the two-cursor walk over `first` and `second` with `policy`.
pub fn align_with<P: AlignPolicy>(first: &[Node], second: &[Node], policy: &mut P) -> Vec<Node> {
    let mut merged = Vec::with_capacity(first.len().max(second.len()));
    let (mut i, mut j) = (0, 0);

    while i < first.len() && j < second.len() {
        let (a, b) = (&first[i], &second[j]);
        let cursor = Cursor {
            first: i,
            second: j,
        };

        if policy.corresponds(a, b) {
            merged.push(policy.merge_pair(a, b));
            i += 1;
            j += 1;
        } else if first.len() - i > second.len() - j {
            merged.push(policy.unmatched(a, Side::First, cursor));
            i += 1;
        } else {
            merged.push(policy.unmatched(b, Side::Second, cursor));
            j += 1;
        }
    }

    // Trailing nodes are never aligned further
    for (offset, node) in first[i..].iter().enumerate() {
        let cursor = Cursor {
            first: i + offset,
            second: j,
        };
        merged.push(policy.unmatched(node, Side::First, cursor));
    }
    for (offset, node) in second[j..].iter().enumerate() {
        let cursor = Cursor {
            first: i,
            second: j + offset,
        };
        merged.push(policy.unmatched(node, Side::Second, cursor));
    }

    merged
}

/// Merge two layout sibling lists into one.
///
/// Placeholders absorb the literal they are matched with, matched elements
/// are merged recursively, and unmatched nodes are kept as they are.
pub fn align(first: &[Node], second: &[Node], diagnostics: &mut Diagnostics) -> Vec<Node> {
    align_with(first, second, &mut LayoutMerge { diagnostics })
}

struct LayoutMerge<'a> {
    diagnostics: &'a mut Diagnostics,
}

impl AlignPolicy for LayoutMerge<'_> {
    fn corresponds(&mut self, first: &Node, second: &Node) -> bool {
        equivalent(first, second)
    }

    fn merge_pair(&mut self, first: &Node, second: &Node) -> Node {
        // A conditional keeps its guard, but its child still takes in what the other side found
        match (first, second) {
            (
                Node::Conditional { reference, child },
                Node::Conditional {
                    child: other_child, ..
                },
            ) => {
                return Node::conditional(reference.clone(), self.merge_pair(child, other_child));
            }
            (Node::Conditional { reference, child }, other) => {
                return Node::conditional(reference.clone(), self.merge_pair(child, other));
            }
            (other, Node::Conditional { reference, child }) => {
                return Node::conditional(reference.clone(), self.merge_pair(other, child));
            }
            _ => {}
        }

        if first.is_placeholder() {
            return first.clone();
        }
        if second.is_placeholder() {
            return second.clone();
        }

        match (first, second) {
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
                let attrs = reconcile_attributes(name, first_attrs, second_attrs, self.diagnostics);
                let children = align_with(first_children, second_children, self);
                Node::element(name.clone(), attrs, children)
            }
            _ => first.clone(),
        }
    }

    fn unmatched(&mut self, node: &Node, _side: Side, _cursor: Cursor) -> Node {
        node.clone()
    }
}
