//! Attribute reconciliation for a matched pair of elements.

use crate::ast::Attribute;
use crate::diagnostics::{Diagnostics, Side, Warning};
use rustc_hash::FxHashMap;

/// Merge the attribute lists of two matched `element` nodes.
///
/// Only names present on both sides survive, in `first`'s order. The
/// placeholder form wins when `first` carries one, otherwise `second`'s
/// attribute is kept. Names found on one side only are dropped and reported.
pub fn reconcile_attributes(
    element: &str,
    first: &[Attribute],
    second: &[Attribute],
    diagnostics: &mut Diagnostics,
) -> Vec<Attribute> {
    let mut remaining: FxHashMap<&str, &Attribute> =
        second.iter().map(|attr| (attr.name(), attr)).collect();
    let mut merged = Vec::with_capacity(first.len().min(second.len()));

    for attr in first {
        let Some(other) = remaining.remove(attr.name()) else {
            diagnostics.push(dropped(element, attr, Side::First));
            continue;
        };
        if attr.is_placeholder() {
            merged.push(attr.clone());
        } else {
            merged.push(other.clone());
        }
    }

    // Walk `second` again so leftovers are reported in source order
    for attr in second {
        if remaining.contains_key(attr.name()) {
            diagnostics.push(dropped(element, attr, Side::Second));
        }
    }

    merged
}

fn dropped(element: &str, attr: &Attribute, side: Side) -> Warning {
    Warning::UnresolvedAttribute {
        element: element.to_owned(),
        name: attr.name().to_owned(),
        side,
    }
}
