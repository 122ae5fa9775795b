//! Non-fatal findings collected while merging layouts and projecting pages.
//!
//! The engine never prints these itself; they travel back to the caller
//! inside the build result and the build layer decides how to report them.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which input of a merge an attribute came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    First,
    Second,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::First => "first",
            Self::Second => "second",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Warning {
    /// An attribute existed on only one side of a matched element and was dropped.
    #[error("dropped attribute `{name}` on <{element}>: only present on the {side} side")]
    UnresolvedAttribute {
        element: String,
        name: String,
        side: Side,
    },
    /// A node that could not be paired while projecting a page onto a layout.
    #[error("{pathname}: {detail}")]
    UnmatchedNode { pathname: String, detail: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Warning> {
        self.warnings.iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Warning;
    type IntoIter = std::slice::Iter<'a, Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
