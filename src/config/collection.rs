//! `[collections.<key>]` section configuration.

use super::error::ConfigError;
use crate::parser::Selector;
use serde::{Deserialize, Serialize};

/// One group of pages that share a layout.
///
/// # Example
/// ```toml
/// [collections.posts]
/// sub_path = "posts/"
/// exclude = ["posts/index.html"]
/// content = "article"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectionConfig {
    /// Pathname prefix of the collection's pages.
    pub sub_path: String,

    /// Exact pathnames; when set, every other rule is ignored.
    pub only: Option<Vec<String>>,

    /// Pathnames added regardless of `sub_path`.
    pub include: Vec<String>,

    /// Pathnames removed even when under `sub_path`.
    pub exclude: Vec<String>,

    /// Element wrapping each page's body: `tag`, `#id` or `.class`.
    pub content: Option<String>,
}

impl CollectionConfig {
    pub fn content_selector(&self) -> Result<Option<Selector>, ConfigError> {
        self.content
            .as_deref()
            .map(|content| content.parse().map_err(ConfigError::Validation))
            .transpose()
    }
}
