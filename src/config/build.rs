//! `[build]` section configuration.
//!
//! Where rendered HTML is read from and where the exported project goes.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in refold.toml.
///
/// # Example
/// ```toml
/// [build]
/// source = "site"          # Rendered HTML to learn from
/// output = "hugo"          # Exported project
/// trim_whitespace = true
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Directory of rendered HTML pages and their static files.
    #[serde(default = "defaults::build::source")]
    #[educe(Default = defaults::build::source())]
    pub source: PathBuf,

    /// Export output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Remove the output directory before exporting.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub clean: bool,

    /// Collapse whitespace in text and drop whitespace-only text nodes.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub trim_whitespace: bool,
}
