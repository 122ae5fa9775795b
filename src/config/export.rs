//! `[export]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// Target static-site generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Hugo,
}

/// `[export]` section in refold.toml.
///
/// # Example
/// ```toml
/// [export]
/// engine = "hugo"
/// base_url = "https://example.com/"
/// title = "My Site"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub engine: EngineKind,

    /// Base URL written to the generator config.
    #[serde(default = "defaults::export::base_url")]
    #[educe(Default = defaults::export::base_url())]
    pub base_url: String,

    /// Site title written to the generator config.
    pub title: String,
}
