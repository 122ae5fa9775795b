//! Project configuration management for `refold.toml`.
//!
//! # Sections
//!
//! | Section                | Purpose                                    |
//! |------------------------|--------------------------------------------|
//! | `[build]`              | Source/output paths, parsing options       |
//! | `[collections.<key>]`  | Page groups that share a layout            |
//! | `[export]`             | Target generator and its site settings     |
//!
//! # Example
//!
//! ```toml
//! [build]
//! source = "_site"
//! output = "hugo"
//!
//! [collections.posts]
//! sub_path = "posts/"
//! content = "article"
//!
//! [collections.pages]
//! only = ["index.html", "about.html"]
//!
//! [export]
//! base_url = "https://example.com/"
//! ```

mod build;
mod collection;
pub mod defaults;
mod error;
mod export;

pub use collection::CollectionConfig;
pub use error::ConfigError;
pub use export::{EngineKind, ExportConfig};

use build::BuildConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing refold.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// CLI arguments reference
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Collections by key, built in key order
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionConfig>,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Configured collections, or a single catch-all `pages` collection.
    pub fn collections(&self) -> Vec<(String, CollectionConfig)> {
        if self.collections.is_empty() {
            return vec![(defaults::collections::key(), CollectionConfig::default())];
        }
        self.collections
            .iter()
            .map(|(key, collection)| (key.clone(), collection.clone()))
            .collect()
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &'static Cli) {
        self.cli = Some(cli);

        let root = cli
            .root
            .as_ref()
            .cloned()
            .unwrap_or_else(|| self.get_root().to_owned());

        self.update_path_with_root(cli, &root);

        if let Commands::Build { build_args } = &cli.command {
            // `--clean` can only switch cleaning on
            self.build.clean |= build_args.clean;
            Self::update_option(&mut self.build.trim_whitespace, build_args.trim_whitespace.as_ref());
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Update all paths relative to root directory and normalize to absolute paths
    fn update_path_with_root(&mut self, cli: &Cli, root: &Path) {
        Self::update_option(&mut self.build.source, cli.source.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());

        let root = Self::normalize_path(root);
        self.set_root(&root);

        self.config_path = Self::normalize_path(&root.join(&cli.config));
        self.build.source = Self::normalize_path(&root.join(&self.build.source));
        self.build.output = Self::normalize_path(&root.join(&self.build.output));
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration for the current command
    pub fn validate(&self) -> Result<()> {
        let Some(cli) = self.cli else {
            return Ok(());
        };
        if matches!(cli.command, Commands::Diff { .. }) {
            return Ok(());
        }

        if !self.build.source.is_dir() {
            bail!(ConfigError::Validation(format!(
                "[build.source] `{}` is not a directory",
                self.build.source.display()
            )));
        }

        if self.build.output == self.build.source {
            bail!(ConfigError::Validation(
                "[build.output] must differ from [build.source]".into()
            ));
        }

        for (key, collection) in &self.collections {
            if let Err(err) = collection.content_selector() {
                bail!(ConfigError::Validation(format!("[collections.{key}.content] {err}")));
            }
        }

        if let Commands::Json {
            collection: Some(key),
            ..
        } = &cli.command
            && !self.collections().iter().any(|(k, _)| k == key)
        {
            bail!(ConfigError::Validation(format!("unknown collection `{key}`")));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
