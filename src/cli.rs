//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Infer a shared layout from rendered HTML and export it as a Hugo site
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Directory of rendered HTML (relative to project root)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file name (default: refold.toml)
    #[arg(short = 'C', long, default_value = "refold.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments of the build command
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Clean output directory completely before exporting
    #[arg(long)]
    pub clean: bool,

    /// Collapse whitespace in text nodes while parsing
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub trim_whitespace: Option<bool>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Infer every collection and export the project
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Print inferred layouts and page data as JSON
    Json {
        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,

        /// Only print this collection
        #[arg(long)]
        collection: Option<String>,
    },

    /// Diff two HTML files and print the result as JSON
    Diff {
        /// Anchor document
        anchor: PathBuf,

        /// Document compared against the anchor
        other: PathBuf,

        /// Page body selector (`tag`, `#id` or `.class`)
        #[arg(long)]
        content: Option<String>,

        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
    },
}

#[allow(unused)]
impl Cli {
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
    pub const fn is_json(&self) -> bool {
        matches!(self.command, Commands::Json { .. })
    }
    pub const fn is_diff(&self) -> bool {
        matches!(self.command, Commands::Diff { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build() {
        let cli = Cli::parse_from(["refold", "-s", "public", "build", "--clean"]);

        assert!(cli.is_build());
        assert_eq!(cli.source, Some(PathBuf::from("public")));
        assert_eq!(cli.config, PathBuf::from("refold.toml"));
        let Commands::Build { build_args } = cli.command else {
            panic!("expected build");
        };
        assert!(build_args.clean);
        assert_eq!(build_args.trim_whitespace, None);
    }

    #[test]
    fn test_parse_trim_whitespace_flag() {
        let cli = Cli::parse_from(["refold", "build", "--trim-whitespace", "false"]);
        let Commands::Build { build_args } = cli.command else {
            panic!("expected build");
        };
        assert_eq!(build_args.trim_whitespace, Some(false));
    }

    #[test]
    fn test_parse_json() {
        let cli = Cli::parse_from(["refold", "-C", "other.toml", "json", "--pretty", "--collection", "posts"]);

        assert!(cli.is_json());
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(matches!(
            cli.command,
            Commands::Json { pretty: true, collection: Some(ref key) } if key == "posts"
        ));
    }

    #[test]
    fn test_parse_diff() {
        let cli = Cli::parse_from(["refold", "diff", "a.html", "b.html", "--content", "main"]);

        assert!(cli.is_diff());
        let Commands::Diff {
            anchor,
            other,
            content,
            pretty,
        } = cli.command
        else {
            panic!("expected diff");
        };
        assert_eq!(anchor, PathBuf::from("a.html"));
        assert_eq!(other, PathBuf::from("b.html"));
        assert_eq!(content.as_deref(), Some("main"));
        assert!(!pretty);
    }
}
