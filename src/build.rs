//! Site building orchestration.
//!
//! Infers every collection, then writes the export project.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── collect_sources() ──► every file under [build.source]
//!     │
//!     ├── infer_collections()
//!     │       │
//!     │       └── per collection: select ──► parse (parallel) ──► fold
//!     │
//!     └── export_site()
//!             │
//!             ├── engine config, layouts, content items
//!             └── non-HTML files ──► <output>/<static dir>/
//! ```

use crate::{
    collection::{self, CollectionResponse, SourceFile},
    config::SiteConfig,
    export::{ExportEngine, FileExport, engine_for},
    log,
    logger::{ProgressBars, report_warnings},
    parser::ParseOptions,
};
use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use std::{
    fs,
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};
use walkdir::WalkDir;

/// Files skipped during source discovery
const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Infer all collections and export the project.
///
/// If `config.build.clean` is true, clears the entire output directory first.
pub fn build_site(config: &SiteConfig) -> Result<()> {
    let sources = collect_sources(&config.build.source);
    log!("collect"; "found {} files", sources.len());

    let results = infer_collections(config, &sources, None)?;
    for (key, response) in &results {
        report_warnings(key, &response.diagnostics);
    }

    export_site(config, &results, &sources)?;
    log!("build"; "done");

    Ok(())
}

/// Collect all files under `dir`, sorted by pathname.
///
/// The first file of a collection anchors its layout, so the order has to be
/// stable across runs and platforms.
pub fn collect_sources(dir: &Path) -> Vec<SourceFile> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .filter_map(|e| {
            let relative = e.path().strip_prefix(dir).ok()?;
            let pathname = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            Some(SourceFile {
                pathname,
                path: e.into_path(),
            })
        })
        .collect()
}

/// Fold every configured collection (or only `only`) over `sources`.
pub fn infer_collections(
    config: &SiteConfig,
    sources: &[SourceFile],
    only: Option<&str>,
) -> Result<Vec<(String, CollectionResponse)>> {
    let options = ParseOptions {
        trim_whitespace: config.build.trim_whitespace,
    };
    let mut results = Vec::new();

    for (key, collection) in config.collections() {
        if only.is_some_and(|only| only != key) {
            continue;
        }

        let files = collection::select(&collection, sources);
        let selector = collection.content_selector()?;
        log!("parse"; "{}: {} html files", key, files.len());

        let documents = {
            let progress = ProgressBars::new_filtered(&[(key.as_str(), files.len())]);
            collection::read_documents(&files, &options, selector.as_ref(), || {
                if let Some(progress) = &progress {
                    progress.inc_by_name(&key);
                }
            })?
        };

        let response = collection::build(&key, &documents)?;
        log!(
            "layout";
            "{}: {} pages, {} placeholders",
            key,
            response.pages.len(),
            response.layout.references().len()
        );
        results.push((key, response));
    }

    Ok(results)
}

/// Write the export project for `results` into `[build.output]`.
pub fn export_site(
    config: &SiteConfig,
    results: &[(String, CollectionResponse)],
    sources: &[SourceFile],
) -> Result<()> {
    let output = &config.build.output;
    let engine = engine_for(&config.export);

    prepare_output(output, config.build.clean)?;

    let files = render_files(engine.as_ref(), config, results)?;
    log!("export"; "writing {} files", files.len());
    files
        .par_iter()
        .try_for_each(|file| write_export(output, file))?;

    let static_files: Vec<_> = sources.iter().filter(|file| !file.is_html()).collect();
    copy_static(&static_files, &output.join(engine.static_directory()), config.build.clean)
}

/// Every generated file: engine config, one layout per collection, one item per page.
fn render_files(
    engine: &dyn ExportEngine,
    config: &SiteConfig,
    results: &[(String, CollectionResponse)],
) -> Result<Vec<FileExport>> {
    let mut files = vec![engine.engine_config(&config.export)?];
    for (key, response) in results {
        files.push(engine.export_layout(&response.layout, key));
        for page in &response.pages {
            files.push(engine.export_collection_item(page, key)?);
        }
    }
    Ok(files)
}

fn prepare_output(output: &Path, clean: bool) -> Result<()> {
    if clean && output.exists() {
        fs::remove_dir_all(output).with_context(|| {
            format!("Failed to clear output directory: {}", output.display())
        })?;
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory: {}", output.display()))
}

fn write_export(output: &Path, file: &FileExport) -> Result<()> {
    let path = output.join(&file.pathname);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, &file.contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// Copy non-HTML source files, skipping ones that are already up to date.
fn copy_static(files: &[&SourceFile], dest: &Path, clean: bool) -> Result<()> {
    let progress = ProgressBars::new_filtered(&[("static", files.len())]);
    let has_error = AtomicBool::new(false);

    files.par_iter().try_for_each(|file| {
        if has_error.load(Ordering::Relaxed) {
            return Err(anyhow!("Aborted"));
        }
        if let Err(e) = copy_file(&file.path, &dest.join(&file.pathname), clean) {
            if !has_error.swap(true, Ordering::Relaxed) {
                log!("error"; "{}: {:#}", file.path.display(), e);
            }
            return Err(anyhow!("Export failed"));
        }
        if let Some(progress) = &progress {
            progress.inc_by_name("static");
        }
        Ok(())
    })
}

fn copy_file(src: &Path, dst: &Path, clean: bool) -> Result<()> {
    if !clean && is_up_to_date(src, dst) {
        return Ok(());
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    Ok(())
}

/// Check if destination is at least as new as source.
fn is_up_to_date(src: &Path, dst: &Path) -> bool {
    let (Ok(src_meta), Ok(dst_meta)) = (src.metadata(), dst.metadata()) else {
        return false;
    };
    match (src_meta.modified(), dst_meta.modified()) {
        (Ok(src_time), Ok(dst_time)) => src_time <= dst_time,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use tempfile::TempDir;

    fn write(root: &Path, pathname: &str, contents: &str) {
        let path = root.join(pathname);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn config_for(root: &Path, toml: &str) -> SiteConfig {
        let root = root.to_str().unwrap();
        let cli: &'static Cli = Box::leak(Box::new(Cli::parse_from(["refold", "--root", root, "build"])));
        let mut config = SiteConfig::from_str(toml).unwrap();
        config.update_with_cli(cli);
        config
    }

    #[test]
    fn test_collect_sources_sorted_relative() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.html", "");
        write(dir.path(), "a/index.html", "");
        write(dir.path(), "a/.DS_Store", "");
        write(dir.path(), "style.css", "");

        let sources = collect_sources(dir.path());

        let names: Vec<_> = sources.iter().map(|s| s.pathname.as_str()).collect();
        assert_eq!(names, vec!["a/index.html", "b.html", "style.css"]);
        assert!(sources[0].path.ends_with("a/index.html"));
    }

    #[test]
    fn test_infer_requires_two_pages() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "site/index.html", "<p>only</p>");
        let config = config_for(dir.path(), "");

        let sources = collect_sources(&config.build.source);
        let err = infer_collections(&config, &sources, None).unwrap_err();

        assert!(format!("{err}").contains("at least 2"));
    }

    #[test]
    fn test_build_site_exports_hugo_project() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "site/index.html", "<html><body><h1>Home</h1><main><p>welcome</p></main></body></html>");
        write(dir.path(), "site/about.html", "<html><body><h1>About</h1><main><p>us</p></main></body></html>");
        write(dir.path(), "site/css/site.css", "body {}");
        let config = config_for(
            dir.path(),
            r#"
            [collections.pages]
            content = "main"
        "#,
        );

        build_site(&config).unwrap();

        let output = dir.path().join("hugo");
        let layout = fs::read_to_string(output.join("layouts/_default/pages.html")).unwrap();
        assert_eq!(
            layout,
            "<html><body><h1>{{ .Params.var1 }}</h1><main>{{ .Content }}</main></body></html>"
        );

        let about = fs::read_to_string(output.join("content/about.html")).unwrap();
        assert!(about.contains("layout = \"pages\""));
        assert!(about.contains("var1 = \"About\""));
        assert!(about.ends_with("<p>us</p>"));

        assert!(output.join("config.toml").exists());
        assert_eq!(fs::read_to_string(output.join("static/css/site.css")).unwrap(), "body {}");
    }

    #[test]
    fn test_clean_removes_stale_output() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "hugo/stale.txt", "old");

        prepare_output(&dir.path().join("hugo"), true).unwrap();

        assert!(dir.path().join("hugo").exists());
        assert!(!dir.path().join("hugo/stale.txt").exists());
    }

    #[test]
    fn test_is_up_to_date() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.css");
        let dst = dir.path().join("b.css");
        fs::write(&src, "a").unwrap();

        assert!(!is_up_to_date(&src, &dst));
        fs::copy(&src, &dst).unwrap();
        assert!(is_up_to_date(&src, &dst));
    }
}
