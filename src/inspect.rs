//! JSON views of the inference results, printed on stdout.

use crate::{
    build::{collect_sources, infer_collections},
    collection::CollectionResponse,
    config::SiteConfig,
    diagnostics::Diagnostics,
    document::{DiffResult, Document},
    layout::Layout,
    page::Page,
    parser::{ParseOptions, Selector},
};
use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::{collections::BTreeMap, fs, path::Path};

#[derive(Serialize)]
struct CollectionReport<'a> {
    #[serde(flatten)]
    response: &'a CollectionResponse,
    warnings: &'a Diagnostics,
}

#[derive(Serialize)]
struct DiffReport<'a> {
    layout: &'a Layout,
    pages: &'a [Page; 2],
    warnings: &'a Diagnostics,
}

/// Print `{ "<key>": { pages, layout, warnings } }` for the selected collections.
pub fn print_collections(config: &SiteConfig, only: Option<&str>, pretty: bool) -> Result<()> {
    let sources = collect_sources(&config.build.source);
    let results = infer_collections(config, &sources, only)?;

    let report: BTreeMap<&str, CollectionReport<'_>> = results
        .iter()
        .map(|(key, response)| {
            (
                key.as_str(),
                CollectionReport {
                    response,
                    warnings: &response.diagnostics,
                },
            )
        })
        .collect();

    print_json(&report, pretty)
}

/// Diff two files and print the layout, both pages and any warnings.
pub fn print_diff(
    config: &SiteConfig,
    anchor: &Path,
    other: &Path,
    content: Option<&str>,
    pretty: bool,
) -> Result<()> {
    let options = ParseOptions {
        trim_whitespace: config.build.trim_whitespace,
    };
    let selector = content
        .map(|content| content.parse::<Selector>().map_err(|err| anyhow!(err)))
        .transpose()?;

    let anchor = read_document(anchor, &options, selector.as_ref())?;
    let other = read_document(other, &options, selector.as_ref())?;
    let DiffResult {
        layout,
        pages,
        diagnostics,
        ..
    } = anchor.diff(&other);

    print_json(
        &DiffReport {
            layout: &layout,
            pages: &pages,
            warnings: &diagnostics,
        },
        pretty,
    )
}

fn read_document(path: &Path, options: &ParseOptions, selector: Option<&Selector>) -> Result<Document> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Document::parse(path.display().to_string(), &raw, options, selector)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}
