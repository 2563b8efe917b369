//! Article loading from the collector's JSON output.
//!
//! A path is either a single JSON file holding an array of article
//! objects, or a directory walked for files matching `include_globs`.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use agri_knowledge_core::models::Article;

/// Load articles from a file or a directory of files.
///
/// Directory entries are read in sorted path order so repeated runs see
/// the same article sequence.
pub fn load_articles(path: &Path, include_globs: &[String]) -> Result<Vec<Article>> {
    if !path.exists() {
        bail!("Data path does not exist: {}", path.display());
    }

    let files = if path.is_dir() {
        find_files(path, include_globs)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut articles = Vec::new();
    for file in &files {
        let loaded = load_file(file)?;
        debug!(file = %file.display(), articles = loaded.len(), "loaded article file");
        articles.extend(loaded);
    }

    info!(files = files.len(), articles = articles.len(), "articles loaded");
    Ok(articles)
}

/// Parse one JSON file containing an array of article objects.
pub fn load_file(path: &Path) -> Result<Vec<Article>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read article file: {}", path.display()))?;
    parse_articles(&content).with_context(|| format!("Invalid article file: {}", path.display()))
}

/// Parse a JSON array of article objects. Missing fields take defaults.
pub fn parse_articles(json: &str) -> Result<Vec<Article>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        _ => bail!("expected a JSON array of articles"),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if !item.is_object() {
                bail!("article {} is not a JSON object", i);
            }
            Ok(serde_json::from_value(item)?)
        })
        .collect()
}

fn find_files(root: &Path, include_globs: &[String]) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(include_globs)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if include_set.is_match(relative) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}
