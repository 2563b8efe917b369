//! The `agk index` command: load articles and run them through the indexer.

use anyhow::{bail, Result};
use std::path::PathBuf;

use agri_knowledge_core::chunk::Chunker;
use agri_knowledge_core::indexer;

use crate::knowledge::KnowledgeBase;
use crate::loader;

pub async fn run_index(
    kb: &KnowledgeBase,
    path: Option<PathBuf>,
    dry_run: bool,
    batch_size: Option<usize>,
) -> Result<()> {
    if batch_size == Some(0) {
        bail!("--batch-size must be > 0");
    }

    let config = kb.config();
    let batch_size = batch_size.unwrap_or(config.indexing.batch_size);
    let path = path.unwrap_or_else(|| config.data.path.clone());
    let articles = loader::load_articles(&path, &config.data.include_globs)?;

    if dry_run {
        let chunker = Chunker::new(config.chunking.to_chunk_config()?);
        let plan = indexer::plan(&chunker, &articles);
        println!("index {} (dry-run)", path.display());
        println!("  articles: {}", articles.len());
        println!("  skipped (empty): {}", plan.articles_skipped);
        println!("  chunks: {}", plan.chunks.len());
        println!("  duplicate ids: {}", plan.duplicate_ids);
        println!("  batches: {}", plan.chunks.len().div_ceil(batch_size));
        return Ok(());
    }

    let indexer = kb.indexer_with_batch_size(batch_size).await?;
    let report = indexer.index(&articles).await?;
    let store = kb.store().await;

    println!("index {}", path.display());
    println!("  articles: {}", report.articles);
    println!("  skipped (empty): {}", report.articles_skipped);
    println!("  chunks: {}", report.chunks);
    println!("  duplicate ids: {}", report.duplicate_ids);
    println!(
        "  batches: {} (failed: {})",
        report.batches, report.failed_batches
    );
    println!("  records written: {}", report.records_written);
    println!(
        "  store: {}{}",
        store.backend(),
        if store.is_persistent() { "" } else { " (not persistent)" }
    );
    println!("  total records: {}", store.count().await?);
    if report.failed_batches > 0 {
        println!("partial");
    } else {
        println!("ok");
    }
    Ok(())
}
