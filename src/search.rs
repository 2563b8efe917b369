//! The `agk search` command.

use anyhow::{Context, Result};

use agri_knowledge_core::models::SearchResult;

use crate::knowledge::KnowledgeBase;

const EXCERPT_CHARS: usize = 240;

pub async fn run_search(kb: &KnowledgeBase, query: &str, k: Option<usize>, json: bool) -> Result<()> {
    let retriever = kb.retriever().await?;
    let k = k.unwrap_or(retriever.default_k());
    let results = retriever
        .try_search(query, k)
        .await
        .context("Search failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        print_result(i + 1, result);
    }
    Ok(())
}

fn print_result(rank: usize, result: &SearchResult) {
    println!(
        "{}. [{:.4}] {} / {}",
        rank, result.relevance_score, result.category, result.title
    );
    println!("    source: {}", result.source);
    if !result.url.is_empty() {
        println!("    url: {}", result.url);
    }
    println!("    excerpt: \"{}\"", excerpt(&result.content));
    println!();
}

fn excerpt(content: &str) -> String {
    let mut out: String = content.chars().take(EXCERPT_CHARS).collect();
    if content.chars().count() > EXCERPT_CHARS {
        out.push_str("...");
    }
    out
}
