//! The `agk stats` command: what is indexed, where, and with which model.

use anyhow::Result;

use crate::knowledge::KnowledgeBase;

pub async fn run_stats(kb: &KnowledgeBase, json: bool) -> Result<()> {
    let stats = kb.stats().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let db_path = &kb.config().db.path;
    let db_size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    println!("Agri Knowledge: Stats");
    println!("=====================");
    println!();
    println!("  Collection:  {}", stats.collection_name);
    println!("  Chunks:      {}", stats.total_chunks);
    println!("  Model:       {}", stats.model_name);
    println!(
        "  Dimensions:  {}",
        stats
            .dimensions
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    if stats.persistent {
        println!("  Backend:     {} ({})", stats.backend, db_path.display());
        println!("  Size:        {}", format_bytes(db_size));
    } else {
        println!("  Backend:     {} (not persistent)", stats.backend);
    }
    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
