use anyhow::Result;

use handbook_core::search::{extract_keywords, search};

use crate::config::Config;
use crate::handbook::load_handbook;

/// CLI entry point for `handbook search`.
pub fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    let keywords = extract_keywords(query);
    if keywords.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let kb = load_handbook(config)?;
    let limit = limit.unwrap_or(config.retrieval.search_limit);
    let hits = search(&kb, query, limit, config.retrieval.min_score);

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!("keywords: {}", keywords.join(", "));
    println!();
    for (i, hit) in hits.iter().enumerate() {
        println!("{}. [{:.3}] {}", i + 1, hit.score, hit.section);
        println!("    {}", hit.content);
        println!();
    }

    Ok(())
}
