//! `memex search`: print matching images, newest first.

use anyhow::Result;

use crate::models::Document;
use crate::stats::format_ts_iso;
use crate::store::Store;

/// Characters of OCR text shown per result.
const EXCERPT_CHARS: usize = 160;

pub async fn run_search(store: &Store, query: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let mut results = store.search(query).await?;
    if let Some(limit) = limit {
        results.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, doc) in results.iter().enumerate() {
        print_result(i + 1, doc);
    }
    Ok(())
}

fn print_result(rank: usize, doc: &Document) {
    println!("{}. {}", rank, doc.path);
    println!("    modified: {}", format_ts_iso(doc.modified_secs()));
    if !doc.comment.is_empty() {
        println!("    comment: {}", doc.comment);
    }
    println!("    excerpt: \"{}\"", excerpt(&doc.content, EXCERPT_CHARS));
    println!("    id: {}", doc.id);
    println!();
}

/// First `max_chars` characters of `text` on one line.
fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}
