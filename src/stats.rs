//! Database statistics and health overview.
//!
//! Gives a quick summary of what's indexed: how many images, how many of
//! them produced text, how many carry a comment, and when each known folder
//! was last scanned. Used by `memex stats`.

use anyhow::Result;

use crate::config::Config;
use crate::models::Folder;
use crate::store::Store;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config, store: &Store) -> Result<()> {
    let stats = store.stats().await?;
    let folders = store.folders().await?;
    let index_ok = store.check_index().await;

    let db_path = config.db_path();
    let db_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    println!("Memex Database Stats");
    println!("====================");
    println!();
    println!("  Database:    {}", db_path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Images:      {}", stats.documents);
    println!(
        "  With text:   {} / {} ({}%)",
        stats.with_text,
        stats.documents,
        if stats.documents > 0 {
            (stats.with_text * 100) / stats.documents
        } else {
            0
        }
    );
    println!("  Commented:   {}", stats.with_comment);
    match index_ok {
        Ok(()) => println!("  Index:       ok"),
        Err(e) => println!("  Index:       INCONSISTENT ({})", e),
    }

    print_folders(&folders);
    println!();
    Ok(())
}

fn print_folders(folders: &[Folder]) {
    if folders.is_empty() {
        return;
    }
    println!();
    println!("  Folders:");
    println!("  {:<56}   {}", "PATH", "LAST SCAN");
    println!("  {}", "-".repeat(76));
    for folder in folders {
        println!(
            "  {:<56}   {}",
            folder.path,
            format_ts_relative(folder.timestamp)
        );
    }
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

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
pub fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

pub fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn relative_times() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_ts_relative(now), "just now");
        assert_eq!(format_ts_relative(now - 120), "2 mins ago");
        assert_eq!(format_ts_relative(now - 3600), "1 hour ago");
        assert_eq!(format_ts_relative(0), "1970-01-01 00:00");
    }
}
