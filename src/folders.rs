use anyhow::Result;

use crate::stats::format_ts_relative;
use crate::store::Store;

/// Print every registered scan root with its last scan time and whether the
/// directory is still there.
pub async fn list_folders(store: &Store) -> Result<()> {
    let folders = store.folders().await?;
    if folders.is_empty() {
        println!("No folders registered. Run `memex scan <folder>` first.");
        return Ok(());
    }

    println!("{:<56} {:<16} PRESENT", "FOLDER", "LAST SCAN");
    for folder in &folders {
        let present = std::path::Path::new(&folder.path).is_dir();
        println!(
            "{:<56} {:<16} {}",
            folder.path,
            format_ts_relative(folder.timestamp),
            present
        );
    }
    Ok(())
}
