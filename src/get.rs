//! Single-document commands: `memex get` and `memex comment`.

use anyhow::{bail, Result};

use crate::models::Document;
use crate::stats::format_ts_iso;
use crate::store::Store;

pub async fn run_get(store: &Store, id: i64) -> Result<()> {
    match store.get(id).await? {
        Some(doc) => {
            print_document(&doc);
            Ok(())
        }
        None => bail!("document not found: {}", id),
    }
}

pub async fn run_comment(store: &Store, id: i64, comment: &str) -> Result<()> {
    match store.set_comment(id, comment).await? {
        Some(doc) => {
            println!("comment updated: {}", doc.path);
            Ok(())
        }
        None => bail!("document not found: {}", id),
    }
}

fn print_document(doc: &Document) {
    println!("id:       {}", doc.id);
    println!("path:     {}", doc.path);
    println!("modified: {}", format_ts_iso(doc.modified_secs()));
    println!("comment:  {}", doc.comment);
    println!("---");
    println!("{}", doc.content);
}
