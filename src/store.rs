//! The storage engine: documents, folders and the full-text index.
//!
//! [`Store`] is a cheap, clonable handle over a SQLite connection pool. Each
//! task that talks to the database (scanner roots, the result sink, the CLI)
//! checks out its own pooled connection; SQLite serializes the commits.
//!
//! Index consistency is enforced by the triggers installed in
//! [`migrate`](crate::migrate): every statement below that changes `image`
//! updates `image_fts` in the same transaction, so [`Store::search`] never
//! observes a row without its index entry or the reverse.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::db;
use crate::error::InitError;
use crate::migrate;
use crate::models::{Document, Folder, StoreStats, SweepReport};

#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

fn row_to_document(row: &SqliteRow) -> Document {
    Document {
        id: row.get("id"),
        path: row.get("path"),
        content: row.get("content"),
        comment: row.get("comment"),
        timestamp: row.get("timestamp"),
    }
}

fn row_to_folder(row: &SqliteRow) -> Folder {
    Folder {
        id: row.get("id"),
        path: row.get("path"),
        timestamp: row.get("timestamp"),
    }
}

impl Store {
    /// Open (creating if needed) the database named by `config` and make
    /// sure the schema is in place. The only fatal error in the system.
    pub async fn open(config: &Config) -> Result<Self, InitError> {
        Self::open_path(&config.db_path(), config.db.max_connections).await
    }

    pub async fn open_path(path: &Path, max_connections: u32) -> Result<Self, InitError> {
        let pool = db::connect(path, max_connections).await?;
        migrate::run_migrations(&pool).await?;
        tracing::debug!(db = %path.display(), "store opened");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Insert or update the document for `path`.
    ///
    /// A `None` comment leaves an existing annotation untouched (new rows get
    /// an empty one); `Some` replaces it. Content and timestamp always
    /// replace the stored values.
    pub async fn upsert(
        &self,
        path: &str,
        content: &str,
        comment: Option<&str>,
        timestamp: i64,
    ) -> Result<Document> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO image (path, content, comment, timestamp)
            VALUES (?, ?, COALESCE(?, ''), ?)
            ON CONFLICT(path) DO UPDATE SET
                content = excluded.content,
                comment = COALESCE(?, image.comment),
                timestamp = excluded.timestamp
            RETURNING id, path, content, comment, timestamp
            "#,
        )
        .bind(path)
        .bind(content)
        .bind(comment)
        .bind(timestamp)
        .bind(comment)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row_to_document(&row))
    }

    /// Full-text search over content and comment, newest first.
    ///
    /// `query` is passed to FTS5 unchanged, so its boolean, phrase and
    /// prefix syntax is available. A blank query matches nothing.
    pub async fn search(&self, query: &str) -> Result<Vec<Document>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT i.id, i.path, i.content, i.comment, i.timestamp
            FROM image_fts
            JOIN image i ON i.id = image_fts.rowid
            WHERE image_fts MATCH ?
            ORDER BY i.timestamp DESC, i.id DESC
            "#,
        )
        .bind(query)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_document).collect())
    }

    /// Stored timestamp for `path`, or `None` if it was never indexed.
    pub async fn timestamp_of(&self, path: &str) -> Result<Option<i64>> {
        let ts: Option<i64> = sqlx::query_scalar("SELECT timestamp FROM image WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ts)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, path, content, comment, timestamp FROM image WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_document))
    }

    pub async fn get_by_path(&self, path: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, path, content, comment, timestamp FROM image WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_document))
    }

    /// Replace the annotation of document `id`. `None` if no such document.
    pub async fn set_comment(&self, id: i64, comment: &str) -> Result<Option<Document>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            r#"
            UPDATE image SET comment = ? WHERE id = ?
            RETURNING id, path, content, comment, timestamp
            "#,
        )
        .bind(comment)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row.as_ref().map(row_to_document))
    }

    /// Remove document `id` and its index entry. Returns whether it existed.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM image WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn folder_upsert(&self, path: &str, timestamp: i64) -> Result<Folder> {
        let row = sqlx::query(
            r#"
            INSERT INTO folder (path, timestamp) VALUES (?, ?)
            ON CONFLICT(path) DO UPDATE SET timestamp = excluded.timestamp
            RETURNING id, path, timestamp
            "#,
        )
        .bind(path)
        .bind(timestamp)
        .fetch_one(&self.pool)
        .await?;
        Ok(row_to_folder(&row))
    }

    /// Paths of every registered scan root, sorted.
    pub async fn folder_list(&self) -> Result<Vec<PathBuf>> {
        let paths: Vec<String> = sqlx::query_scalar("SELECT path FROM folder ORDER BY path")
            .fetch_all(&self.pool)
            .await?;
        Ok(paths.into_iter().map(PathBuf::from).collect())
    }

    pub async fn folders(&self) -> Result<Vec<Folder>> {
        let rows = sqlx::query("SELECT id, path, timestamp FROM folder ORDER BY path")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_folder).collect())
    }

    /// Every `(id, path)` pair, for the maintenance sweep.
    pub async fn document_paths(&self) -> Result<Vec<(i64, String)>> {
        let rows = sqlx::query("SELECT id, path FROM image ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| (r.get("id"), r.get("path"))).collect())
    }

    /// Delete every document whose file is confirmed gone from disk.
    ///
    /// A path whose existence cannot be determined (e.g. permission denied
    /// on a parent directory) is kept.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        for (id, path) in self.document_paths().await? {
            report.checked += 1;
            match tokio::fs::try_exists(&path).await {
                Ok(true) => {}
                Ok(false) => {
                    if self.delete(id).await? {
                        tracing::info!(%path, id, "removed missing file from index");
                        report.removed += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(%path, error = %e, "cannot check file, keeping it");
                }
            }
        }

        Ok(report)
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM image) AS documents,
                (SELECT COUNT(*) FROM image WHERE content <> '') AS with_text,
                (SELECT COUNT(*) FROM image WHERE comment <> '') AS with_comment,
                (SELECT COUNT(*) FROM folder) AS folders
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            documents: row.get("documents"),
            with_text: row.get("with_text"),
            with_comment: row.get("with_comment"),
            folders: row.get("folders"),
        })
    }

    /// Verify `image_fts` against `image` using FTS5's own integrity check.
    pub async fn check_index(&self) -> Result<()> {
        sqlx::query("INSERT INTO image_fts(image_fts, rank) VALUES('integrity-check', 1)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
