//! Schema setup.
//!
//! The full-text index `image_fts` is an FTS5 external-content table over
//! `image`. Three triggers keep it in lockstep with the row data, so every
//! insert, update and delete on `image` touches the index inside the same
//! transaction. Application code never writes to `image_fts` directly.
//!
//! `path` is stored in the index but not tokenized: searches match on
//! `content` and `comment` only.

use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS image (
            id INTEGER PRIMARY KEY,
            path TEXT UNIQUE NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            comment TEXT NOT NULL DEFAULT '',
            timestamp INTEGER NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS folder (
            id INTEGER PRIMARY KEY,
            path TEXT UNIQUE NOT NULL,
            timestamp INTEGER NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_image_timestamp ON image(timestamp DESC)")
        .execute(&mut *tx)
        .await?;

    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='image_fts'",
    )
    .fetch_one(&mut *tx)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE image_fts USING fts5(
                path UNINDEXED,
                content,
                comment,
                content='image',
                content_rowid='id'
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        // Index rows written before the index existed (no-op on a fresh db).
        sqlx::query("INSERT INTO image_fts(image_fts) VALUES('rebuild')")
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS tr_image_fts_insert AFTER INSERT ON image
        BEGIN
            INSERT INTO image_fts (rowid, path, content, comment)
            VALUES (new.id, new.path, new.content, new.comment);
        END
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS tr_image_fts_delete AFTER DELETE ON image
        BEGIN
            INSERT INTO image_fts (image_fts, rowid, path, content, comment)
            VALUES ('delete', old.id, old.path, old.content, old.comment);
        END
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS tr_image_fts_update AFTER UPDATE ON image
        BEGIN
            INSERT INTO image_fts (image_fts, rowid, path, content, comment)
            VALUES ('delete', old.id, old.path, old.content, old.comment);
            INSERT INTO image_fts (rowid, path, content, comment)
            VALUES (new.id, new.path, new.content, new.comment);
        END
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
