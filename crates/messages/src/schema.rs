//! Messages table schema and additive migration.
//!
//! Runs at every startup. The base table is created if missing; columns
//! added in later releases are applied with a check-then-add step so the
//! whole routine is idempotent and safe against tables created by any
//! earlier schema version.

use sqlx::{Row, SqlitePool};

use crate::error::Result;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT    NOT NULL,
            body       TEXT    NOT NULL,
            kind       TEXT    NOT NULL,
            created_at INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    // Columns added after the initial release. Order matters only for
    // readability; each add is independent and re-runnable.
    ensure_column(pool, "messages", "sender", "TEXT").await?;
    ensure_column(pool, "messages", "correlation_id", "INTEGER").await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_messages_session_created
         ON messages (session_id, created_at)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_messages_correlation
         ON messages (correlation_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_kind ON messages (kind)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Add `column` to `table` unless it already exists.
async fn ensure_column(pool: &SqlitePool, table: &str, column: &str, ty: &str) -> Result<()> {
    if column_exists(pool, table, column).await? {
        return Ok(());
    }
    tracing::info!(table, column, "adding missing column");
    sqlx::query(&format!("ALTER TABLE {table} ADD COLUMN {column} {ty}"))
        .execute(pool)
        .await?;
    Ok(())
}

async fn column_exists(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let rows = sqlx::query(&format!("PRAGMA table_info({table})"))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().any(|row| {
        row.try_get::<String, _>("name")
            .map(|name| name == column)
            .unwrap_or(false)
    }))
}
