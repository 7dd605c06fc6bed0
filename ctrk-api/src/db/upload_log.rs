//! Upload audit log
//!
//! One row per committed ingestion run; the persisted form of a batch
//! result. Never read on the hot path, only for audit queries.

use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

/// Summary of one committed ingestion run
#[derive(Debug, Clone)]
pub struct UploadLogEntry {
    pub filename: String,
    pub actor: String,
    pub payload_bytes: usize,
    pub total_rows: usize,
    pub created_count: usize,
    pub updated_count: usize,
    pub failed_count: usize,
    pub warning_count: usize,
}

/// Append an entry to the upload log
pub async fn record_upload(pool: &SqlitePool, entry: &UploadLogEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO upload_log
            (filename, actor, payload_bytes, total_rows, created_count,
             updated_count, failed_count, warning_count, uploaded_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.filename)
    .bind(&entry.actor)
    .bind(entry.payload_bytes as i64)
    .bind(entry.total_rows as i64)
    .bind(entry.created_count as i64)
    .bind(entry.updated_count as i64)
    .bind(entry.failed_count as i64)
    .bind(entry.warning_count as i64)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Count logged uploads
pub async fn count_uploads(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM upload_log")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Most recent upload actors, newest first, for audit display
pub async fn recent_uploads(pool: &SqlitePool, limit: i64) -> Result<Vec<(String, String)>> {
    let rows = sqlx::query(
        "SELECT filename, actor FROM upload_log ORDER BY uploaded_at DESC, id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| (row.get("filename"), row.get("actor")))
        .collect())
}
