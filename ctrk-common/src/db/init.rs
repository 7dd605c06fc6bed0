//! Schema creation for the tracker database
//!
//! Tables are created with `CREATE TABLE IF NOT EXISTS` at startup; no
//! external migration tool is involved. Tests call the per-table helpers
//! directly against in-memory databases.

use crate::Result;
use sqlx::SqlitePool;

/// Create all tracker tables
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;
    create_components_table(pool).await?;
    create_upload_log_table(pool).await?;
    tracing::info!("Database schema initialized (components, upload_log)");
    Ok(())
}

/// Create the components table
///
/// `external_key` is the business identifier used for create-vs-update
/// decisions during ingestion. The length CHECK bounds what uploaded
/// source files may supply as a key; the validator never rewrites keys,
/// so an oversized key surfaces as a per-record reconciliation failure.
pub async fn create_components_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS components (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            external_key TEXT NOT NULL UNIQUE
                CHECK(length(external_key) BETWEEN 1 AND 100),
            label TEXT NOT NULL,
            version TEXT NOT NULL DEFAULT '1.0.0',
            description TEXT NOT NULL DEFAULT '',
            tower TEXT NOT NULL,
            app_group TEXT NOT NULL,
            component_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Planned',
            complexity TEXT NOT NULL DEFAULT 'Medium',
            change_type TEXT NOT NULL DEFAULT 'New',
            release_month INTEGER NOT NULL,
            release_year INTEGER NOT NULL,
            release_date TEXT,
            last_updated TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_components_tower ON components(tower)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_components_status ON components(status)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_components_release ON components(release_year, release_month)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the upload_log table
///
/// One row per committed ingestion run; this is the persisted artifact
/// of a batch result, used for audit and troubleshooting.
pub async fn create_upload_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS upload_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            filename TEXT NOT NULL,
            actor TEXT NOT NULL,
            payload_bytes INTEGER NOT NULL,
            total_rows INTEGER NOT NULL,
            created_count INTEGER NOT NULL,
            updated_count INTEGER NOT NULL,
            failed_count INTEGER NOT NULL,
            warning_count INTEGER NOT NULL,
            uploaded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let pool = memory_pool().await.expect("in-memory pool");
        init_schema(&pool).await.expect("first init");
        init_schema(&pool).await.expect("second init");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM components")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_external_key_length_check() {
        let pool = memory_pool().await.expect("in-memory pool");
        init_schema(&pool).await.unwrap();

        let oversized = "K".repeat(101);
        let result = sqlx::query(
            r#"
            INSERT INTO components
                (external_key, label, tower, app_group, component_type,
                 release_month, release_year, last_updated, created_at)
            VALUES (?, 'X', 'General', 'Default Team', 'Service', 1, 2024,
                    '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')
            "#,
        )
        .bind(&oversized)
        .execute(&pool)
        .await;

        assert!(result.is_err(), "oversized key must violate the CHECK");
    }
}
