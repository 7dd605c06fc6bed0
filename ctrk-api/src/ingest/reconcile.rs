//! Batch reconciliation of canonical records against the store
//!
//! Records are applied in bounded-size chunks, one transaction per chunk.
//! The common all-valid case commits in a single round trip per chunk;
//! when a chunk fails, it is rolled back and each of its records is
//! retried in its own transaction so one bad row cannot discard an
//! otherwise-valid chunk. Outcomes are reported in input order.
//!
//! Rows without a business key get a generated one, which means
//! re-ingesting a file that carries no stable identifiers always creates
//! new rows; updates require the source data to supply its own keys.

use crate::db::components::{find_id_by_external_key, insert_record, update_record};
use crate::ingest::types::CanonicalComponentRecord;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Default records per transaction
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Per-record reconciliation outcome, in input order
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RecordOutcome {
    Created {
        external_key: String,
    },
    Updated {
        external_key: String,
    },
    Failed {
        external_key: String,
        reason: String,
    },
}

impl RecordOutcome {
    pub fn external_key(&self) -> &str {
        match self {
            RecordOutcome::Created { external_key }
            | RecordOutcome::Updated { external_key }
            | RecordOutcome::Failed { external_key, .. } => external_key,
        }
    }
}

/// Aggregate result of one reconciliation run
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub created: usize,
    pub updated: usize,
    /// One entry per input record, input order preserved
    pub outcomes: Vec<RecordOutcome>,
    pub total_rows: usize,
}

impl BatchResult {
    /// Failed rows as (0-based input index, reason) pairs
    pub fn failures(&self) -> Vec<(usize, &str)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(idx, outcome)| match outcome {
                RecordOutcome::Failed { reason, .. } => Some((idx, reason.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// Generate a business key for a record that arrived without one
///
/// Random-suffixed so repeated keyless ingestion runs never collide with
/// each other or with stored rows.
pub fn generate_external_key() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("COMP-{}", suffix[..8].to_uppercase())
}

/// Reconcile canonical records against the component store
///
/// `batch_size` bounds the per-transaction footprint; it must be > 0.
/// Only pool-level failures (no connection, poisoned database) surface as
/// an error; per-record problems become `Failed` outcomes.
pub async fn reconcile(
    pool: &SqlitePool,
    records: &[CanonicalComponentRecord],
    batch_size: usize,
) -> sqlx::Result<BatchResult> {
    // Keys are resolved up front so a chunk retry reuses the same
    // generated key and outcomes stay attributable.
    let keyed: Vec<(String, &CanonicalComponentRecord)> = records
        .iter()
        .map(|record| {
            let key = record
                .external_key
                .clone()
                .unwrap_or_else(generate_external_key);
            (key, record)
        })
        .collect();

    let mut outcomes: Vec<RecordOutcome> = Vec::with_capacity(keyed.len());

    for chunk in keyed.chunks(batch_size.max(1)) {
        match apply_chunk(pool, chunk).await {
            Ok(chunk_outcomes) => outcomes.extend(chunk_outcomes),
            Err(e) => {
                tracing::warn!(
                    chunk_len = chunk.len(),
                    error = %e,
                    "Chunk transaction failed, retrying records individually"
                );
                for (key, record) in chunk {
                    outcomes.push(apply_single(pool, key, record).await);
                }
            }
        }
    }

    let created = outcomes
        .iter()
        .filter(|o| matches!(o, RecordOutcome::Created { .. }))
        .count();
    let updated = outcomes
        .iter()
        .filter(|o| matches!(o, RecordOutcome::Updated { .. }))
        .count();

    Ok(BatchResult {
        created,
        updated,
        total_rows: records.len(),
        outcomes,
    })
}

/// Apply one chunk inside a single transaction
///
/// Any statement or commit failure aborts the whole chunk; the caller
/// falls back to per-record retry.
async fn apply_chunk(
    pool: &SqlitePool,
    chunk: &[(String, &CanonicalComponentRecord)],
) -> sqlx::Result<Vec<RecordOutcome>> {
    let mut tx = pool.begin().await?;
    let mut outcomes = Vec::with_capacity(chunk.len());

    for (key, record) in chunk {
        outcomes.push(apply_one(&mut tx, key, record).await?);
    }

    tx.commit().await?;
    Ok(outcomes)
}

/// Retry one record in its own transaction after a chunk failure
async fn apply_single(
    pool: &SqlitePool,
    key: &str,
    record: &CanonicalComponentRecord,
) -> RecordOutcome {
    let attempt = async {
        let mut tx = pool.begin().await?;
        let outcome = apply_one(&mut tx, key, record).await?;
        tx.commit().await?;
        sqlx::Result::Ok(outcome)
    };

    let result: sqlx::Result<RecordOutcome> = attempt.await;
    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(external_key = %key, error = %e, "Record failed isolated retry");
            RecordOutcome::Failed {
                external_key: key.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

/// Create-or-update one record on the given transaction
async fn apply_one(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    key: &str,
    record: &CanonicalComponentRecord,
) -> sqlx::Result<RecordOutcome> {
    let existing = find_id_by_external_key(&mut *tx, key).await?;

    match existing {
        Some(_) => {
            update_record(&mut *tx, key, record).await?;
            Ok(RecordOutcome::Updated {
                external_key: key.to_string(),
            })
        }
        None => {
            insert_record(&mut *tx, key, record).await?;
            Ok(RecordOutcome::Created {
                external_key: key.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{Complexity, Status};
    use ctrk_common::db::{init, memory_pool};

    fn keyed_record(key: &str, label: &str) -> CanonicalComponentRecord {
        CanonicalComponentRecord {
            external_key: Some(key.to_string()),
            label: label.to_string(),
            version: "1.0.0".to_string(),
            description: String::new(),
            tower: "General".to_string(),
            app_group: "Default Team".to_string(),
            component_type: "Service".to_string(),
            status: Status::Planned,
            complexity: Complexity::Medium,
            change_type: "New".to_string(),
            release_month: 1,
            release_year: 2024,
            release_date: None,
        }
    }

    fn keyless_record(label: &str) -> CanonicalComponentRecord {
        CanonicalComponentRecord {
            external_key: None,
            ..keyed_record("ignored", label)
        }
    }

    async fn test_pool() -> SqlitePool {
        let pool = memory_pool().await.unwrap();
        init::init_schema(&pool).await.unwrap();
        pool
    }

    #[test]
    fn test_generated_key_format() {
        let key = generate_external_key();
        assert!(key.starts_with("COMP-"));
        assert_eq!(key.len(), 13);
        assert_ne!(key, generate_external_key());
    }

    #[tokio::test]
    async fn test_create_then_update_by_stable_key() {
        let pool = test_pool().await;
        let records = vec![keyed_record("A-1", "First"), keyed_record("B-1", "Second")];

        let first = reconcile(&pool, &records, DEFAULT_BATCH_SIZE).await.unwrap();
        assert_eq!(first.created, 2);
        assert_eq!(first.updated, 0);

        let second = reconcile(&pool, &records, DEFAULT_BATCH_SIZE).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 2);
    }

    #[tokio::test]
    async fn test_keyless_records_always_create() {
        let pool = test_pool().await;
        let records = vec![keyless_record("Widget")];

        reconcile(&pool, &records, DEFAULT_BATCH_SIZE).await.unwrap();
        let result = reconcile(&pool, &records, DEFAULT_BATCH_SIZE).await.unwrap();
        assert_eq!(result.created, 1, "no stable key means no update match");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM components")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_duplicate_key_within_batch_updates_in_place() {
        let pool = test_pool().await;
        let records = vec![
            keyed_record("A-1", "Original"),
            keyed_record("A-1", "Revised"),
        ];

        let result = reconcile(&pool, &records, DEFAULT_BATCH_SIZE).await.unwrap();
        assert_eq!(result.created, 1);
        assert_eq!(result.updated, 1);

        let row: (String,) = sqlx::query_as("SELECT label FROM components WHERE external_key = 'A-1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.0, "Revised", "later row wins");
    }

    #[tokio::test]
    async fn test_chunking_covers_all_records() {
        let pool = test_pool().await;
        let records: Vec<_> = (0..7)
            .map(|i| keyed_record(&format!("K-{}", i), &format!("Component {}", i)))
            .collect();

        let result = reconcile(&pool, &records, 3).await.unwrap();
        assert_eq!(result.created, 7);
        assert_eq!(result.outcomes.len(), 7);
        // Input order preserved across chunk boundaries
        for (i, outcome) in result.outcomes.iter().enumerate() {
            assert_eq!(outcome.external_key(), format!("K-{}", i));
        }
    }

    #[tokio::test]
    async fn test_single_bad_record_does_not_sink_its_chunk() {
        let pool = test_pool().await;
        let batch_size = 4;

        // An oversized key violates the schema CHECK; the validator never
        // rewrites business keys, so this reaches the store as-is.
        let mut records: Vec<_> = (0..batch_size + 1)
            .map(|i| keyed_record(&format!("GOOD-{}", i), &format!("Component {}", i)))
            .collect();
        records[2] = keyed_record(&"L".repeat(150), "Oversized");

        let result = reconcile(&pool, &records, batch_size).await.unwrap();

        assert_eq!(result.created, batch_size, "all valid records survive");
        assert_eq!(result.updated, 0);
        let failures = result.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 2, "failure reported at its input index");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM components")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, batch_size as i64);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let pool = test_pool().await;
        let result = reconcile(&pool, &[], DEFAULT_BATCH_SIZE).await.unwrap();
        assert_eq!(result.created, 0);
        assert_eq!(result.updated, 0);
        assert_eq!(result.total_rows, 0);
        assert!(result.outcomes.is_empty());
    }
}
