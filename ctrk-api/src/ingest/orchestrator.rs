//! End-to-end ingestion orchestration
//!
//! Drives one uploaded payload through decode → extract → validate →
//! reconcile and assembles the result summary. Progress and per-record
//! change events go to the event bus best-effort; a client that is not
//! listening costs nothing and a full bus never aborts ingestion.

use super::decode::{decode_payload, DecodeError, UploadFormat};
use super::reconcile::{reconcile, BatchResult, RecordOutcome};
use super::types::CanonicalComponentRecord;
use super::validate::validate_and_fix;
use crate::db::upload_log::{record_upload, UploadLogEntry};
use chrono::Utc;
use ctrk_common::events::{ComponentAction, EventBus, TrackerEvent, UploadStatus};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;

/// Preview responses cap at this many records
pub const PREVIEW_LIMIT: usize = 100;

/// Pipeline stage, for logging and progress mapping
///
/// `Failed` is reachable only from `Decoding`: every later stage absorbs
/// its problems as warnings or per-record failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Decoding,
    Extracting,
    Validating,
    Reconciling,
    Completed,
    Failed,
}

/// Errors that abort an ingestion call
#[derive(Debug, Error)]
pub enum IngestError {
    /// Payload unparseable as its declared format; nothing was persisted
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Store-level failure outside any record's scope (no connection,
    /// poisoned pool)
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Commit result returned to the upload caller
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    pub success: bool,
    pub created: usize,
    pub updated: usize,
    /// Row-indexed warning and failure messages, input order
    pub errors: Vec<String>,
    pub total_errors: usize,
}

/// Preview result: the pipeline through validation, nothing persisted
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSummary {
    pub success: bool,
    pub preview_data: Vec<CanonicalComponentRecord>,
    pub total_rows: usize,
    pub preview_rows: usize,
}

/// One validated row paired with its position in the source file
struct ValidatedRow {
    row: usize,
    record: CanonicalComponentRecord,
    warnings: Vec<String>,
}

/// Drives the ingestion pipeline for one service instance
#[derive(Clone)]
pub struct IngestOrchestrator {
    db: SqlitePool,
    event_bus: EventBus,
    batch_size: usize,
}

impl IngestOrchestrator {
    pub fn new(db: SqlitePool, event_bus: EventBus, batch_size: usize) -> Self {
        Self {
            db,
            event_bus,
            batch_size,
        }
    }

    /// Ingest one uploaded payload and commit the surviving records
    ///
    /// Always returns a structured summary unless decoding itself fails;
    /// a batch that fails row-by-row still yields `success: true` with
    /// zero counts and a populated error list.
    pub async fn ingest(
        &self,
        payload: &[u8],
        format: UploadFormat,
        filename: &str,
        actor: &str,
    ) -> Result<CommitSummary, IngestError> {
        tracing::info!(
            filename = %filename,
            actor = %actor,
            format = %format,
            bytes = payload.len(),
            "Ingestion started"
        );
        self.emit_progress(filename, 0, UploadStatus::Processing);

        let rows = match self.decode_and_validate(payload, format) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "Ingestion failed during decode");
                self.emit_progress(filename, 0, UploadStatus::Error);
                return Err(e.into());
            }
        };

        self.emit_progress(filename, 50, UploadStatus::Processing);

        tracing::debug!(stage = ?IngestStage::Reconciling, rows = rows.len(), "Reconciling batch");
        let records: Vec<CanonicalComponentRecord> =
            rows.iter().map(|r| r.record.clone()).collect();
        let batch = reconcile(&self.db, &records, self.batch_size).await?;

        self.broadcast_outcomes(&rows, &batch);

        let summary = assemble_summary(&rows, &batch);
        let warning_count = rows.iter().map(|r| r.warnings.len()).sum();

        if let Err(e) = record_upload(
            &self.db,
            &UploadLogEntry {
                filename: filename.to_string(),
                actor: actor.to_string(),
                payload_bytes: payload.len(),
                total_rows: batch.total_rows,
                created_count: batch.created,
                updated_count: batch.updated,
                failed_count: batch.failures().len(),
                warning_count,
            },
        )
        .await
        {
            // Audit trail only; the committed batch stands
            tracing::warn!(filename = %filename, error = %e, "Failed to write upload log entry");
        }

        self.emit_progress(filename, 100, UploadStatus::Completed);
        self.event_bus.emit_lossy(TrackerEvent::UploadCompleted {
            filename: filename.to_string(),
            created: batch.created,
            updated: batch.updated,
            failed: batch.failures().len(),
            total_rows: batch.total_rows,
            timestamp: Utc::now(),
        });

        tracing::info!(
            filename = %filename,
            created = batch.created,
            updated = batch.updated,
            failed = batch.failures().len(),
            stage = ?IngestStage::Completed,
            "Ingestion completed"
        );

        Ok(summary)
    }

    /// Run the pipeline through validation only, for human review
    ///
    /// Capped at the first [`PREVIEW_LIMIT`] records; the store is never
    /// touched.
    pub fn preview(
        &self,
        payload: &[u8],
        format: UploadFormat,
        filename: &str,
    ) -> Result<PreviewSummary, DecodeError> {
        self.emit_progress(filename, 50, UploadStatus::Processing);

        let rows = match self.decode_and_validate(payload, format) {
            Ok(rows) => rows,
            Err(e) => {
                self.emit_progress(filename, 0, UploadStatus::Error);
                return Err(e);
            }
        };

        self.emit_progress(filename, 100, UploadStatus::Completed);

        let total_rows = rows.len();
        let preview_data: Vec<CanonicalComponentRecord> = rows
            .into_iter()
            .take(PREVIEW_LIMIT)
            .map(|r| r.record)
            .collect();

        Ok(PreviewSummary {
            success: true,
            preview_rows: preview_data.len(),
            total_rows,
            preview_data,
        })
    }

    /// Decode the payload and validate every non-blank row
    fn decode_and_validate(
        &self,
        payload: &[u8],
        format: UploadFormat,
    ) -> Result<Vec<ValidatedRow>, DecodeError> {
        tracing::debug!(stage = ?IngestStage::Decoding, "Decoding payload");
        let raw_records = decode_payload(payload, format)?;

        tracing::debug!(
            stage = ?IngestStage::Extracting,
            rows = raw_records.len(),
            "Extracting and validating rows"
        );

        let rows = raw_records
            .iter()
            .enumerate()
            .filter(|(_, record)| !record.is_blank())
            .map(|(idx, record)| {
                let row = idx + 1;
                let (record, warnings) = validate_and_fix(record, row);
                ValidatedRow {
                    row,
                    record,
                    warnings,
                }
            })
            .collect();

        Ok(rows)
    }

    /// Report successful outcomes to connected clients
    fn broadcast_outcomes(&self, rows: &[ValidatedRow], batch: &BatchResult) {
        for (validated, outcome) in rows.iter().zip(&batch.outcomes) {
            let action = match outcome {
                RecordOutcome::Created { .. } => ComponentAction::Created,
                RecordOutcome::Updated { .. } => ComponentAction::Updated,
                RecordOutcome::Failed { .. } => continue,
            };
            self.event_bus.emit_lossy(TrackerEvent::ComponentUpdate {
                action,
                external_key: outcome.external_key().to_string(),
                label: validated.record.label.clone(),
                timestamp: Utc::now(),
            });
        }
    }

    fn emit_progress(&self, filename: &str, progress: u8, status: UploadStatus) {
        self.event_bus.emit_lossy(TrackerEvent::UploadProgress {
            filename: filename.to_string(),
            progress,
            status,
            timestamp: Utc::now(),
        });
    }
}

/// Merge validation warnings and reconciliation failures into the
/// row-indexed message list of the commit shape
fn assemble_summary(rows: &[ValidatedRow], batch: &BatchResult) -> CommitSummary {
    let mut errors = Vec::new();

    for (validated, outcome) in rows.iter().zip(&batch.outcomes) {
        for warning in &validated.warnings {
            errors.push(format!("Row {}: {}", validated.row, warning));
        }
        if let RecordOutcome::Failed { reason, .. } = outcome {
            errors.push(format!("Row {}: {}", validated.row, reason));
        }
    }

    CommitSummary {
        success: true,
        created: batch.created,
        updated: batch.updated,
        total_errors: errors.len(),
        errors,
    }
}
