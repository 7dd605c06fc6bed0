//! End-to-end pipeline tests for the ingestion orchestrator
//!
//! Covers the observable pipeline properties: idempotent re-ingestion
//! with stable keys, partial failure isolation, decode-failure atomicity,
//! auto-fix warning accounting, preview capping, and the progress event
//! sequence.

use ctrk_api::db::components::count_components;
use ctrk_api::ingest::{IngestError, IngestOrchestrator, UploadFormat};
use ctrk_common::db::{init, memory_pool};
use ctrk_common::events::{EventBus, TrackerEvent, UploadStatus};
use sqlx::SqlitePool;

async fn setup() -> (SqlitePool, EventBus, IngestOrchestrator) {
    let pool = memory_pool().await.expect("in-memory pool");
    init::init_schema(&pool).await.expect("schema");
    let bus = EventBus::new(64);
    let orchestrator = IngestOrchestrator::new(pool.clone(), bus.clone(), 100);
    (pool, bus, orchestrator)
}

#[tokio::test]
async fn test_csv_ingest_creates_components() {
    let (pool, _bus, orchestrator) = setup().await;

    let csv = "componentId,name,tower,owner,type,status,complexity\n\
               AUTH-001,Auth Service,Security,Security Team,API,deployed,complex\n\
               EHR-002,Records API,Healthcare,EHR Team,API,in progress,medium\n";

    let summary = orchestrator
        .ingest(csv.as_bytes(), UploadFormat::Csv, "components.csv", "j.smith")
        .await
        .expect("ingest should succeed");

    assert!(summary.success);
    assert_eq!(summary.created, 2);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.total_errors, 0);
    assert_eq!(count_components(&pool).await.unwrap(), 2);
}

#[tokio::test]
async fn test_reingest_with_stable_keys_updates_in_place() {
    let (pool, _bus, orchestrator) = setup().await;

    let csv = "componentId,name,tower,owner,type\n\
               A-1,First,General,Team A,Service\n\
               B-2,Second,General,Team B,Service\n\
               C-3,Third,General,Team C,Service\n";

    let first = orchestrator
        .ingest(csv.as_bytes(), UploadFormat::Csv, "batch.csv", "j.smith")
        .await
        .unwrap();
    assert_eq!((first.created, first.updated), (3, 0));

    let second = orchestrator
        .ingest(csv.as_bytes(), UploadFormat::Csv, "batch.csv", "j.smith")
        .await
        .unwrap();
    assert_eq!((second.created, second.updated), (0, 3));

    assert_eq!(count_components(&pool).await.unwrap(), 3);
}

#[tokio::test]
async fn test_reingest_without_keys_always_creates() {
    let (pool, _bus, orchestrator) = setup().await;

    let csv = "name,tower,owner,type\nWidget,General,Team A,Service\n";

    orchestrator
        .ingest(csv.as_bytes(), UploadFormat::Csv, "keyless.csv", "j.smith")
        .await
        .unwrap();
    let second = orchestrator
        .ingest(csv.as_bytes(), UploadFormat::Csv, "keyless.csv", "j.smith")
        .await
        .unwrap();

    assert_eq!(second.created, 1);
    assert_eq!(second.updated, 0);
    assert_eq!(count_components(&pool).await.unwrap(), 2);
}

#[tokio::test]
async fn test_autofix_warnings_do_not_block_rows() {
    let (pool, _bus, orchestrator) = setup().await;

    // Row 1: no name. Row 2: unrecognized complexity. Row 3: fully valid.
    let csv = "name,tower,owner,type,status,complexity\n\
               ,Security,Sec Team,API,planned,low\n\
               Billing,Finance,Fin Team,Batch,planned,invalid\n\
               Portal,Frontend,UI Team,Web,deployed,high\n";

    let summary = orchestrator
        .ingest(csv.as_bytes(), UploadFormat::Csv, "messy.csv", "j.smith")
        .await
        .unwrap();

    assert!(summary.success);
    assert_eq!(summary.created, 3, "every row survives auto-fix");
    assert_eq!(summary.total_errors, 2, "one warning per defaulted field");
    assert!(summary.errors[0].starts_with("Row 1:"));
    assert!(summary.errors[1].contains("invalid"));
    assert_eq!(count_components(&pool).await.unwrap(), 3);
}

#[tokio::test]
async fn test_invalid_json_leaves_store_untouched() {
    let (pool, _bus, orchestrator) = setup().await;

    let result = orchestrator
        .ingest(b"{not valid json", UploadFormat::Json, "bad.json", "j.smith")
        .await;

    assert!(matches!(result, Err(IngestError::Decode(_))));
    assert_eq!(count_components(&pool).await.unwrap(), 0);
    assert_eq!(
        ctrk_api::db::upload_log::count_uploads(&pool).await.unwrap(),
        0,
        "a fatal decode leaves no audit row either"
    );
}

#[tokio::test]
async fn test_partial_failure_isolation_end_to_end() {
    let pool = memory_pool().await.unwrap();
    init::init_schema(&pool).await.unwrap();
    let bus = EventBus::new(64);
    let batch_size = 5;
    let orchestrator = IngestOrchestrator::new(pool.clone(), bus, batch_size);

    // batch_size + 1 rows; the second carries a key the schema rejects
    let mut rows = Vec::new();
    for i in 0..=batch_size {
        let key = if i == 1 {
            "X".repeat(150)
        } else {
            format!("OK-{}", i)
        };
        rows.push(serde_json::json!({
            "componentId": key,
            "name": format!("Component {}", i),
            "tower": "General",
            "owner": "Team",
            "type": "Service",
        }));
    }
    let payload = serde_json::to_vec(&rows).unwrap();

    let summary = orchestrator
        .ingest(&payload, UploadFormat::Json, "mixed.json", "j.smith")
        .await
        .unwrap();

    assert_eq!(summary.created, batch_size, "valid rows are not dropped");
    assert_eq!(summary.total_errors, 1);
    assert!(summary.errors[0].starts_with("Row 2:"));
    assert_eq!(count_components(&pool).await.unwrap(), batch_size as i64);
}

#[tokio::test]
async fn test_json_wrapped_payload_and_upload_log() {
    let (pool, _bus, orchestrator) = setup().await;

    let payload = serde_json::json!({
        "components": [
            {"componentId": "N-1", "name": "Notifier", "tower": "Communication",
             "owner": "Comms", "type": "Service", "status": "done"},
        ]
    });

    let summary = orchestrator
        .ingest(
            &serde_json::to_vec(&payload).unwrap(),
            UploadFormat::Json,
            "wrapped.json",
            "uploader-7",
        )
        .await
        .unwrap();

    assert_eq!(summary.created, 1);

    let uploads = ctrk_api::db::upload_log::recent_uploads(&pool, 1)
        .await
        .unwrap();
    assert_eq!(uploads[0], ("wrapped.json".to_string(), "uploader-7".to_string()));
}

#[tokio::test]
async fn test_preview_caps_and_persists_nothing() {
    let (pool, _bus, orchestrator) = setup().await;

    let mut csv = String::from("componentId,name,tower,owner,type\n");
    for i in 0..120 {
        csv.push_str(&format!("P-{i},Component {i},General,Team,Service\n"));
    }

    let preview = orchestrator
        .preview(csv.as_bytes(), UploadFormat::Csv, "big.csv")
        .expect("preview should succeed");

    assert!(preview.success);
    assert_eq!(preview.total_rows, 120);
    assert_eq!(preview.preview_rows, 100);
    assert_eq!(preview.preview_data.len(), 100);
    assert_eq!(
        count_components(&pool).await.unwrap(),
        0,
        "preview never writes"
    );
}

#[tokio::test]
async fn test_progress_event_sequence() {
    let (_pool, bus, orchestrator) = setup().await;
    let mut rx = bus.subscribe();

    let csv = "componentId,name,tower,owner,type\nA-1,Auth,Security,Sec,API\n";
    orchestrator
        .ingest(csv.as_bytes(), UploadFormat::Csv, "events.csv", "j.smith")
        .await
        .unwrap();

    let mut progress = Vec::new();
    let mut component_updates = 0;
    let mut completed = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            TrackerEvent::UploadProgress {
                progress: pct,
                status,
                ..
            } => progress.push((pct, status)),
            TrackerEvent::ComponentUpdate { .. } => component_updates += 1,
            TrackerEvent::UploadCompleted { created, .. } => {
                completed = true;
                assert_eq!(created, 1);
            }
        }
    }

    assert_eq!(
        progress,
        vec![
            (0, UploadStatus::Processing),
            (50, UploadStatus::Processing),
            (100, UploadStatus::Completed),
        ]
    );
    assert_eq!(component_updates, 1);
    assert!(completed);
}

#[tokio::test]
async fn test_decode_failure_emits_error_status() {
    let (_pool, bus, orchestrator) = setup().await;
    let mut rx = bus.subscribe();

    let _ = orchestrator
        .ingest(b"\xff\xfe broken", UploadFormat::Csv, "broken.csv", "j.smith")
        .await;

    let mut saw_error = false;
    while let Ok(event) = rx.try_recv() {
        if let TrackerEvent::UploadProgress { status, .. } = event {
            if status == UploadStatus::Error {
                saw_error = true;
            }
        }
    }
    assert!(saw_error, "decode failure should broadcast an error status");
}
