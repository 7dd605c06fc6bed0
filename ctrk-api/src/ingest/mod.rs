//! File-ingestion and record-reconciliation pipeline
//!
//! Accepts heterogeneous uploaded tabular/JSON data of unknown shape,
//! normalizes it into the canonical component schema, resolves records
//! against existing state by business key, and commits in bounded-size
//! transactions with partial-failure tolerance. The guiding policy is
//! "always produce something usable": after decoding succeeds, every row
//! yields either a stored record or an attributable per-row message,
//! never an aborted batch.

pub mod decode;
pub mod extract;
pub mod normalize;
pub mod orchestrator;
pub mod reconcile;
pub mod types;
pub mod validate;

pub use decode::{DecodeError, UploadFormat};
pub use orchestrator::{CommitSummary, IngestError, IngestOrchestrator, PreviewSummary};
pub use reconcile::{BatchResult, RecordOutcome, DEFAULT_BATCH_SIZE};
pub use types::{CanonicalComponentRecord, Complexity, RawRecord, Status};
