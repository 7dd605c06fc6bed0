//! Event types for the CTRK event system
//!
//! Provides the shared event vocabulary and EventBus used to fan updates
//! out to connected SSE clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Lifecycle status carried on upload progress events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Payload is being decoded / validated / reconciled
    Processing,
    /// Ingestion finished (possibly with row-level errors)
    Completed,
    /// Payload could not be decoded at all
    Error,
}

/// What happened to a component record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentAction {
    Created,
    Updated,
    Deleted,
}

/// Tracker event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// All services use this central enum for type safety and exhaustive
/// matching; the wire `type` tags match the original dashboard protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerEvent {
    /// File upload progress notification
    ///
    /// Emitted best-effort during ingestion; progress is 0-100.
    UploadProgress {
        /// Name of the uploaded file
        filename: String,
        /// Percentage complete (0-100)
        progress: u8,
        /// Current lifecycle status
        status: UploadStatus,
        /// When the update was produced
        timestamp: DateTime<Utc>,
    },

    /// Component record changed (created/updated/deleted)
    ///
    /// Emitted once per successful reconciliation outcome and for
    /// interactive CRUD operations.
    ComponentUpdate {
        /// What happened to the record
        action: ComponentAction,
        /// Business key of the affected component
        external_key: String,
        /// Display name of the affected component
        label: String,
        /// When the change was committed
        timestamp: DateTime<Utc>,
    },

    /// Bulk ingestion finished
    UploadCompleted {
        /// Name of the uploaded file
        filename: String,
        /// Records inserted
        created: usize,
        /// Records overwritten in place
        updated: usize,
        /// Records that failed even an isolated retry
        failed: usize,
        /// Total non-blank input rows
        total_rows: usize,
        /// When ingestion finished
        timestamp: DateTime<Utc>,
    },
}

impl TrackerEvent {
    /// Wire name of the event, used as the SSE event type
    pub fn event_type(&self) -> &'static str {
        match self {
            TrackerEvent::UploadProgress { .. } => "upload_progress",
            TrackerEvent::ComponentUpdate { .. } => "component_update",
            TrackerEvent::UploadCompleted { .. } => "upload_completed",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TrackerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered before old events are
    /// dropped for lagging subscribers. 100 is plenty for a single-node
    /// deployment; tests use 10.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: TrackerEvent,
    ) -> Result<usize, broadcast::error::SendError<TrackerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Progress and change notifications are best-effort: it is acceptable
    /// if no client is currently connected.
    pub fn emit_lossy(&self, event: TrackerEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
