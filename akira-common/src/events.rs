//! Event types for the AKIRA event system
//!
//! Provides shared event definitions and the EventBus used to fan retune
//! progress out to SSE clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Retune workflow state as carried in events
///
/// Mirrors `RetuneState` in akira-rt; duplicated here so events can be
/// serialized without a dependency on the service crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RetunePhase {
    Extracting,
    Analyzing,
    Classifying,
    Retuning,
    Muxing,
    Completed,
    Cancelled,
    Failed,
}

/// AKIRA event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AkiraEvent {
    /// Retune session started (upload accepted, pipeline spawned)
    RetuneSessionStarted {
        session_id: Uuid,
        source_file: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session transitioned between workflow phases
    RetuneStateChanged {
        session_id: Uuid,
        old_state: RetunePhase,
        new_state: RetunePhase,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Progress update within a phase
    RetuneProgressUpdate {
        session_id: Uuid,
        state: RetunePhase,
        current: usize,
        total: usize,
        percentage: f64,
        operation: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A segment was classified as overstimulating
    SegmentFlagged {
        session_id: Uuid,
        segment_index: usize,
        start_seconds: f32,
        end_seconds: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session completed; retuned output is available
    RetuneSessionCompleted {
        session_id: Uuid,
        flagged_segments: usize,
        total_segments: usize,
        duration_seconds: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session failed with a critical error
    RetuneSessionFailed {
        session_id: Uuid,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session cancelled by the user
    RetuneSessionCancelled {
        session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl AkiraEvent {
    /// Event type name used for the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            AkiraEvent::RetuneSessionStarted { .. } => "RetuneSessionStarted",
            AkiraEvent::RetuneStateChanged { .. } => "RetuneStateChanged",
            AkiraEvent::RetuneProgressUpdate { .. } => "RetuneProgressUpdate",
            AkiraEvent::SegmentFlagged { .. } => "SegmentFlagged",
            AkiraEvent::RetuneSessionCompleted { .. } => "RetuneSessionCompleted",
            AkiraEvent::RetuneSessionFailed { .. } => "RetuneSessionFailed",
            AkiraEvent::RetuneSessionCancelled { .. } => "RetuneSessionCancelled",
        }
    }
}

/// Broadcast event bus
///
/// Thin wrapper over `tokio::sync::broadcast`: multiple producers, multiple
/// consumers, bounded buffer with oldest-event eviction for slow receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AkiraEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<AkiraEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` if no subscriber is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: AkiraEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<AkiraEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the case where no subscribers are listening
    ///
    /// Progress events are advisory; it is fine for nobody to be watching.
    pub fn emit_lossy(&self, event: AkiraEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Event emitted with no subscribers");
        }
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
