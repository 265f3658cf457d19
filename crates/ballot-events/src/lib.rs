//! Event bus abstraction for ballot selection notifications.
//!
//! A [`SelectionEvent`] is published once per newly created selection, keyed
//! by the decision it belongs to. Watchers of a decision subscribe to that
//! key. The in-memory implementation lives in `ballot-events-memory`.

use std::pin::Pin;

use async_trait::async_trait;
use ballot_storage::{DecisionId, Selection};
use futures::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An item just became a favourite of its decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionEvent {
    pub selection_id: String,
    pub decision_id: String,
    pub item_id: String,
    pub approvals: u32,
    pub total_members: u32,
    /// Present for threshold rules.
    pub ratio: Option<f64>,
    /// Unix timestamp (seconds) of `selected_at`.
    pub timestamp: i64,
}

impl From<&Selection> for SelectionEvent {
    fn from(selection: &Selection) -> Self {
        Self {
            selection_id: selection.id.0.to_string(),
            decision_id: selection.decision_id.0.to_string(),
            item_id: selection.item_id.0.to_string(),
            approvals: selection.snapshot.approvals,
            total_members: selection.snapshot.total_members,
            ratio: selection.snapshot.ratio,
            timestamp: selection.selected_at.timestamp(),
        }
    }
}

/// Error type for event bus operations
#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("backend error: {0}")]
    Backend(String),
}

/// Stream of selection events
pub type EventStream = Pin<Box<dyn Stream<Item = SelectionEvent> + Send>>;

#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a selection event to all watchers of this decision.
    async fn publish(
        &self,
        decision_id: &DecisionId,
        event: SelectionEvent,
    ) -> Result<(), EventBusError>;

    /// Subscribe to selection events for a decision.
    ///
    /// Only events published after the call are delivered.
    async fn subscribe(&self, decision_id: &DecisionId) -> Result<EventStream, EventBusError>;
}
