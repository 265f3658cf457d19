//! In-memory event bus using tokio broadcast channels.
//!
//! Events only reach subscribers in the same process.

use std::sync::Arc;

use async_trait::async_trait;
use ballot_events::{EventBus, EventBusError, EventStream, SelectionEvent};
use ballot_storage::DecisionId;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

const CHANNEL_CAPACITY: usize = 100;

/// One broadcast channel per decision. Created by the first subscriber and
/// dropped by the first publish that finds no subscribers left.
#[derive(Clone)]
pub struct MemoryEventBus {
    channels: Arc<DashMap<DecisionId, broadcast::Sender<SelectionEvent>>>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
        }
    }

    fn subscribe_channel(&self, decision_id: &DecisionId) -> broadcast::Receiver<SelectionEvent> {
        self.channels
            .entry(decision_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Number of live subscribers for a decision.
    pub fn subscriber_count(&self, decision_id: &DecisionId) -> usize {
        self.channels
            .get(decision_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(
        &self,
        decision_id: &DecisionId,
        event: SelectionEvent,
    ) -> Result<(), EventBusError> {
        // No receivers is not an error.
        if let Some(tx) = self.channels.get(decision_id) {
            let _ = tx.send(event);
        }

        // Subscribing goes through the same shard lock, so a new subscriber
        // cannot slip in between the count and the removal.
        self.channels
            .remove_if(decision_id, |_, tx| tx.receiver_count() == 0);

        Ok(())
    }

    async fn subscribe(&self, decision_id: &DecisionId) -> Result<EventStream, EventBusError> {
        let rx = self.subscribe_channel(decision_id);

        // Lagged receivers skip what they missed; list_favourites is the resync path.
        let stream = BroadcastStream::new(rx).filter_map(|result| result.ok());

        Ok(Box::pin(stream))
    }
}
