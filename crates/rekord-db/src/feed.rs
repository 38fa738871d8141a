//! Per-entity change feeds over flume channels.

use parking_lot::Mutex;
use rekord_core::RecordId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A staged change to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Inserted(RecordId),
    Updated(RecordId),
    Deleted(RecordId),
}

impl ChangeEvent {
    /// The record the change applies to.
    pub fn record(&self) -> RecordId {
        match self {
            ChangeEvent::Inserted(id) | ChangeEvent::Updated(id) | ChangeEvent::Deleted(id) => *id,
        }
    }
}

/// Identity of one feed registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedId(pub u64);

/// Receiving end of a feed registration.
///
/// Dropping the feed disconnects its channel; the hub prunes it on the
/// next publish.
#[derive(Debug)]
pub struct ChangeFeed {
    id: FeedId,
    entity: String,
    receiver: flume::Receiver<ChangeEvent>,
}

impl ChangeFeed {
    /// Registration id, for unsubscribing.
    pub fn id(&self) -> FeedId {
        self.id
    }

    /// Entity this feed watches.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Block until the next event, or `None` once the hub drops the feed.
    pub fn recv(&self) -> Option<ChangeEvent> {
        self.receiver.recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Take every event already queued, without blocking.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.receiver.try_iter().collect()
    }
}

/// Fan-out of staged changes to registered feeds.
#[derive(Debug, Default)]
pub struct ChangeHub {
    next_id: AtomicU64,
    feeds: Mutex<HashMap<FeedId, (String, flume::Sender<ChangeEvent>)>>,
}

impl ChangeHub {
    /// Create a hub with no feeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feed for one entity.
    pub fn subscribe(&self, entity: &str) -> ChangeFeed {
        let id = FeedId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = flume::unbounded();
        self.feeds.lock().insert(id, (entity.to_string(), sender));
        ChangeFeed {
            id,
            entity: entity.to_string(),
            receiver,
        }
    }

    /// Drop a registration. Its feed sees a disconnect.
    pub fn unsubscribe(&self, id: FeedId) {
        self.feeds.lock().remove(&id);
    }

    /// Send an event to every feed watching `entity`.
    pub fn publish(&self, entity: &str, event: ChangeEvent) {
        self.feeds
            .lock()
            .retain(|_, (watched, sender)| watched != entity || sender.send(event).is_ok());
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.feeds.lock().len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.feeds.lock().is_empty()
    }
}
