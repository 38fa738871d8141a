//! Live query results over a store's change feed.

use crate::feed::ChangeFeed;
use crate::fetch::FetchRequest;
use crate::store::PersistentStore;
use rekord_core::Record;
use std::sync::Arc;
use tracing::{debug, error};

/// A query kept fresh by change events on its entity
///
/// The subscription stays bound to the store it was created on, even if
/// the context later swaps stores. Cancelling (or dropping) releases the
/// feed registration.
pub struct Subscription {
    store: Arc<dyn PersistentStore>,
    feed: Option<ChangeFeed>,
    request: FetchRequest,
}

impl Subscription {
    pub(crate) fn new(store: Arc<dyn PersistentStore>, feed: ChangeFeed, request: FetchRequest) -> Self {
        debug!(entity = %request.entity, "Subscribed");
        Self {
            store,
            feed: Some(feed),
            request,
        }
    }

    /// The request this subscription re-runs
    pub fn request(&self) -> &FetchRequest {
        &self.request
    }

    /// Run the query now
    ///
    /// A store failure is logged and yields an empty list.
    pub fn current(&self) -> Vec<Record> {
        match self.store.execute(&self.request) {
            Ok(records) => records,
            Err(err) => {
                error!(entity = %self.request.entity, error = %err, "Subscription fetch failed");
                Vec::new()
            }
        }
    }

    /// Fresh results if any change arrived since the last look
    pub fn try_next(&self) -> Option<Vec<Record>> {
        let feed = self.feed.as_ref()?;
        if feed.drain().is_empty() {
            None
        } else {
            Some(self.current())
        }
    }

    /// Current results, then new results after every change
    ///
    /// Blocks between changes. Events that queue up while a snapshot is
    /// being built are folded into the next one. Each call starts over with
    /// the current results. The iterator ends once the subscription is
    /// cancelled.
    pub fn snapshots(&self) -> Snapshots<'_> {
        Snapshots {
            subscription: self,
            started: false,
        }
    }

    /// Whether the feed registration is still held
    pub fn is_active(&self) -> bool {
        self.feed.is_some()
    }

    /// Release the feed registration
    pub fn cancel(&mut self) {
        if let Some(feed) = self.feed.take() {
            self.store.unsubscribe(feed.id());
            debug!(entity = %self.request.entity, "Unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Iterator returned by [`Subscription::snapshots`]
pub struct Snapshots<'a> {
    subscription: &'a Subscription,
    started: bool,
}

impl Iterator for Snapshots<'_> {
    type Item = Vec<Record>;

    fn next(&mut self) -> Option<Vec<Record>> {
        if !self.started {
            self.started = true;
            return Some(self.subscription.current());
        }
        let feed = self.subscription.feed.as_ref()?;
        feed.recv()?;
        feed.drain();
        Some(self.subscription.current())
    }
}
