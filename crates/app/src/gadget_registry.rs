//! Gadget registry — single owner of every gadget and the one place gadget
//! updates are published from.
//!
//! Gadgets added here are attached to the registry as their
//! [`UpdateSink`]: whenever a setter changes something, the gadget flushes
//! its pending bits and the registry fans them out to every
//! [`GadgetSubscriber`]. Fan-out copies the subscriber list under its lock,
//! releases the lock, then calls each subscriber, so a slow or re-entrant
//! subscriber never blocks subscription changes.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};

use gadgethub_domain::error::{AlreadyExistsError, HubError, NotFoundError};
use gadgethub_domain::gadget::{Gadget, UpdateSink};
use gadgethub_domain::id::{ClientId, GadgetId};
use gadgethub_domain::update::ChangeSet;

use crate::ports::{GadgetSubscriber, GadgetUpdate};

type Subscribers = Vec<Arc<dyn GadgetSubscriber>>;

/// Thread-safe map of gadget id to gadget, plus the subscriber list.
pub struct GadgetRegistry {
    me: Weak<GadgetRegistry>,
    gadgets: RwLock<BTreeMap<GadgetId, Arc<Gadget>>>,
    subscribers: Mutex<Subscribers>,
}

impl GadgetRegistry {
    /// Create an empty registry.
    ///
    /// The registry is reference counted because gadgets hold a weak handle
    /// back to it.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            gadgets: RwLock::new(BTreeMap::new()),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Register a gadget and start publishing its updates.
    ///
    /// Changes made to the gadget before registration are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::AlreadyExists`] when the id is taken; the registry
    /// is left unchanged.
    pub fn add(&self, gadget: Gadget) -> Result<Arc<Gadget>, HubError> {
        let mut gadgets = self.write();
        if gadgets.contains_key(gadget.id()) {
            return Err(AlreadyExistsError {
                kind: "Gadget",
                id: gadget.id().to_string(),
            }
            .into());
        }
        let gadget = Arc::new(gadget);
        let sink: Weak<dyn UpdateSink> = self.me.clone();
        gadget.attach(sink);
        gadgets.insert(gadget.id().clone(), Arc::clone(&gadget));
        tracing::debug!(gadget = %gadget.id(), class = %gadget.class(), "gadget registered");
        Ok(gadget)
    }

    /// The gadget registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when no such gadget exists.
    pub fn get(&self, id: &str) -> Result<Arc<Gadget>, HubError> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Every gadget, ordered by id.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<Gadget>> {
        self.read().values().cloned().collect()
    }

    /// Remote gadgets hosted on `client`.
    #[must_use]
    pub fn hosted_by(&self, client: &ClientId) -> Vec<Arc<Gadget>> {
        self.read()
            .values()
            .filter(|gadget| gadget.host().as_ref() == Some(client))
            .cloned()
            .collect()
    }

    /// Unregister a gadget; it stops publishing.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when no such gadget exists.
    pub fn remove(&self, id: &str) -> Result<Arc<Gadget>, HubError> {
        let removed = self.write().remove(id).ok_or_else(|| not_found(id))?;
        removed.detach();
        tracing::debug!(gadget = %removed.id(), "gadget removed");
        Ok(removed)
    }

    /// Unregister every gadget hosted on `client`.
    pub fn remove_hosted_by(&self, client: &ClientId) -> Vec<Arc<Gadget>> {
        let removed: Vec<Arc<Gadget>> = {
            let mut gadgets = self.write();
            let ids: Vec<GadgetId> = gadgets
                .values()
                .filter(|gadget| gadget.host().as_ref() == Some(client))
                .map(|gadget| gadget.id().clone())
                .collect();
            ids.iter().filter_map(|id| gadgets.remove(id)).collect()
        };
        for gadget in &removed {
            gadget.detach();
        }
        removed
    }

    /// Add a subscriber. Returns `false` if it was already subscribed.
    pub fn subscribe(&self, subscriber: Arc<dyn GadgetSubscriber>) -> bool {
        let mut subscribers = self.lock_subscribers();
        if subscribers.iter().any(|known| same(known, &subscriber)) {
            return false;
        }
        tracing::debug!(subscriber = subscriber.name(), "subscriber added");
        subscribers.push(subscriber);
        true
    }

    /// Remove a subscriber. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, subscriber: &Arc<dyn GadgetSubscriber>) -> bool {
        let mut subscribers = self.lock_subscribers();
        let before = subscribers.len();
        subscribers.retain(|known| !same(known, subscriber));
        before != subscribers.len()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    /// Deliver an update to every subscriber, in subscription order.
    ///
    /// A subscriber that returns an error or panics is logged and skipped.
    /// Returns how many subscribers handled the update successfully.
    pub fn publish(&self, gadget: &Gadget, changes: &ChangeSet) -> usize {
        let subscribers = self.lock_subscribers().clone();
        let update = GadgetUpdate { gadget, changes };
        let mut delivered = 0;
        for subscriber in &subscribers {
            match panic::catch_unwind(AssertUnwindSafe(|| subscriber.receive_update(&update))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => tracing::error!(
                    subscriber = subscriber.name(),
                    gadget = %gadget.id(),
                    error = %err,
                    "subscriber failed to handle gadget update"
                ),
                Err(_) => tracing::error!(
                    subscriber = subscriber.name(),
                    gadget = %gadget.id(),
                    "subscriber panicked while handling gadget update"
                ),
            }
        }
        delivered
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<GadgetId, Arc<Gadget>>> {
        self.gadgets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<GadgetId, Arc<Gadget>>> {
        self.gadgets.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl UpdateSink for GadgetRegistry {
    fn deliver(&self, gadget: &Gadget, changes: ChangeSet) {
        self.publish(gadget, &changes);
    }
}

fn same(a: &Arc<dyn GadgetSubscriber>, b: &Arc<dyn GadgetSubscriber>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn not_found(id: &str) -> HubError {
    NotFoundError {
        kind: "Gadget",
        id: id.to_string(),
    }
    .into()
}
