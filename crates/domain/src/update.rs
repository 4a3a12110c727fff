//! Update container — the per-gadget record of what changed since the last
//! broadcast.
//!
//! A [`UpdateContainer`] accumulates dirty bits as setters succeed. The
//! broadcaster drains it with [`UpdateContainer::take`], which returns the
//! accumulated [`ChangeSet`] and clears the container under a single lock
//! acquisition, so every bit is consumed by exactly one broadcast.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::id::GadgetId;
use crate::time::{Timestamp, now};

/// A mutable gadget property tracked by the container.
///
/// Composite attributes are one property: changing a single RGB channel marks
/// [`Property::Rgb`], and the whole triple is re-sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Status,
    Rgb,
    Speed,
    Source,
}

impl Property {
    /// Attribute keys serialized on the wire when this property is dirty.
    #[must_use]
    pub fn wire_fields(self) -> &'static [&'static str] {
        match self {
            Self::Status => &["status"],
            Self::Rgb => &["red", "green", "blue"],
            Self::Speed => &["speed"],
            Self::Source => &["source"],
        }
    }
}

/// One thing that can be marked dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Property(Property),
    Name,
    Host,
}

impl From<Property> for Change {
    fn from(property: Property) -> Self {
        Self::Property(property)
    }
}

/// The accumulated dirty bits of a gadget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    properties: BTreeSet<Property>,
    name_changed: bool,
    host_changed: bool,
    last_changed: Option<Timestamp>,
}

impl ChangeSet {
    /// `true` when no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && !self.name_changed && !self.host_changed
    }

    #[must_use]
    pub fn contains(&self, property: Property) -> bool {
        self.properties.contains(&property)
    }

    /// Dirty properties in a stable order.
    pub fn properties(&self) -> impl Iterator<Item = Property> + '_ {
        self.properties.iter().copied()
    }

    #[must_use]
    pub fn name_changed(&self) -> bool {
        self.name_changed
    }

    #[must_use]
    pub fn host_changed(&self) -> bool {
        self.host_changed
    }

    /// When the most recent bit was set.
    #[must_use]
    pub fn last_changed(&self) -> Option<Timestamp> {
        self.last_changed
    }

    fn insert(&mut self, change: Change, at: Timestamp) {
        match change {
            Change::Property(property) => {
                self.properties.insert(property);
            }
            Change::Name => self.name_changed = true,
            Change::Host => self.host_changed = true,
        }
        self.last_changed = Some(at);
    }
}

impl FromIterator<Change> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = Change>>(iter: I) -> Self {
        let at = now();
        let mut set = Self::default();
        for change in iter {
            set.insert(change, at);
        }
        set
    }
}

/// Thread-safe dirty-bit accumulator owned by one gadget.
#[derive(Debug)]
pub struct UpdateContainer {
    origin: GadgetId,
    pending: Mutex<ChangeSet>,
}

impl UpdateContainer {
    /// Create an empty container for the gadget `origin`.
    #[must_use]
    pub fn new(origin: GadgetId) -> Self {
        Self {
            origin,
            pending: Mutex::new(ChangeSet::default()),
        }
    }

    /// Id of the gadget this container belongs to.
    #[must_use]
    pub fn origin(&self) -> &GadgetId {
        &self.origin
    }

    /// Set the bit for `change` and refresh the last-changed timestamp.
    pub fn mark(&self, change: impl Into<Change>) {
        self.lock().insert(change.into(), now());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the pending bits, leaving them in place.
    #[must_use]
    pub fn snapshot(&self) -> ChangeSet {
        self.lock().clone()
    }

    /// Return the pending bits and clear them atomically.
    #[must_use]
    pub fn take(&self) -> ChangeSet {
        std::mem::take(&mut *self.lock())
    }

    /// Drop the pending bits without delivering them.
    pub fn reset(&self) {
        *self.lock() = ChangeSet::default();
    }

    fn lock(&self) -> MutexGuard<'_, ChangeSet> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
