//! Gadget — a controllable or observable device capability exposed by the hub.
//!
//! A gadget is either **local** (driven directly by the hub) or **remote**
//! (hosted on a [`Client`](crate::client::Client)). Its attributes are a
//! [`GadgetKind`], a tagged variant over the concrete classes; what a gadget
//! can do is described by its class [`Capability`] set.
//!
//! Every mutation goes through a setter. Setters validate, apply and mark the
//! gadget's [`UpdateContainer`] inside one critical section, then flush the
//! accumulated changes to the attached [`UpdateSink`].

mod kind;

pub use kind::{Capability, FanSpeed, GadgetClass, GadgetKind, Rgb, SourceRef, SourceSelector};

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, Weak};

use crate::error::{DomainValueError, HubError, ValidationError};
use crate::id::{ClientId, GadgetId};
use crate::update::{Change, ChangeSet, UpdateContainer};

/// Who drives a gadget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    Local,
    Remote { host: ClientId },
}

impl Ownership {
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }

    #[must_use]
    pub fn host(&self) -> Option<&ClientId> {
        match self {
            Self::Local => None,
            Self::Remote { host } => Some(host),
        }
    }
}

/// A single requested attribute mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeChange {
    Name(String),
    Host(ClientId),
    Status(bool),
    Red(u8),
    Green(u8),
    Blue(u8),
    Rgb(Rgb),
    Speed(u16),
    Source(SourceRef),
}

/// Receives the changes flushed by a gadget after a successful setter.
///
/// Implementations must not mutate the gadget they are handed.
pub trait UpdateSink: Send + Sync {
    fn deliver(&self, gadget: &Gadget, changes: ChangeSet);
}

/// Consistent copy of a gadget's state taken under its lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GadgetSnapshot {
    pub id: GadgetId,
    pub name: String,
    pub ownership: Ownership,
    pub kind: GadgetKind,
}

impl GadgetSnapshot {
    #[must_use]
    pub fn class(&self) -> GadgetClass {
        self.kind.class()
    }

    /// Changes that bring a gadget of the same shape to this snapshot's name
    /// and attribute values. Ownership is not included.
    #[must_use]
    pub fn as_changes(&self) -> Vec<AttributeChange> {
        let mut changes = vec![AttributeChange::Name(self.name.clone())];
        match &self.kind {
            GadgetKind::Switch { status } => changes.push(AttributeChange::Status(*status)),
            GadgetKind::RgbLamp(rgb) => changes.push(AttributeChange::Rgb(*rgb)),
            GadgetKind::Fan(fan) => changes.push(AttributeChange::Speed(fan.speed())),
            GadgetKind::Television(selector) | GadgetKind::AvReceiver(selector) => {
                changes.push(AttributeChange::Status(selector.status()));
                changes.push(AttributeChange::Source(SourceRef::Index(selector.source())));
            }
        }
        changes
    }
}

#[derive(Debug, Clone)]
struct GadgetState {
    name: String,
    ownership: Ownership,
    kind: GadgetKind,
}

impl GadgetState {
    fn apply(&mut self, change: &AttributeChange) -> Result<(), DomainValueError> {
        match change {
            AttributeChange::Name(name) => self.name.clone_from(name),
            AttributeChange::Host(host) => match &mut self.ownership {
                Ownership::Remote { host: current } => current.clone_from(host),
                Ownership::Local => return Err(DomainValueError::NotRemote),
            },
            AttributeChange::Status(status) => self.kind.set_status(*status)?,
            AttributeChange::Red(value) => self.kind.rgb_mut("red")?.red = *value,
            AttributeChange::Green(value) => self.kind.rgb_mut("green")?.green = *value,
            AttributeChange::Blue(value) => self.kind.rgb_mut("blue")?.blue = *value,
            AttributeChange::Rgb(rgb) => *self.kind.rgb_mut("rgb")? = *rgb,
            AttributeChange::Speed(speed) => self.kind.set_speed(*speed)?,
            AttributeChange::Source(source) => self.kind.set_source(source)?,
        }
        Ok(())
    }

    fn diff(&self, other: &Self) -> Vec<Change> {
        let mut changes: Vec<Change> = self
            .kind
            .diff(&other.kind)
            .into_iter()
            .map(Change::from)
            .collect();
        if self.name != other.name {
            changes.push(Change::Name);
        }
        if self.ownership != other.ownership {
            changes.push(Change::Host);
        }
        changes
    }
}

/// A gadget registered with the hub.
#[derive(Debug)]
pub struct Gadget {
    id: GadgetId,
    class: GadgetClass,
    state: Mutex<GadgetState>,
    updates: UpdateContainer,
    sink: RwLock<Option<Weak<dyn UpdateSink>>>,
    publish_order: Mutex<()>,
}

impl Gadget {
    /// Create a builder for constructing a [`Gadget`].
    #[must_use]
    pub fn builder() -> GadgetBuilder {
        GadgetBuilder::default()
    }

    #[must_use]
    pub fn id(&self) -> &GadgetId {
        &self.id
    }

    #[must_use]
    pub fn class(&self) -> GadgetClass {
        self.class
    }

    #[must_use]
    pub fn capabilities(&self) -> &'static [Capability] {
        self.class.capabilities()
    }

    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        self.class.has(capability)
    }

    /// Consistent copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> GadgetSnapshot {
        let state = self.lock_state();
        GadgetSnapshot {
            id: self.id.clone(),
            name: state.name.clone(),
            ownership: state.ownership.clone(),
            kind: state.kind.clone(),
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.lock_state().name.clone()
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        self.lock_state().ownership.is_local()
    }

    /// Host client of a remote gadget.
    #[must_use]
    pub fn host(&self) -> Option<ClientId> {
        self.lock_state().ownership.host().cloned()
    }

    #[must_use]
    pub fn status(&self) -> Option<bool> {
        self.lock_state().kind.status()
    }

    #[must_use]
    pub fn rgb(&self) -> Option<Rgb> {
        self.lock_state().kind.rgb()
    }

    #[must_use]
    pub fn speed(&self) -> Option<u16> {
        self.lock_state().kind.fan().map(FanSpeed::speed)
    }

    #[must_use]
    pub fn source(&self) -> Option<usize> {
        self.lock_state().kind.selector().map(SourceSelector::source)
    }

    #[must_use]
    pub fn source_name(&self) -> Option<String> {
        self.lock_state()
            .kind
            .selector()
            .map(|selector| selector.source_name().to_string())
    }

    /// The gadget's update container.
    #[must_use]
    pub fn updates(&self) -> &UpdateContainer {
        &self.updates
    }

    /// Apply a batch of changes atomically.
    ///
    /// Every change is validated against a staged copy before anything is
    /// committed: either all changes apply or none do. Values equal to the
    /// current ones leave the container untouched. Returns whether anything
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns the first [`DomainValueError`] raised by any change; the gadget
    /// is left unmodified.
    pub fn apply(&self, changes: &[AttributeChange]) -> Result<bool, DomainValueError> {
        let changed = {
            let mut state = self.lock_state();
            let mut staged = state.clone();
            for change in changes {
                staged.apply(change)?;
            }
            let dirty = state.diff(&staged);
            if dirty.is_empty() {
                false
            } else {
                *state = staged;
                for change in dirty {
                    self.updates.mark(change);
                }
                true
            }
        };
        if changed {
            self.flush();
        }
        Ok(changed)
    }

    /// # Errors
    ///
    /// Never fails; kept fallible for symmetry with the other setters.
    pub fn set_name(&self, name: impl Into<String>) -> Result<bool, DomainValueError> {
        self.apply(&[AttributeChange::Name(name.into())])
    }

    /// Move a remote gadget to another host client.
    ///
    /// # Errors
    ///
    /// Returns [`DomainValueError::NotRemote`] for local gadgets.
    pub fn set_host(&self, host: ClientId) -> Result<bool, DomainValueError> {
        self.apply(&[AttributeChange::Host(host)])
    }

    /// # Errors
    ///
    /// Returns [`DomainValueError::Unsupported`] when the class has no status.
    pub fn set_status(&self, status: bool) -> Result<bool, DomainValueError> {
        self.apply(&[AttributeChange::Status(status)])
    }

    /// # Errors
    ///
    /// Returns [`DomainValueError::Unsupported`] when the class has no colour.
    pub fn set_red(&self, red: u8) -> Result<bool, DomainValueError> {
        self.apply(&[AttributeChange::Red(red)])
    }

    /// # Errors
    ///
    /// Returns [`DomainValueError::Unsupported`] when the class has no colour.
    pub fn set_green(&self, green: u8) -> Result<bool, DomainValueError> {
        self.apply(&[AttributeChange::Green(green)])
    }

    /// # Errors
    ///
    /// Returns [`DomainValueError::Unsupported`] when the class has no colour.
    pub fn set_blue(&self, blue: u8) -> Result<bool, DomainValueError> {
        self.apply(&[AttributeChange::Blue(blue)])
    }

    /// # Errors
    ///
    /// Returns [`DomainValueError::Unsupported`] when the class has no colour.
    pub fn set_rgb(&self, rgb: Rgb) -> Result<bool, DomainValueError> {
        self.apply(&[AttributeChange::Rgb(rgb)])
    }

    /// # Errors
    ///
    /// Returns [`DomainValueError::OutOfRange`] when `speed` exceeds the fan's
    /// steps, or [`DomainValueError::Unsupported`] for other classes.
    pub fn set_speed(&self, speed: u16) -> Result<bool, DomainValueError> {
        self.apply(&[AttributeChange::Speed(speed)])
    }

    /// Select a source by index or by name.
    ///
    /// # Errors
    ///
    /// Returns a source error when the name is unknown or the index out of
    /// range, or [`DomainValueError::Unsupported`] for classes without sources.
    pub fn set_source(&self, source: impl Into<SourceRef>) -> Result<bool, DomainValueError> {
        self.apply(&[AttributeChange::Source(source.into())])
    }

    /// Route future flushes to `sink`, discarding changes made while detached.
    pub fn attach(&self, sink: Weak<dyn UpdateSink>) {
        let _order = self.lock_publish_order();
        self.updates.reset();
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    /// Stop delivering changes.
    pub fn detach(&self) {
        let _order = self.lock_publish_order();
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Deliver pending changes to the attached sink.
    ///
    /// Holding the publish-order lock across take and delivery keeps
    /// deliveries for this gadget in the order their setters completed.
    /// Without a sink the changes stay pending.
    pub fn flush(&self) {
        let _order = self.lock_publish_order();
        let sink = self
            .sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade);
        let Some(sink) = sink else {
            return;
        };
        let changes = self.updates.take();
        if !changes.is_empty() {
            sink.deliver(self, changes);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, GadgetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_publish_order(&self) -> MutexGuard<'_, ()> {
        self.publish_order
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Step-by-step builder for [`Gadget`].
#[derive(Debug, Default)]
pub struct GadgetBuilder {
    id: Option<GadgetId>,
    name: Option<String>,
    host: Option<ClientId>,
    kind: Option<GadgetKind>,
}

impl GadgetBuilder {
    #[must_use]
    pub fn id(mut self, id: GadgetId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Make the gadget remote, hosted on `host`.
    #[must_use]
    pub fn host(mut self, host: ClientId) -> Self {
        self.host = Some(host);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: GadgetKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Consume the builder, validate, and return a [`Gadget`].
    ///
    /// The name defaults to the id.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if the id or the kind is missing.
    pub fn build(self) -> Result<Gadget, HubError> {
        let id = self.id.ok_or(ValidationError::EmptyId)?;
        let kind = self
            .kind
            .ok_or_else(|| ValidationError::MalformedPayload(format!("gadget '{id}' has no kind")))?;
        let ownership = match self.host {
            Some(host) => Ownership::Remote { host },
            None => Ownership::Local,
        };
        Ok(Gadget {
            class: kind.class(),
            updates: UpdateContainer::new(id.clone()),
            state: Mutex::new(GadgetState {
                name: self.name.unwrap_or_else(|| id.to_string()),
                ownership,
                kind,
            }),
            id,
            sink: RwLock::new(None),
            publish_order: Mutex::new(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::update::Property;

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<(GadgetId, ChangeSet)>>,
    }

    impl UpdateSink for RecordingSink {
        fn deliver(&self, gadget: &Gadget, changes: ChangeSet) {
            self.delivered
                .lock()
                .unwrap()
                .push((gadget.id().clone(), changes));
        }
    }

    fn lamp() -> Gadget {
        Gadget::builder()
            .id(GadgetId::new("lamp1").unwrap())
            .kind(GadgetKind::RgbLamp(Rgb::default()))
            .build()
            .unwrap()
    }

    fn tv() -> Gadget {
        let sources = vec!["hdmi1".to_string(), "hdmi2".to_string(), "tuner".to_string()];
        Gadget::builder()
            .id(GadgetId::new("tv1").unwrap())
            .name("Living room TV")
            .host(ClientId::new("c1").unwrap())
            .kind(GadgetKind::Television(SourceSelector::new(sources).unwrap()))
            .build()
            .unwrap()
    }

    fn attached(gadget: &Gadget) -> Arc<RecordingSink> {
        let sink = Arc::new(RecordingSink::default());
        let weak: Weak<dyn UpdateSink> = Arc::<RecordingSink>::downgrade(&sink);
        gadget.attach(weak);
        sink
    }

    #[test]
    fn should_default_name_to_id() {
        let gadget = lamp();
        assert_eq!(gadget.name(), "lamp1");
        assert!(gadget.is_local());
        assert_eq!(gadget.class(), GadgetClass::RgbLamp);
    }

    #[test]
    fn should_fail_build_without_kind() {
        let result = Gadget::builder().id(GadgetId::new("g").unwrap()).build();
        assert!(matches!(result, Err(HubError::Validation(_))));
    }

    #[test]
    fn should_not_mark_when_value_unchanged() {
        let gadget = lamp();
        assert_eq!(gadget.set_red(0), Ok(false));
        assert!(gadget.updates().is_empty());
    }

    #[test]
    fn should_mark_exactly_the_changed_property() {
        let gadget = tv();
        assert_eq!(gadget.set_source("tuner"), Ok(true));

        let pending = gadget.updates().snapshot();
        assert_eq!(pending.properties().collect::<Vec<_>>(), vec![Property::Source]);
        assert!(!pending.name_changed());
        assert!(!pending.host_changed());
    }

    #[test]
    fn should_keep_changes_pending_while_detached() {
        let gadget = lamp();
        gadget.set_green(40).unwrap();
        gadget.flush();
        assert!(gadget.updates().snapshot().contains(Property::Rgb));
    }

    #[test]
    fn should_discard_pending_changes_on_attach() {
        let gadget = lamp();
        gadget.set_green(40).unwrap();
        let sink = attached(&gadget);
        assert!(gadget.updates().is_empty());
        assert!(sink.delivered.lock().unwrap().is_empty());
    }

    #[test]
    fn should_deliver_changes_to_attached_sink() {
        let gadget = lamp();
        let sink = attached(&gadget);

        gadget.set_red(10).unwrap();

        let delivered = sink.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0.as_str(), "lamp1");
        assert!(delivered[0].1.contains(Property::Rgb));
        assert!(gadget.updates().is_empty());
    }

    #[test]
    fn should_not_deliver_when_setter_is_a_noop() {
        let gadget = tv();
        let sink = attached(&gadget);
        gadget.set_source(0).unwrap();
        gadget.set_status(false).unwrap();
        assert!(sink.delivered.lock().unwrap().is_empty());
    }

    #[test]
    fn should_leave_state_untouched_when_any_change_fails() {
        let gadget = tv();
        let result = gadget.apply(&[
            AttributeChange::Status(true),
            AttributeChange::Source(SourceRef::from("X")),
        ]);

        assert_eq!(result, Err(DomainValueError::UnknownSource("X".to_string())));
        assert_eq!(gadget.status(), Some(false));
        assert_eq!(gadget.source(), Some(0));
        assert!(gadget.updates().is_empty());
    }

    #[test]
    fn should_reject_speed_above_steps() {
        let fan = Gadget::builder()
            .id(GadgetId::new("fan").unwrap())
            .kind(GadgetKind::Fan(FanSpeed::new(3)))
            .build()
            .unwrap();
        assert!(matches!(
            fan.set_speed(4),
            Err(DomainValueError::OutOfRange { field: "speed", .. })
        ));
        assert_eq!(fan.set_speed(3), Ok(true));
        assert_eq!(fan.speed(), Some(3));
    }

    #[test]
    fn should_reject_unsupported_attribute() {
        let gadget = lamp();
        assert!(matches!(
            gadget.set_status(true),
            Err(DomainValueError::Unsupported { .. })
        ));
    }

    #[test]
    fn should_mark_host_when_remote_gadget_moves() {
        let gadget = tv();
        assert_eq!(gadget.set_host(ClientId::new("c2").unwrap()), Ok(true));
        assert!(gadget.updates().snapshot().host_changed());
        assert_eq!(gadget.host().unwrap().as_str(), "c2");
    }

    #[test]
    fn should_refuse_host_on_local_gadget() {
        let gadget = lamp();
        assert_eq!(
            gadget.set_host(ClientId::new("c2").unwrap()),
            Err(DomainValueError::NotRemote)
        );
    }

    #[test]
    fn should_mark_name_change() {
        let gadget = lamp();
        assert_eq!(gadget.set_name("Desk lamp"), Ok(true));
        assert!(gadget.updates().snapshot().name_changed());
    }

    #[test]
    fn should_reach_snapshot_state_through_its_changes() {
        let source = tv();
        source
            .apply(&[
                AttributeChange::Status(true),
                AttributeChange::Source(SourceRef::from(2)),
            ])
            .unwrap();
        let target = tv();

        assert_eq!(target.apply(&source.snapshot().as_changes()), Ok(true));
        assert_eq!(target.snapshot(), source.snapshot());
        assert_eq!(target.apply(&source.snapshot().as_changes()), Ok(false));
    }

    #[test]
    fn should_stop_delivering_after_detach() {
        let gadget = lamp();
        let sink = attached(&gadget);
        gadget.detach();
        gadget.set_blue(1).unwrap();
        assert!(sink.delivered.lock().unwrap().is_empty());
    }
}
