//! Update applier — applies an inbound `{id, attributes}` request to a
//! registered gadget.
//!
//! Attributes are validated against a strict per-class schema (unknown keys
//! or wrong types are a [`ValidationError`]) before anything is touched.
//! The resulting changes are applied in one batch through the gadget's
//! setters, so a rejected value leaves every field of the request unchanged.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use gadgethub_domain::error::{ApplyError, HubError, ValidationError};
use gadgethub_domain::gadget::{AttributeChange, Capability, GadgetClass, GadgetSnapshot, Rgb};

use crate::codec::decoder::WireSource;
use crate::codec::{DispatchError, DispatchTable, Matcher};
use crate::gadget_registry::GadgetRegistry;

/// Body of a `gadget/update` request.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyUpdateRequest {
    pub id: String,
    pub attributes: Value,
}

/// Turns a validated attribute object into changes for one class.
pub trait ClassApplier: Send + Sync {
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when the attributes do not fit the
    /// class schema, or [`HubError::Apply`] when a value is out of range.
    fn changes(
        &self,
        snapshot: &GadgetSnapshot,
        attributes: Value,
    ) -> Result<Vec<AttributeChange>, HubError>;
}

pub struct SwitchApplier;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StatusPatch {
    status: Option<bool>,
}

impl ClassApplier for SwitchApplier {
    fn changes(
        &self,
        _snapshot: &GadgetSnapshot,
        attributes: Value,
    ) -> Result<Vec<AttributeChange>, HubError> {
        let patch: StatusPatch = schema(attributes)?;
        Ok(patch.status.map(AttributeChange::Status).into_iter().collect())
    }
}

pub struct RgbApplier;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RgbPatch {
    red: Option<i64>,
    green: Option<i64>,
    blue: Option<i64>,
}

impl ClassApplier for RgbApplier {
    fn changes(
        &self,
        snapshot: &GadgetSnapshot,
        attributes: Value,
    ) -> Result<Vec<AttributeChange>, HubError> {
        let patch: RgbPatch = schema(attributes)?;
        let channel = |field, raw| {
            Rgb::channel(field, raw)
                .map_err(|err| ApplyError::rejected(snapshot.id.as_str(), &err))
        };
        let mut changes = Vec::new();
        if let Some(raw) = patch.red {
            changes.push(AttributeChange::Red(channel("red", raw)?));
        }
        if let Some(raw) = patch.green {
            changes.push(AttributeChange::Green(channel("green", raw)?));
        }
        if let Some(raw) = patch.blue {
            changes.push(AttributeChange::Blue(channel("blue", raw)?));
        }
        Ok(changes)
    }
}

pub struct FanApplier;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SpeedPatch {
    speed: Option<i64>,
}

impl ClassApplier for FanApplier {
    fn changes(
        &self,
        snapshot: &GadgetSnapshot,
        attributes: Value,
    ) -> Result<Vec<AttributeChange>, HubError> {
        let patch: SpeedPatch = schema(attributes)?;
        let Some(raw) = patch.speed else {
            return Ok(Vec::new());
        };
        let fan = snapshot.kind.fan().ok_or_else(|| ApplyError {
            message: format!("Gadget '{}' has no speed", snapshot.id),
        })?;
        let speed = fan
            .checked(raw)
            .map_err(|err| ApplyError::rejected(snapshot.id.as_str(), &err))?;
        Ok(vec![AttributeChange::Speed(speed)])
    }
}

pub struct SourceSelectorApplier;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SourcePatch {
    status: Option<bool>,
    source: Option<WireSource>,
}

impl ClassApplier for SourceSelectorApplier {
    fn changes(
        &self,
        _snapshot: &GadgetSnapshot,
        attributes: Value,
    ) -> Result<Vec<AttributeChange>, HubError> {
        let patch: SourcePatch = schema(attributes)?;
        let mut changes = Vec::new();
        if let Some(status) = patch.status {
            changes.push(AttributeChange::Status(status));
        }
        if let Some(source) = patch.source {
            changes.push(AttributeChange::Source(source.into()));
        }
        Ok(changes)
    }
}

/// Applies update requests to gadgets in the registry.
pub struct UpdateApplier {
    appliers: DispatchTable<Box<dyn ClassApplier>>,
    gadgets: Arc<GadgetRegistry>,
}

impl UpdateApplier {
    #[must_use]
    pub fn new(
        appliers: DispatchTable<Box<dyn ClassApplier>>,
        gadgets: Arc<GadgetRegistry>,
    ) -> Self {
        Self { appliers, gadgets }
    }

    /// Applier covering every built-in class.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if the built-in table is misordered.
    pub fn standard(gadgets: Arc<GadgetRegistry>) -> Result<Self, DispatchError> {
        let switch: Box<dyn ClassApplier> = Box::new(SwitchApplier);
        let appliers = DispatchTable::new()
            .with(Matcher::Class(GadgetClass::Switch), switch)?
            .with(Matcher::Capability(Capability::Rgb), Box::new(RgbApplier))?
            .with(Matcher::Capability(Capability::Speed), Box::new(FanApplier))?
            .with(
                Matcher::Capability(Capability::Source),
                Box::new(SourceSelectorApplier),
            )?;
        Ok(Self::new(appliers, gadgets))
    }

    /// Parse a raw payload and apply it.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply); a malformed body is a
    /// [`HubError::Validation`].
    pub fn apply_payload(&self, payload: &Value) -> Result<bool, HubError> {
        let request: ApplyUpdateRequest = schema(payload.clone())?;
        self.apply(request)
    }

    /// Apply one update request. Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// - [`HubError::NotFound`] when the gadget does not exist
    /// - [`HubError::Validation`] when the attributes do not fit the class
    /// - [`HubError::Apply`] when a value is rejected; nothing is changed
    #[tracing::instrument(skip(self, request), fields(gadget = %request.id))]
    pub fn apply(&self, request: ApplyUpdateRequest) -> Result<bool, HubError> {
        let gadget = self.gadgets.get(&request.id)?;
        let snapshot = gadget.snapshot();
        let applier = self
            .appliers
            .resolve(snapshot.class())
            .ok_or_else(|| ApplyError {
                message: format!(
                    "No update applier for {} gadget '{}'",
                    snapshot.class(),
                    snapshot.id
                ),
            })?;
        let changes = applier.changes(&snapshot, request.attributes)?;
        let changed = gadget
            .apply(&changes)
            .map_err(|err| ApplyError::rejected(gadget.id().as_str(), &err))?;
        tracing::debug!(changed, "update applied");
        Ok(changed)
    }
}

fn schema<T: DeserializeOwned>(value: Value) -> Result<T, ValidationError> {
    serde_json::from_value(value)
        .map_err(|err| ValidationError::MalformedPayload(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gadgethub_domain::gadget::{FanSpeed, Gadget, GadgetKind, SourceSelector};
    use gadgethub_domain::id::GadgetId;
    use serde_json::json;

    fn setup() -> (UpdateApplier, Arc<GadgetRegistry>) {
        let gadgets = GadgetRegistry::new();
        for (id, kind) in [
            ("lamp1", GadgetKind::RgbLamp(Rgb::default())),
            ("fan1", GadgetKind::Fan(FanSpeed::new(3))),
            ("sw1", GadgetKind::Switch { status: false }),
            (
                "tv1",
                GadgetKind::Television(
                    SourceSelector::new(vec!["hdmi1".into(), "hdmi2".into(), "tuner".into()])
                        .unwrap(),
                ),
            ),
        ] {
            gadgets
                .add(
                    Gadget::builder()
                        .id(GadgetId::new(id).unwrap())
                        .kind(kind)
                        .build()
                        .unwrap(),
                )
                .unwrap();
        }
        (UpdateApplier::standard(gadgets.clone()).unwrap(), gadgets)
    }

    #[test]
    fn should_apply_only_present_fields() {
        let (applier, gadgets) = setup();
        gadgets.get("lamp1").unwrap().set_blue(7).unwrap();

        let changed = applier
            .apply_payload(&json!({"id": "lamp1", "attributes": {"red": 10}}))
            .unwrap();

        assert!(changed);
        assert_eq!(gadgets.get("lamp1").unwrap().rgb(), Some(Rgb::new(10, 0, 7)));
    }

    #[test]
    fn should_report_no_change_for_current_values() {
        let (applier, _) = setup();
        let changed = applier
            .apply_payload(&json!({"id": "sw1", "attributes": {"status": false}}))
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn should_reject_unknown_source_and_leave_gadget_untouched() {
        let (applier, gadgets) = setup();

        let err = applier
            .apply_payload(&json!({"id": "tv1", "attributes": {"status": true, "source": "X"}}))
            .unwrap_err();

        assert_eq!(err.error_type(), "GadgetUpdateApplyError");
        assert_eq!(err.to_string(), "Cannot apply source 'X' to gadget 'tv1'");
        let tv = gadgets.get("tv1").unwrap();
        assert_eq!(tv.source(), Some(0));
        assert_eq!(tv.status(), Some(false));
    }

    #[test]
    fn should_select_source_by_name_or_index() {
        let (applier, gadgets) = setup();
        applier
            .apply_payload(&json!({"id": "tv1", "attributes": {"source": "tuner"}}))
            .unwrap();
        assert_eq!(gadgets.get("tv1").unwrap().source(), Some(2));

        applier
            .apply_payload(&json!({"id": "tv1", "attributes": {"source": 1}}))
            .unwrap();
        assert_eq!(gadgets.get("tv1").unwrap().source_name().as_deref(), Some("hdmi2"));
    }

    #[test]
    fn should_reject_out_of_range_values_without_partial_apply() {
        let (applier, gadgets) = setup();

        let err = applier
            .apply_payload(&json!({"id": "lamp1", "attributes": {"red": 5, "green": 300}}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot apply green '300' to gadget 'lamp1'");
        assert_eq!(gadgets.get("lamp1").unwrap().rgb(), Some(Rgb::default()));

        let err = applier
            .apply_payload(&json!({"id": "fan1", "attributes": {"speed": 4}}))
            .unwrap_err();
        assert!(matches!(err, HubError::Apply(_)));
        assert_eq!(gadgets.get("fan1").unwrap().speed(), Some(0));
    }

    #[test]
    fn should_reject_fields_outside_class_schema() {
        let (applier, _) = setup();

        let err = applier
            .apply_payload(&json!({"id": "fan1", "attributes": {"status": true}}))
            .unwrap_err();
        assert_eq!(err.error_type(), "ValidationError");

        let err = applier
            .apply_payload(&json!({"id": "sw1", "attributes": {"status": "on"}}))
            .unwrap_err();
        assert_eq!(err.error_type(), "ValidationError");
    }

    #[test]
    fn should_reject_malformed_request_and_unknown_gadget() {
        let (applier, _) = setup();
        assert_eq!(
            applier
                .apply_payload(&json!({"attributes": {}}))
                .unwrap_err()
                .error_type(),
            "ValidationError"
        );
        assert_eq!(
            applier
                .apply_payload(&json!({"id": "ghost", "attributes": {}}))
                .unwrap_err()
                .error_type(),
            "NotFoundError"
        );
    }
}
