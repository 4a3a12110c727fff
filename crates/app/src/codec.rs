//! Gadget wire codec — explicit encoder and decoder dispatch tables.
//!
//! [`GadgetCodec`] is built once at startup and shared by reference. It owns
//! one [`DispatchTable`] of attribute encoders and one of attribute decoders,
//! and looks up host liveness in the [`ClientRegistry`] when rendering full
//! snapshots.
//!
//! Wire shapes:
//! - snapshot: `{id, is_local, class, attributes, host_client?: {id, is_active}}`
//! - update: `{id, name?, attributes}` with only the dirty attribute keys
//! - inbound gadget: `{id, type, name?, attributes}` (`class` accepted for `type`)

pub mod client;
pub mod decoder;
pub mod dispatch;
pub mod encoder;

pub use client::encode_client;
pub use decoder::{
    AttributeDecoder, FanDecoder, RgbDecoder, SourceSelectorDecoder, SwitchDecoder,
};
pub use dispatch::{DispatchError, DispatchTable, Matcher};
pub use encoder::{
    AttributeEncoder, FanEncoder, RgbEncoder, SourceSelectorEncoder, SwitchEncoder,
};

use std::sync::Arc;

use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::{Map, Value, json};

use gadgethub_domain::error::{DecodeError, EncodeError};
use gadgethub_domain::gadget::{Capability, Gadget, GadgetClass, GadgetSnapshot};
use gadgethub_domain::id::{ClientId, GadgetId};
use gadgethub_domain::update::ChangeSet;

use crate::client_registry::ClientRegistry;

/// Result of encoding many gadgets: every payload that could be produced,
/// plus one error per gadget that could not.
#[derive(Debug, Default)]
pub struct BatchEncoding {
    pub payloads: Vec<Value>,
    pub errors: Vec<EncodeError>,
}

/// Encodes gadgets to and decodes them from their wire shapes.
pub struct GadgetCodec {
    encoders: DispatchTable<Box<dyn AttributeEncoder>>,
    decoders: DispatchTable<Box<dyn AttributeDecoder>>,
    clients: Arc<ClientRegistry>,
}

impl GadgetCodec {
    #[must_use]
    pub fn new(
        encoders: DispatchTable<Box<dyn AttributeEncoder>>,
        decoders: DispatchTable<Box<dyn AttributeDecoder>>,
        clients: Arc<ClientRegistry>,
    ) -> Self {
        Self {
            encoders,
            decoders,
            clients,
        }
    }

    /// Codec covering every built-in class.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if the built-in tables are misordered.
    pub fn standard(clients: Arc<ClientRegistry>) -> Result<Self, DispatchError> {
        Ok(Self::new(
            standard_encoders()?,
            standard_decoders()?,
            clients,
        ))
    }

    /// Full snapshot of a gadget.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when no encoder handles the gadget's class.
    pub fn encode(&self, gadget: &Gadget) -> Result<Value, EncodeError> {
        self.encode_snapshot(&gadget.snapshot())
    }

    /// Full snapshot from an already-taken [`GadgetSnapshot`].
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when no encoder handles the snapshot's class.
    pub fn encode_snapshot(&self, snapshot: &GadgetSnapshot) -> Result<Value, EncodeError> {
        let attributes = self.attributes(snapshot)?;
        let mut payload = Map::new();
        payload.insert("id".to_string(), json!(snapshot.id));
        payload.insert(
            "is_local".to_string(),
            Value::Bool(snapshot.ownership.is_local()),
        );
        payload.insert("class".to_string(), json!(snapshot.class()));
        payload.insert("attributes".to_string(), Value::Object(attributes));
        if let Some(host) = snapshot.ownership.host() {
            let is_active = self.clients.is_active(host.as_str()).unwrap_or(false);
            payload.insert(
                "host_client".to_string(),
                json!({ "id": host, "is_active": is_active }),
            );
        }
        Ok(Value::Object(payload))
    }

    /// Update message carrying only the attributes marked in `changes`.
    ///
    /// The name is included only when it changed. Values come from the live
    /// gadget; the change set only decides which keys are sent.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when no encoder handles the gadget's class.
    pub fn encode_update(
        &self,
        gadget: &Gadget,
        changes: &ChangeSet,
    ) -> Result<Value, EncodeError> {
        let snapshot = gadget.snapshot();
        let full = self.attributes(&snapshot)?;
        let attributes: Map<String, Value> = changes
            .properties()
            .flat_map(|property| property.wire_fields().iter().copied())
            .filter_map(|field| {
                full.get(field)
                    .map(|value| (field.to_string(), value.clone()))
            })
            .collect();

        let mut payload = Map::new();
        payload.insert("id".to_string(), json!(snapshot.id));
        if changes.name_changed() {
            payload.insert("name".to_string(), Value::String(snapshot.name));
        }
        payload.insert("attributes".to_string(), Value::Object(attributes));
        Ok(Value::Object(payload))
    }

    /// Encode every gadget, skipping the ones that fail.
    pub fn encode_all<'a>(
        &self,
        gadgets: impl IntoIterator<Item = &'a Gadget>,
    ) -> BatchEncoding {
        let mut batch = BatchEncoding::default();
        for gadget in gadgets {
            match self.encode(gadget) {
                Ok(payload) => batch.payloads.push(payload),
                Err(err) => {
                    tracing::error!(
                        gadget = %gadget.id(),
                        error = %err,
                        "failed to encode gadget"
                    );
                    batch.errors.push(err);
                }
            }
        }
        batch
    }

    /// Build a gadget from an inbound payload.
    ///
    /// With a `host` the gadget is remote, otherwise local.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the payload is malformed, the type is
    /// unknown, or the attributes do not fit the class.
    pub fn decode(&self, payload: &Value, host: Option<ClientId>) -> Result<Gadget, DecodeError> {
        let wire = GadgetWire::deserialize(payload)
            .map_err(|err| DecodeError::Malformed(err.to_string()))?;
        let class = GadgetClass::from_wire(&wire.class)
            .ok_or_else(|| DecodeError::UnknownType(wire.class.clone()))?;
        let decoder = self
            .decoders
            .resolve(class)
            .ok_or(DecodeError::MissingDecoder(class.as_str()))?;
        let kind = decoder.decode(class, wire.attributes)?;
        let id =
            GadgetId::new(wire.id).map_err(|err| DecodeError::Malformed(err.to_string()))?;

        let mut builder = Gadget::builder().id(id).kind(kind);
        if let Some(name) = wire.name {
            builder = builder.name(name);
        }
        if let Some(host) = host {
            builder = builder.host(host);
        }
        builder
            .build()
            .map_err(|err| DecodeError::Malformed(err.to_string()))
    }

    fn attributes(&self, snapshot: &GadgetSnapshot) -> Result<Map<String, Value>, EncodeError> {
        let class = snapshot.class();
        let failure = |reason: &str| EncodeError {
            class: class.to_string(),
            id: snapshot.id.to_string(),
            reason: reason.to_string(),
        };
        let encoder = self
            .encoders
            .resolve(class)
            .ok_or_else(|| failure("no encoder registered for this class"))?;
        encoder
            .encode(&snapshot.kind)
            .ok_or_else(|| failure("encoder does not understand these attributes"))
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GadgetWire {
    id: String,
    #[serde(rename = "type", alias = "class")]
    class: String,
    #[serde(default)]
    name: Option<String>,
    attributes: Value,
    #[serde(default, rename = "is_local")]
    _is_local: Option<IgnoredAny>,
    #[serde(default, rename = "host_client")]
    _host_client: Option<IgnoredAny>,
}

fn standard_encoders() -> Result<DispatchTable<Box<dyn AttributeEncoder>>, DispatchError> {
    let switch: Box<dyn AttributeEncoder> = Box::new(SwitchEncoder);
    DispatchTable::new()
        .with(Matcher::Class(GadgetClass::Switch), switch)?
        .with(Matcher::Capability(Capability::Rgb), Box::new(RgbEncoder))?
        .with(Matcher::Capability(Capability::Speed), Box::new(FanEncoder))?
        .with(
            Matcher::Capability(Capability::Source),
            Box::new(SourceSelectorEncoder),
        )
}

fn standard_decoders() -> Result<DispatchTable<Box<dyn AttributeDecoder>>, DispatchError> {
    let switch: Box<dyn AttributeDecoder> = Box::new(SwitchDecoder);
    DispatchTable::new()
        .with(Matcher::Class(GadgetClass::Switch), switch)?
        .with(Matcher::Class(GadgetClass::RgbLamp), Box::new(RgbDecoder))?
        .with(Matcher::Class(GadgetClass::Fan), Box::new(FanDecoder))?
        .with(
            Matcher::Capability(Capability::Source),
            Box::new(SourceSelectorDecoder),
        )
}
