//! Attribute decoders — build a gadget kind from an inbound `attributes`
//! object.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use gadgethub_domain::error::DecodeError;
use gadgethub_domain::gadget::{
    FanSpeed, GadgetClass, GadgetKind, Rgb, SourceRef, SourceSelector,
};

/// A source given by position or by name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireSource {
    Index(usize),
    Name(String),
}

impl From<WireSource> for SourceRef {
    fn from(source: WireSource) -> Self {
        match source {
            WireSource::Index(index) => Self::Index(index),
            WireSource::Name(name) => Self::Name(name),
        }
    }
}

/// Decodes the attributes of the classes it is registered for.
pub trait AttributeDecoder: Send + Sync {
    /// # Errors
    ///
    /// Returns [`DecodeError::Attributes`] on missing, unknown or invalid
    /// fields.
    fn decode(&self, class: GadgetClass, attributes: Value) -> Result<GadgetKind, DecodeError>;
}

pub struct SwitchDecoder;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SwitchAttributes {
    status: bool,
}

impl AttributeDecoder for SwitchDecoder {
    fn decode(&self, class: GadgetClass, attributes: Value) -> Result<GadgetKind, DecodeError> {
        let SwitchAttributes { status } = parse(class, attributes)?;
        Ok(GadgetKind::Switch { status })
    }
}

pub struct RgbDecoder;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RgbAttributes {
    red: u8,
    green: u8,
    blue: u8,
}

impl AttributeDecoder for RgbDecoder {
    fn decode(&self, class: GadgetClass, attributes: Value) -> Result<GadgetKind, DecodeError> {
        let RgbAttributes { red, green, blue } = parse(class, attributes)?;
        Ok(GadgetKind::RgbLamp(Rgb::new(red, green, blue)))
    }
}

pub struct FanDecoder;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FanAttributes {
    #[serde(default)]
    speed: u16,
    steps: u16,
}

impl AttributeDecoder for FanDecoder {
    fn decode(&self, class: GadgetClass, attributes: Value) -> Result<GadgetKind, DecodeError> {
        let FanAttributes { speed, steps } = parse(class, attributes)?;
        let fan = FanSpeed::with_speed(steps, speed).map_err(|err| invalid(class, &err))?;
        Ok(GadgetKind::Fan(fan))
    }
}

/// Televisions and AV receivers share one layout.
pub struct SourceSelectorDecoder;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SourceSelectorAttributes {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    source: Option<WireSource>,
    sources: Vec<String>,
}

impl AttributeDecoder for SourceSelectorDecoder {
    fn decode(&self, class: GadgetClass, attributes: Value) -> Result<GadgetKind, DecodeError> {
        let SourceSelectorAttributes {
            status,
            source,
            sources,
        } = parse(class, attributes)?;
        let source = source.map_or(SourceRef::Index(0), SourceRef::from);
        let selector = SourceSelector::new(sources)
            .and_then(|selector| selector.with_selection(status, &source))
            .map_err(|err| invalid(class, &err))?;
        match class {
            GadgetClass::Television => Ok(GadgetKind::Television(selector)),
            GadgetClass::AvReceiver => Ok(GadgetKind::AvReceiver(selector)),
            other => Err(DecodeError::Attributes {
                class: other.as_str(),
                reason: "class has no sources".to_string(),
            }),
        }
    }
}

fn parse<T: DeserializeOwned>(class: GadgetClass, attributes: Value) -> Result<T, DecodeError> {
    serde_json::from_value(attributes).map_err(|err| invalid(class, &err))
}

fn invalid(class: GadgetClass, err: &impl std::fmt::Display) -> DecodeError {
    DecodeError::Attributes {
        class: class.as_str(),
        reason: err.to_string(),
    }
}
