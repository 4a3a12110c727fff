//! Attribute encoders — turn a gadget's kind into its `attributes` object.

use serde_json::{Map, Value, json};

use gadgethub_domain::gadget::GadgetKind;

/// Encodes the attributes of the classes it is registered for.
pub trait AttributeEncoder: Send + Sync {
    /// Full attribute object, or `None` when `kind` is not a shape this
    /// encoder understands.
    fn encode(&self, kind: &GadgetKind) -> Option<Map<String, Value>>;
}

/// `{status}` for plain switches.
pub struct SwitchEncoder;

impl AttributeEncoder for SwitchEncoder {
    fn encode(&self, kind: &GadgetKind) -> Option<Map<String, Value>> {
        match kind {
            GadgetKind::Switch { status } => object(json!({ "status": status })),
            _ => None,
        }
    }
}

/// `{red, green, blue}`.
pub struct RgbEncoder;

impl AttributeEncoder for RgbEncoder {
    fn encode(&self, kind: &GadgetKind) -> Option<Map<String, Value>> {
        let rgb = kind.rgb()?;
        object(json!({ "red": rgb.red, "green": rgb.green, "blue": rgb.blue }))
    }
}

/// `{speed, steps}`.
pub struct FanEncoder;

impl AttributeEncoder for FanEncoder {
    fn encode(&self, kind: &GadgetKind) -> Option<Map<String, Value>> {
        let fan = kind.fan()?;
        object(json!({ "speed": fan.speed(), "steps": fan.steps() }))
    }
}

/// `{status, source, sources}` for anything with selectable inputs.
pub struct SourceSelectorEncoder;

impl AttributeEncoder for SourceSelectorEncoder {
    fn encode(&self, kind: &GadgetKind) -> Option<Map<String, Value>> {
        let selector = kind.selector()?;
        object(json!({
            "status": selector.status(),
            "source": selector.source(),
            "sources": selector.sources(),
        }))
    }
}

fn object(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
