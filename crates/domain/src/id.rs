//! Typed identifier newtypes backed by strings.
//!
//! Gadget and client ids are chosen by whoever creates them (a local driver,
//! a client's firmware), so they are free-form strings rather than UUIDs.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw id.
            ///
            /// # Errors
            ///
            /// Returns [`ValidationError::EmptyId`] when `raw` is empty.
            pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
                let raw = raw.into();
                if raw.is_empty() {
                    return Err(ValidationError::EmptyId);
                }
                Ok(Self(raw))
            }

            /// Borrow the inner string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a [`Gadget`](crate::gadget::Gadget).
    GadgetId
);

define_id!(
    /// Stable identifier for a [`Client`](crate::client::Client), kept across reboots.
    ClientId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_reject_empty_id() {
        assert_eq!(GadgetId::new(""), Err(ValidationError::EmptyId));
    }

    #[test]
    fn should_display_inner_string() {
        let id = ClientId::new("living_room_node").unwrap();
        assert_eq!(id.to_string(), "living_room_node");
        assert_eq!(id.as_str(), "living_room_node");
    }

    #[test]
    fn should_serialize_as_plain_string() {
        let id = GadgetId::new("lamp1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"lamp1\"");
        let parsed: GadgetId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn should_lookup_by_str_in_maps() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(GadgetId::new("fan").unwrap(), 1);
        assert_eq!(map.get("fan"), Some(&1));
    }
}
