//! Ordered dispatch tables keyed by gadget class or capability.
//!
//! Entries are tried in registration order and the first match wins. An
//! entry whose every matching class is already claimed by an earlier entry
//! could never be selected, so registering one is an error: specific
//! matchers have to come before general ones.

use std::fmt;

use gadgethub_domain::gadget::{Capability, GadgetClass};

/// What a dispatch entry applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Exactly one class.
    Class(GadgetClass),
    /// Every class with this capability.
    Capability(Capability),
}

impl Matcher {
    #[must_use]
    pub fn matches(self, class: GadgetClass) -> bool {
        match self {
            Self::Class(expected) => expected == class,
            Self::Capability(capability) => class.has(capability),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => write!(f, "class {class}"),
            Self::Capability(capability) => write!(f, "capability {capability:?}"),
        }
    }
}

/// Errors raised while building a dispatch table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("entry for {matcher} is shadowed by earlier entries and would never be selected")]
    Shadowed { matcher: Matcher },
}

/// An ordered list of `(matcher, handler)` pairs.
pub struct DispatchTable<H> {
    entries: Vec<(Matcher, H)>,
}

impl<H> Default for DispatchTable<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<H> DispatchTable<H> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Shadowed`] when no class reaches this entry.
    pub fn with(mut self, matcher: Matcher, handler: H) -> Result<Self, DispatchError> {
        let reachable = GadgetClass::ALL
            .into_iter()
            .filter(|class| matcher.matches(*class))
            .any(|class| self.resolve(class).is_none());
        if !reachable {
            return Err(DispatchError::Shadowed { matcher });
        }
        self.entries.push((matcher, handler));
        Ok(self)
    }

    /// First handler whose matcher accepts `class`.
    #[must_use]
    pub fn resolve(&self, class: GadgetClass) -> Option<&H> {
        self.entries
            .iter()
            .find(|(matcher, _)| matcher.matches(class))
            .map(|(_, handler)| handler)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_resolve_first_matching_entry() {
        let table = DispatchTable::new()
            .with(Matcher::Class(GadgetClass::Television), "tv")
            .unwrap()
            .with(Matcher::Capability(Capability::Source), "source")
            .unwrap();

        assert_eq!(table.resolve(GadgetClass::Television), Some(&"tv"));
        assert_eq!(table.resolve(GadgetClass::AvReceiver), Some(&"source"));
        assert_eq!(table.resolve(GadgetClass::Fan), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn should_reject_specific_entry_after_general_one() {
        let result = DispatchTable::new()
            .with(Matcher::Capability(Capability::Source), "source")
            .unwrap()
            .with(Matcher::Class(GadgetClass::Television), "tv");

        assert_eq!(
            result.err(),
            Some(DispatchError::Shadowed {
                matcher: Matcher::Class(GadgetClass::Television)
            })
        );
    }

    #[test]
    fn should_reject_duplicate_class_entry() {
        let result = DispatchTable::new()
            .with(Matcher::Class(GadgetClass::Fan), 1)
            .unwrap()
            .with(Matcher::Class(GadgetClass::Fan), 2);
        assert!(result.is_err());
    }

    #[test]
    fn should_accept_overlapping_entry_that_still_reaches_a_class() {
        let table = DispatchTable::new()
            .with(Matcher::Class(GadgetClass::Switch), "switch")
            .unwrap()
            .with(Matcher::Capability(Capability::Status), "status")
            .unwrap();

        assert_eq!(table.resolve(GadgetClass::Switch), Some(&"switch"));
        assert_eq!(table.resolve(GadgetClass::AvReceiver), Some(&"status"));
    }

    #[test]
    fn should_start_empty() {
        let table: DispatchTable<()> = DispatchTable::default();
        assert!(table.is_empty());
        assert_eq!(table.resolve(GadgetClass::RgbLamp), None);
    }
}
