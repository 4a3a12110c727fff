//! Gadget classes, capabilities and the per-class attribute state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainValueError;
use crate::update::Property;

/// Concrete gadget class, as sent in the `class` / `type` wire field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GadgetClass {
    Switch,
    RgbLamp,
    Fan,
    Television,
    AvReceiver,
}

impl GadgetClass {
    /// Every class, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Switch,
        Self::RgbLamp,
        Self::Fan,
        Self::Television,
        Self::AvReceiver,
    ];

    /// Wire name of the class.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Switch => "switch",
            Self::RgbLamp => "rgb_lamp",
            Self::Fan => "fan",
            Self::Television => "television",
            Self::AvReceiver => "av_receiver",
        }
    }

    /// Look up a class by its wire name.
    #[must_use]
    pub fn from_wire(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.as_str() == raw)
    }

    /// What gadgets of this class can do.
    #[must_use]
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Self::Switch => &[Capability::Status],
            Self::RgbLamp => &[Capability::Rgb],
            Self::Fan => &[Capability::Speed],
            Self::Television | Self::AvReceiver => &[Capability::Status, Capability::Source],
        }
    }

    #[must_use]
    pub fn has(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl fmt::Display for GadgetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A capability shared by one or more gadget classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Status,
    Rgb,
    Speed,
    Source,
}

/// An RGB colour; each channel is in `[0, 255]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    #[must_use]
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Validate a raw channel value.
    ///
    /// # Errors
    ///
    /// Returns [`DomainValueError::OutOfRange`] when `raw` is outside `[0, 255]`.
    pub fn channel(field: &'static str, raw: i64) -> Result<u8, DomainValueError> {
        u8::try_from(raw).map_err(|_| DomainValueError::OutOfRange {
            field,
            value: raw,
            min: 0,
            max: i64::from(u8::MAX),
        })
    }
}

/// Fan speed in `[0, steps]`; `steps` is fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanSpeed {
    speed: u16,
    steps: u16,
}

impl FanSpeed {
    /// A stopped fan with `steps` speed levels.
    #[must_use]
    pub fn new(steps: u16) -> Self {
        Self { speed: 0, steps }
    }

    /// A fan with `steps` levels running at `speed`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainValueError::OutOfRange`] when `speed` exceeds `steps`.
    pub fn with_speed(steps: u16, speed: u16) -> Result<Self, DomainValueError> {
        let mut fan = Self::new(steps);
        fan.set(speed)?;
        Ok(fan)
    }

    #[must_use]
    pub fn speed(&self) -> u16 {
        self.speed
    }

    #[must_use]
    pub fn steps(&self) -> u16 {
        self.steps
    }

    /// Validate a raw speed against this fan's steps.
    ///
    /// # Errors
    ///
    /// Returns [`DomainValueError::OutOfRange`] when `raw` is outside `[0, steps]`.
    pub fn checked(&self, raw: i64) -> Result<u16, DomainValueError> {
        u16::try_from(raw)
            .ok()
            .filter(|speed| *speed <= self.steps)
            .ok_or(DomainValueError::OutOfRange {
                field: "speed",
                value: raw,
                min: 0,
                max: i64::from(self.steps),
            })
    }

    fn set(&mut self, speed: u16) -> Result<(), DomainValueError> {
        self.speed = self.checked(i64::from(speed))?;
        Ok(())
    }
}

/// How a caller designates a source: by position or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Index(usize),
    Name(String),
}

impl From<usize> for SourceRef {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for SourceRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Power status plus a selected input among a fixed list of named sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSelector {
    status: bool,
    source: usize,
    sources: Vec<String>,
}

impl SourceSelector {
    /// A powered-off selector on the first source.
    ///
    /// # Errors
    ///
    /// Returns [`DomainValueError::SourceIndexOutOfRange`] when `sources` is empty.
    pub fn new(sources: Vec<String>) -> Result<Self, DomainValueError> {
        if sources.is_empty() {
            return Err(DomainValueError::SourceIndexOutOfRange { index: 0, len: 0 });
        }
        Ok(Self {
            status: false,
            source: 0,
            sources,
        })
    }

    /// Set the initial power status and selected source.
    ///
    /// # Errors
    ///
    /// Returns a source error when `source` does not resolve.
    pub fn with_selection(
        mut self,
        status: bool,
        source: &SourceRef,
    ) -> Result<Self, DomainValueError> {
        self.source = self.resolve(source)?;
        self.status = status;
        Ok(self)
    }

    #[must_use]
    pub fn status(&self) -> bool {
        self.status
    }

    /// Index of the selected source.
    #[must_use]
    pub fn source(&self) -> usize {
        self.source
    }

    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.sources[self.source]
    }

    #[must_use]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Resolve a [`SourceRef`] to an index.
    ///
    /// # Errors
    ///
    /// Returns [`DomainValueError::UnknownSource`] for a name not in the list and
    /// [`DomainValueError::SourceIndexOutOfRange`] for an index past its end.
    pub fn resolve(&self, source: &SourceRef) -> Result<usize, DomainValueError> {
        match source {
            SourceRef::Index(index) if *index < self.sources.len() => Ok(*index),
            SourceRef::Index(index) => Err(DomainValueError::SourceIndexOutOfRange {
                index: *index,
                len: self.sources.len(),
            }),
            SourceRef::Name(name) => self
                .sources
                .iter()
                .position(|candidate| candidate == name)
                .ok_or_else(|| DomainValueError::UnknownSource(name.clone())),
        }
    }
}

/// Attribute state of a gadget, tagged by class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GadgetKind {
    Switch { status: bool },
    RgbLamp(Rgb),
    Fan(FanSpeed),
    Television(SourceSelector),
    AvReceiver(SourceSelector),
}

impl GadgetKind {
    #[must_use]
    pub fn class(&self) -> GadgetClass {
        match self {
            Self::Switch { .. } => GadgetClass::Switch,
            Self::RgbLamp(_) => GadgetClass::RgbLamp,
            Self::Fan(_) => GadgetClass::Fan,
            Self::Television(_) => GadgetClass::Television,
            Self::AvReceiver(_) => GadgetClass::AvReceiver,
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<bool> {
        match self {
            Self::Switch { status } => Some(*status),
            Self::Television(selector) | Self::AvReceiver(selector) => Some(selector.status),
            Self::RgbLamp(_) | Self::Fan(_) => None,
        }
    }

    #[must_use]
    pub fn rgb(&self) -> Option<Rgb> {
        match self {
            Self::RgbLamp(rgb) => Some(*rgb),
            _ => None,
        }
    }

    #[must_use]
    pub fn fan(&self) -> Option<&FanSpeed> {
        match self {
            Self::Fan(fan) => Some(fan),
            _ => None,
        }
    }

    #[must_use]
    pub fn selector(&self) -> Option<&SourceSelector> {
        match self {
            Self::Television(selector) | Self::AvReceiver(selector) => Some(selector),
            _ => None,
        }
    }

    pub(crate) fn set_status(&mut self, value: bool) -> Result<(), DomainValueError> {
        match self {
            Self::Switch { status } => *status = value,
            Self::Television(selector) | Self::AvReceiver(selector) => selector.status = value,
            Self::RgbLamp(_) | Self::Fan(_) => return Err(self.unsupported("status")),
        }
        Ok(())
    }

    pub(crate) fn rgb_mut(&mut self, field: &'static str) -> Result<&mut Rgb, DomainValueError> {
        match self {
            Self::RgbLamp(rgb) => Ok(rgb),
            _ => Err(self.unsupported(field)),
        }
    }

    pub(crate) fn set_speed(&mut self, speed: u16) -> Result<(), DomainValueError> {
        match self {
            Self::Fan(fan) => fan.set(speed),
            _ => Err(self.unsupported("speed")),
        }
    }

    pub(crate) fn set_source(&mut self, source: &SourceRef) -> Result<(), DomainValueError> {
        match self {
            Self::Television(selector) | Self::AvReceiver(selector) => {
                selector.source = selector.resolve(source)?;
                Ok(())
            }
            _ => Err(self.unsupported("source")),
        }
    }

    /// `true` when both kinds share a class and the same fixed layout (fan
    /// steps, source list), so one can be reached from the other by setters.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Fan(a), Self::Fan(b)) => a.steps == b.steps,
            (Self::Television(a), Self::Television(b))
            | (Self::AvReceiver(a), Self::AvReceiver(b)) => a.sources == b.sources,
            _ => self.class() == other.class(),
        }
    }

    /// Properties whose value differs between `self` and `other`.
    pub(crate) fn diff(&self, other: &Self) -> Vec<Property> {
        let mut dirty = Vec::new();
        if self.status() != other.status() {
            dirty.push(Property::Status);
        }
        if self.rgb() != other.rgb() {
            dirty.push(Property::Rgb);
        }
        if self.fan().map(FanSpeed::speed) != other.fan().map(FanSpeed::speed) {
            dirty.push(Property::Speed);
        }
        if self.selector().map(SourceSelector::source) != other.selector().map(SourceSelector::source)
        {
            dirty.push(Property::Source);
        }
        dirty
    }

    fn unsupported(&self, field: &'static str) -> DomainValueError {
        DomainValueError::Unsupported {
            class: self.class().as_str(),
            field,
        }
    }
}
