//! Common error types used across the workspace.
//!
//! Each failure family has its own typed error. [`HubError`] wraps them all
//! with `#[from]` conversions so callers can propagate with `?` and the API
//! layer can render a stable `error_type` string for each family.

/// Top-level error for every fallible operation in gadgethub.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    DomainValue(#[from] DomainValueError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    AlreadyExists(#[from] AlreadyExistsError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error(transparent)]
    NoResponse(#[from] NoResponseError),
}

impl HubError {
    /// Stable identifier of the error family, sent as `error_type` on the wire.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::DomainValue(err) if err.is_source_error() => "GadgetSourceError",
            Self::DomainValue(_) => "GadgetDomainValueError",
            Self::NotFound(_) => "NotFoundError",
            Self::AlreadyExists(_) => "AlreadyExistsError",
            Self::Encode(_) => "GadgetEncodeError",
            Self::Decode(_) => "GadgetDecodeError",
            Self::Apply(_) => "GadgetUpdateApplyError",
            Self::NoResponse(_) => "NoResponseError",
        }
    }
}

/// Malformed inbound data, rejected before it reaches the core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("id must not be empty")]
    EmptyId,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("invalid api version '{0}', expected 'major.minor.bugfix'")]
    InvalidApiVersion(String),
}

/// A setter was given a value outside the gadget's domain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainValueError {
    #[error("{field} value {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("source index {index} is outside the {len} available sources")]
    SourceIndexOutOfRange { index: usize, len: usize },

    #[error("{class} gadgets have no '{field}' attribute")]
    Unsupported {
        class: &'static str,
        field: &'static str,
    },

    #[error("local gadgets have no host client")]
    NotRemote,
}

impl DomainValueError {
    /// Whether this is a source-resolution failure (unknown name or bad index).
    #[must_use]
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownSource(_) | Self::SourceIndexOutOfRange { .. }
        )
    }

    /// Name of the attribute the rejected value was meant for.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::OutOfRange { field, .. } | Self::Unsupported { field, .. } => field,
            Self::UnknownSource(_) | Self::SourceIndexOutOfRange { .. } => "source",
            Self::NotRemote => "host",
        }
    }

    /// The rejected value, rendered for messages.
    #[must_use]
    pub fn rejected_value(&self) -> String {
        match self {
            Self::OutOfRange { value, .. } => value.to_string(),
            Self::UnknownSource(name) => name.clone(),
            Self::SourceIndexOutOfRange { index, .. } => index.to_string(),
            Self::Unsupported { field, .. } => (*field).to_string(),
            Self::NotRemote => "host".to_string(),
        }
    }
}

/// A gadget or client id is not registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} '{id}' does not exist")]
pub struct NotFoundError {
    pub kind: &'static str,
    pub id: String,
}

/// A gadget or client id is already registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} '{id}' already exists")]
pub struct AlreadyExistsError {
    pub kind: &'static str,
    pub id: String,
}

/// No encoder could turn a gadget into a wire payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot encode {class} gadget '{id}': {reason}")]
pub struct EncodeError {
    pub class: String,
    pub id: String,
    pub reason: String,
}

/// An inbound gadget payload could not be turned into a gadget.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed gadget payload: {0}")]
    Malformed(String),

    #[error("unknown gadget type '{0}'")]
    UnknownType(String),

    #[error("no decoder registered for {0} gadgets")]
    MissingDecoder(&'static str),

    #[error("invalid {class} attributes: {reason}")]
    Attributes { class: &'static str, reason: String },
}

/// A validated update was rejected while being applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApplyError {
    pub message: String,
}

impl ApplyError {
    /// Describe a rejected value for `gadget_id`.
    #[must_use]
    pub fn rejected(gadget_id: &str, err: &DomainValueError) -> Self {
        Self {
            message: format!(
                "Cannot apply {} '{}' to gadget '{gadget_id}'",
                err.field(),
                err.rejected_value()
            ),
        }
    }
}

/// An external publisher did not acknowledge within the allotted time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no response for '{token}' within {timeout_ms}ms")]
pub struct NoResponseError {
    pub token: String,
    pub timeout_ms: u128,
}
