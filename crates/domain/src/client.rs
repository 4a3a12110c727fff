//! Client — an embedded device connected to the hub, hosting remote gadgets.
//!
//! A client keeps its [`ClientId`] across reboots while its `runtime_id` is
//! re-randomized at every boot. A changed runtime id is how the hub learns a
//! client rebooted without announcing it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::{HubError, ValidationError};
use crate::id::ClientId;
use crate::time::{Timestamp, now};

/// How long a client stays active after its last heartbeat.
///
/// Long enough to survive one missed heartbeat plus jitter.
pub const DEFAULT_ACTIVITY_TIMEOUT: Duration = Duration::from_secs(17);

/// Semantic version of the API a client speaks (`major.minor.bugfix`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
    pub bugfix: u32,
}

impl ApiVersion {
    #[must_use]
    pub fn new(major: u32, minor: u32, bugfix: u32) -> Self {
        Self {
            major,
            minor,
            bugfix,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.bugfix)
    }
}

impl FromStr for ApiVersion {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidApiVersion(s.to_string());
        let mut parts = s.split('.').map(str::parse::<u32>);
        let (Some(Ok(major)), Some(Ok(minor)), Some(Ok(bugfix)), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        Ok(Self::new(major, minor, bugfix))
    }
}

impl Serialize for ApiVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Firmware build running on a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwareInfo {
    pub commit: String,
    pub branch: String,
    pub uploaded: Timestamp,
}

/// An entry dropped while ingesting a port mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMappingWarning {
    pub key: String,
    pub reason: &'static str,
}

/// Mapping of positive integer port numbers to pin/channel values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortMapping(BTreeMap<u32, i64>);

impl PortMapping {
    /// Build a mapping from raw wire data, keeping only entries whose key is a
    /// positive integer and whose value is an integer.
    ///
    /// Invalid entries are dropped and reported; they never reject the whole
    /// mapping.
    #[must_use]
    pub fn ingest(
        raw: &serde_json::Map<String, serde_json::Value>,
    ) -> (Self, Vec<PortMappingWarning>) {
        let mut ports = BTreeMap::new();
        let mut warnings = Vec::new();
        for (key, value) in raw {
            let port = match key.parse::<u32>() {
                Ok(port) if port > 0 => port,
                _ => {
                    warnings.push(PortMappingWarning {
                        key: key.clone(),
                        reason: "key is not a positive integer",
                    });
                    continue;
                }
            };
            match value.as_i64() {
                Some(value) => {
                    ports.insert(port, value);
                }
                None => warnings.push(PortMappingWarning {
                    key: key.clone(),
                    reason: "value is not an integer",
                }),
            }
        }
        (Self(ports), warnings)
    }

    #[must_use]
    pub fn get(&self, port: u32) -> Option<i64> {
        self.0.get(&port).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in ascending port order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, i64)> + '_ {
        self.0.iter().map(|(port, value)| (*port, *value))
    }
}

impl FromIterator<(u32, i64)> for PortMapping {
    fn from_iter<I: IntoIterator<Item = (u32, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().filter(|(port, _)| *port > 0).collect())
    }
}

/// A client known to the hub.
#[derive(Debug, Clone)]
pub struct Client {
    id: ClientId,
    runtime_id: i64,
    created: Timestamp,
    last_connected: Option<Timestamp>,
    timeout: Duration,
    pub software: Option<SoftwareInfo>,
    pub port_mapping: PortMapping,
    pub boot_mode: i32,
    pub api_version: ApiVersion,
}

impl Client {
    /// Create a builder for constructing a [`Client`].
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    #[must_use]
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    #[must_use]
    pub fn runtime_id(&self) -> i64 {
        self.runtime_id
    }

    #[must_use]
    pub fn created(&self) -> Timestamp {
        self.created
    }

    /// When the client was last heard from; `None` before its first activity.
    #[must_use]
    pub fn last_connected(&self) -> Option<Timestamp> {
        self.last_connected
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the client was heard from within its timeout.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active_at(now())
    }

    /// [`is_active`](Self::is_active) evaluated at an explicit instant.
    #[must_use]
    pub fn is_active_at(&self, at: Timestamp) -> bool {
        let timeout = TimeDelta::from_std(self.timeout).unwrap_or(TimeDelta::MAX);
        self.last_connected
            .is_some_and(|last| at.signed_duration_since(last) < timeout)
    }

    /// Record activity now.
    pub fn trigger_activity(&mut self) {
        self.trigger_activity_at(now());
    }

    /// Record activity at `at`. `last_connected` never moves backwards.
    pub fn trigger_activity_at(&mut self, at: Timestamp) {
        if self.last_connected.is_none_or(|last| at > last) {
            self.last_connected = Some(at);
        }
    }

    /// Record a new runtime id, the signal that the client rebooted.
    ///
    /// Leaves `id` and `created` untouched. Returns the previous runtime id.
    pub fn update_runtime_id(&mut self, runtime_id: i64) -> i64 {
        std::mem::replace(&mut self.runtime_id, runtime_id)
    }
}

/// Step-by-step builder for [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    id: Option<ClientId>,
    runtime_id: i64,
    created: Option<Timestamp>,
    timeout: Option<Duration>,
    software: Option<SoftwareInfo>,
    port_mapping: PortMapping,
    boot_mode: i32,
    api_version: ApiVersion,
}

impl ClientBuilder {
    #[must_use]
    pub fn id(mut self, id: ClientId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn runtime_id(mut self, runtime_id: i64) -> Self {
        self.runtime_id = runtime_id;
        self
    }

    #[must_use]
    pub fn created(mut self, created: Timestamp) -> Self {
        self.created = Some(created);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn software(mut self, software: SoftwareInfo) -> Self {
        self.software = Some(software);
        self
    }

    #[must_use]
    pub fn port_mapping(mut self, port_mapping: PortMapping) -> Self {
        self.port_mapping = port_mapping;
        self
    }

    #[must_use]
    pub fn boot_mode(mut self, boot_mode: i32) -> Self {
        self.boot_mode = boot_mode;
        self
    }

    #[must_use]
    pub fn api_version(mut self, api_version: ApiVersion) -> Self {
        self.api_version = api_version;
        self
    }

    /// Consume the builder and return a [`Client`] that has not been heard
    /// from yet.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if the id is missing.
    pub fn build(self) -> Result<Client, HubError> {
        Ok(Client {
            id: self.id.ok_or(ValidationError::EmptyId)?,
            runtime_id: self.runtime_id,
            created: self.created.unwrap_or_else(now),
            last_connected: None,
            timeout: self.timeout.unwrap_or(DEFAULT_ACTIVITY_TIMEOUT),
            software: self.software,
            port_mapping: self.port_mapping,
            boot_mode: self.boot_mode,
            api_version: self.api_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: &str) -> Client {
        Client::builder()
            .id(ClientId::new(id).unwrap())
            .runtime_id(42)
            .build()
            .unwrap()
    }

    #[test]
    fn should_be_inactive_before_any_activity() {
        let c1 = client("c1");
        assert!(!c1.is_active());
        assert!(c1.last_connected().is_none());
    }

    #[test]
    fn should_be_active_right_after_activity() {
        let mut c1 = client("c1");
        c1.trigger_activity();
        assert!(c1.is_active());
    }

    #[test]
    fn should_expire_exactly_at_timeout_boundary() {
        let mut c1 = client("c1");
        let start = now();
        c1.trigger_activity_at(start);

        let timeout = TimeDelta::from_std(DEFAULT_ACTIVITY_TIMEOUT).unwrap();
        let epsilon = TimeDelta::milliseconds(1);
        assert!(c1.is_active_at(start + timeout - epsilon));
        assert!(!c1.is_active_at(start + timeout + epsilon));
    }

    #[test]
    fn should_honour_custom_timeout() {
        let mut c1 = Client::builder()
            .id(ClientId::new("c1").unwrap())
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let start = now();
        c1.trigger_activity_at(start);
        assert!(c1.is_active_at(start + TimeDelta::milliseconds(1999)));
        assert!(!c1.is_active_at(start + TimeDelta::seconds(3)));
    }

    #[test]
    fn should_never_move_last_connected_backwards() {
        let mut c1 = client("c1");
        let later = now();
        c1.trigger_activity_at(later);
        c1.trigger_activity_at(later - TimeDelta::seconds(30));
        assert_eq!(c1.last_connected(), Some(later));
    }

    #[test]
    fn should_keep_id_and_created_when_runtime_id_changes() {
        let mut c1 = client("c1");
        let created = c1.created();

        let previous = c1.update_runtime_id(7);

        assert_eq!(previous, 42);
        assert_eq!(c1.runtime_id(), 7);
        assert_eq!(c1.id().as_str(), "c1");
        assert_eq!(c1.created(), created);
    }

    #[test]
    fn should_default_timeout_to_seventeen_seconds() {
        assert_eq!(client("c1").timeout(), Duration::from_secs(17));
    }

    #[test]
    fn should_drop_non_positive_and_non_numeric_port_keys() {
        let raw = serde_json::json!({"1": 17, "2": 18, "0": 3, "-4": 5, "tx": 9, "3": "pin"});
        let (mapping, warnings) = PortMapping::ingest(raw.as_object().unwrap());

        assert_eq!(mapping.iter().collect::<Vec<_>>(), vec![(1, 17), (2, 18)]);
        assert_eq!(warnings.len(), 4);
        assert!(warnings.iter().any(|w| w.key == "3" && w.reason == "value is not an integer"));
    }

    #[test]
    fn should_parse_and_display_api_version() {
        let version: ApiVersion = "1.2.3".parse().unwrap();
        assert_eq!(version, ApiVersion::new(1, 2, 3));
        assert_eq!(version.to_string(), "1.2.3");
        assert!(ApiVersion::new(1, 10, 0) > ApiVersion::new(1, 9, 9));
    }

    #[test]
    fn should_reject_malformed_api_version() {
        for raw in ["1.2", "1.2.3.4", "a.b.c", ""] {
            assert!(raw.parse::<ApiVersion>().is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn should_serialize_api_version_as_string() {
        let json = serde_json::to_string(&ApiVersion::new(0, 4, 1)).unwrap();
        assert_eq!(json, "\"0.4.1\"");
        let parsed: ApiVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ApiVersion::new(0, 4, 1));
    }
}
