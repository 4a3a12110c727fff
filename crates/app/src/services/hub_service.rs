//! Hub service — client lifecycle use-cases: heartbeat, full sync, removal,
//! remote gadget registration and ping.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value, json};

use gadgethub_domain::client::{ApiVersion, Client, PortMapping, SoftwareInfo};
use gadgethub_domain::error::{AlreadyExistsError, HubError, NotFoundError, ValidationError};
use gadgethub_domain::gadget::Gadget;
use gadgethub_domain::id::{ClientId, GadgetId};
use gadgethub_domain::time::parse_wire;

use crate::ack::PendingAcks;
use crate::client_registry::{ClientMetadata, ClientRegistry};
use crate::codec::GadgetCodec;
use crate::gadget_registry::GadgetRegistry;
use crate::ports::{BroadcastPublisher, OutboundMessage};

/// How long [`HubService::ping_client`] waits for an acknowledgement by default.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Path of the message asking a client to acknowledge a ping.
pub const PING_PATH: &str = "client/ping";

/// Body of a `client/heartbeat` request.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeartbeatRequest {
    pub id: String,
    pub runtime_id: i64,
}

/// Firmware details reported on sync.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SoftwareReport {
    pub commit: String,
    pub branch: String,
    pub uploaded: String,
}

impl SoftwareReport {
    fn into_info(self) -> Result<SoftwareInfo, ValidationError> {
        let uploaded = parse_wire(&self.uploaded).ok_or_else(|| {
            ValidationError::MalformedPayload(format!(
                "invalid upload timestamp '{}'",
                self.uploaded
            ))
        })?;
        Ok(SoftwareInfo {
            commit: self.commit,
            branch: self.branch,
            uploaded,
        })
    }
}

/// Body of a `client/sync` request: everything a client knows about itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSyncRequest {
    pub id: String,
    pub runtime_id: i64,
    #[serde(default)]
    pub boot_mode: i32,
    #[serde(default)]
    pub api_version: Option<ApiVersion>,
    #[serde(default)]
    pub software: Option<SoftwareReport>,
    #[serde(default)]
    pub port_mapping: Map<String, Value>,
    #[serde(default)]
    pub gadgets: Vec<Value>,
}

/// What a heartbeat told the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heartbeat {
    /// First contact; the client was created.
    Registered,
    /// Known client, same runtime id.
    Alive,
    /// Known client with a new runtime id: it rebooted and should sync.
    Rebooted { previous_runtime_id: i64 },
}

/// What happened to one announced gadget during a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Added,
    Updated,
    Unchanged,
    /// Taken over from an inactive host.
    Moved,
    /// Re-created because its class or fixed layout changed.
    Replaced,
}

/// A gadget that could not be synced.
#[derive(Debug)]
pub struct SyncFailure {
    pub id: Option<String>,
    pub error: HubError,
}

/// Per-gadget results of a full client sync.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub added: Vec<GadgetId>,
    pub updated: Vec<GadgetId>,
    pub unchanged: Vec<GadgetId>,
    pub moved: Vec<GadgetId>,
    pub replaced: Vec<GadgetId>,
    pub removed: Vec<GadgetId>,
    pub failed: Vec<SyncFailure>,
}

impl SyncReport {
    fn record(&mut self, id: GadgetId, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Added => self.added.push(id),
            SyncOutcome::Updated => self.updated.push(id),
            SyncOutcome::Unchanged => self.unchanged.push(id),
            SyncOutcome::Moved => self.moved.push(id),
            SyncOutcome::Replaced => self.replaced.push(id),
        }
    }

    /// One-line summary for logs and responses.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} added, {} updated, {} moved, {} replaced, {} removed, {} failed",
            self.added.len(),
            self.updated.len(),
            self.moved.len(),
            self.replaced.len(),
            self.removed.len(),
            self.failed.len()
        )
    }
}

/// Application service for client lifecycle and remote gadgets.
///
/// Heartbeats, syncs, client removal and gadget registration are serialized,
/// so a remote gadget is never left behind by a client being removed.
pub struct HubService<P> {
    clients: Arc<ClientRegistry>,
    gadgets: Arc<GadgetRegistry>,
    codec: Arc<GadgetCodec>,
    publisher: P,
    acks: PendingAcks,
    ack_timeout: Duration,
    lifecycle: Mutex<()>,
}

impl<P: BroadcastPublisher> HubService<P> {
    /// Create a new service over the shared registries.
    pub fn new(
        clients: Arc<ClientRegistry>,
        gadgets: Arc<GadgetRegistry>,
        codec: Arc<GadgetCodec>,
        publisher: P,
    ) -> Self {
        Self {
            clients,
            gadgets,
            codec,
            publisher,
            acks: PendingAcks::new(),
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            lifecycle: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    #[must_use]
    pub fn clients(&self) -> &Arc<ClientRegistry> {
        &self.clients
    }

    #[must_use]
    pub fn gadgets(&self) -> &Arc<GadgetRegistry> {
        &self.gadgets
    }

    #[must_use]
    pub fn codec(&self) -> &Arc<GadgetCodec> {
        &self.codec
    }

    /// Record a heartbeat, creating the client on first contact.
    ///
    /// A changed runtime id means the client rebooted. The new id is stored
    /// and the event logged; the client is expected to follow up with a full
    /// sync.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] for an empty id.
    #[tracing::instrument(skip(self))]
    pub fn heartbeat(&self, id: &str, runtime_id: i64) -> Result<Heartbeat, HubError> {
        let _guard = self.lifecycle();
        let outcome = if self.clients.contains(id) {
            let previous = self.clients.update_runtime_id(id, runtime_id)?;
            if previous == runtime_id {
                Heartbeat::Alive
            } else {
                tracing::warn!(
                    previous,
                    runtime_id,
                    "client runtime id changed, waiting for full sync"
                );
                Heartbeat::Rebooted {
                    previous_runtime_id: previous,
                }
            }
        } else {
            match self.register_client(id, runtime_id) {
                Ok(()) => {
                    tracing::info!("client registered from heartbeat");
                    Heartbeat::Registered
                }
                // the client registry is shared, another writer got there first
                Err(HubError::AlreadyExists(_)) => {
                    self.clients.update_runtime_id(id, runtime_id)?;
                    Heartbeat::Alive
                }
                Err(err) => return Err(err),
            }
        };
        self.clients.trigger_activity(id)?;
        Ok(outcome)
    }

    /// Bring the hub in line with everything a client reports about itself.
    ///
    /// Client metadata is replaced. Announced gadgets are added, updated
    /// through their setters, or replaced when their layout changed; hosted
    /// gadgets the client no longer announces are removed. A gadget that
    /// fails is logged and reported, and does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when the client part of the request is
    /// invalid; nothing is changed in that case.
    #[tracing::instrument(skip(self, request), fields(client = %request.id))]
    pub fn sync_client(&self, request: ClientSyncRequest) -> Result<SyncReport, HubError> {
        let client_id = ClientId::new(request.id)?;
        let id = client_id.as_str();
        let (port_mapping, warnings) = PortMapping::ingest(&request.port_mapping);
        for warning in &warnings {
            tracing::warn!(
                key = %warning.key,
                reason = warning.reason,
                "dropped port mapping entry"
            );
        }
        let metadata = ClientMetadata {
            software: request.software.map(SoftwareReport::into_info).transpose()?,
            port_mapping,
            boot_mode: request.boot_mode,
            api_version: request.api_version.unwrap_or_default(),
        };

        let _guard = self.lifecycle();
        if self.clients.contains(id) {
            let previous = self.clients.update_runtime_id(id, request.runtime_id)?;
            if previous != request.runtime_id {
                tracing::info!(previous, runtime_id = request.runtime_id, "client rebooted");
            }
        } else {
            self.register_client(id, request.runtime_id)?;
        }
        self.clients.update_metadata(id, metadata)?;
        self.clients.trigger_activity(id)?;

        let mut report = SyncReport::default();
        let mut announced = BTreeSet::new();
        for raw in &request.gadgets {
            let raw_id = raw.get("id").and_then(Value::as_str).map(str::to_string);
            if let Some(raw_id) = &raw_id {
                announced.insert(raw_id.clone());
            }
            match self.sync_gadget(&client_id, raw) {
                Ok((gadget, outcome)) => report.record(gadget, outcome),
                Err(error) => {
                    tracing::warn!(
                        gadget = raw_id.as_deref().unwrap_or("<missing id>"),
                        error = %error,
                        "failed to sync gadget"
                    );
                    report.failed.push(SyncFailure { id: raw_id, error });
                }
            }
        }

        for stale in self.gadgets.hosted_by(&client_id) {
            if !announced.contains(stale.id().as_str())
                && self.gadgets.remove(stale.id().as_str()).is_ok()
            {
                report.removed.push(stale.id().clone());
            }
        }

        tracing::info!(summary = %report.summary(), "client synced");
        Ok(report)
    }

    /// Remove a client and every gadget it hosts.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when the client is unknown.
    #[tracing::instrument(skip(self))]
    pub fn remove_client(&self, id: &str) -> Result<Vec<GadgetId>, HubError> {
        let _guard = self.lifecycle();
        let client = self.clients.remove(id)?;
        let removed: Vec<GadgetId> = self
            .gadgets
            .remove_hosted_by(client.id())
            .iter()
            .map(|gadget| gadget.id().clone())
            .collect();
        tracing::info!(gadgets = removed.len(), "client removed");
        Ok(removed)
    }

    /// Register a gadget; a remote gadget's host must be a known client.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] for an unknown host and
    /// [`HubError::AlreadyExists`] for a taken id.
    pub fn add_gadget(&self, gadget: Gadget) -> Result<Arc<Gadget>, HubError> {
        let _guard = self.lifecycle();
        if let Some(host) = gadget.host()
            && !self.clients.contains(host.as_str())
        {
            return Err(NotFoundError {
                kind: "Client",
                id: host.to_string(),
            }
            .into());
        }
        self.gadgets.add(gadget)
    }

    /// Ask a client to acknowledge and wait for the answer.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] for an unknown client and
    /// [`HubError::NoResponse`] when the client stays silent.
    #[tracing::instrument(skip(self))]
    pub async fn ping_client(&self, id: &str) -> Result<Value, HubError> {
        if !self.clients.contains(id) {
            return Err(NotFoundError {
                kind: "Client",
                id: id.to_string(),
            }
            .into());
        }
        let ticket = self.acks.register();
        let message = OutboundMessage::new(
            PING_PATH,
            json!({ "id": id, "token": ticket.token() }),
        );
        if self.publisher.publish(message) == 0 {
            tracing::debug!("no transport listening for ping");
        }
        let payload = ticket.wait(self.ack_timeout).await?;
        self.clients.trigger_activity(id)?;
        Ok(payload)
    }

    /// Complete an outstanding ping.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when the token is unknown or expired.
    pub fn acknowledge(&self, token: &str, payload: Value) -> Result<(), HubError> {
        if self.acks.acknowledge(token, payload) {
            Ok(())
        } else {
            Err(NotFoundError {
                kind: "Acknowledgement",
                id: token.to_string(),
            }
            .into())
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register_client(&self, id: &str, runtime_id: i64) -> Result<(), HubError> {
        let client = Client::builder()
            .id(ClientId::new(id)?)
            .runtime_id(runtime_id)
            .timeout(self.clients.activity_timeout())
            .build()?;
        self.clients.add(client)
    }

    fn sync_gadget(
        &self,
        host: &ClientId,
        raw: &Value,
    ) -> Result<(GadgetId, SyncOutcome), HubError> {
        let announced = self.codec.decode(raw, Some(host.clone()))?;
        let id = announced.id().clone();
        let existing = match self.gadgets.get(id.as_str()) {
            Ok(existing) => existing,
            Err(HubError::NotFound(_)) => {
                self.gadgets.add(announced)?;
                return Ok((id, SyncOutcome::Added));
            }
            Err(err) => return Err(err),
        };

        let moved = match existing.host() {
            Some(current) if current == *host => false,
            Some(current) if !self.clients.is_active(current.as_str()).unwrap_or(false) => {
                tracing::info!(
                    gadget = %id,
                    from = %current,
                    "moving gadget from inactive host"
                );
                existing.set_host(host.clone())?;
                true
            }
            _ => {
                return Err(AlreadyExistsError {
                    kind: "Gadget",
                    id: id.to_string(),
                }
                .into());
            }
        };

        let wanted = announced.snapshot();
        if !existing.snapshot().kind.same_shape(&wanted.kind) {
            self.gadgets.remove(id.as_str())?;
            self.gadgets.add(announced)?;
            return Ok((id, SyncOutcome::Replaced));
        }

        let changed = existing.apply(&wanted.as_changes())?;
        let outcome = match (moved, changed) {
            (true, _) => SyncOutcome::Moved,
            (false, true) => SyncOutcome::Updated,
            (false, false) => SyncOutcome::Unchanged,
        };
        Ok((id, outcome))
    }
}
