//! Client registry — the set of clients known to the hub.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use gadgethub_domain::client::{
    ApiVersion, Client, DEFAULT_ACTIVITY_TIMEOUT, PortMapping, SoftwareInfo,
};
use gadgethub_domain::error::{AlreadyExistsError, HubError, NotFoundError};
use gadgethub_domain::id::ClientId;

/// Descriptive fields a client reports on a full sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMetadata {
    pub software: Option<SoftwareInfo>,
    pub port_mapping: PortMapping,
    pub boot_mode: i32,
    pub api_version: ApiVersion,
}

/// Thread-safe map of client id to [`Client`].
///
/// Readers get clones; every mutation happens under the registry lock.
pub struct ClientRegistry {
    clients: RwLock<BTreeMap<ClientId, Client>>,
    activity_timeout: Duration,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_TIMEOUT)
    }
}

impl ClientRegistry {
    /// Create an empty registry; new clients get `activity_timeout`.
    #[must_use]
    pub fn new(activity_timeout: Duration) -> Self {
        Self {
            clients: RwLock::new(BTreeMap::new()),
            activity_timeout,
        }
    }

    /// Activity timeout given to clients created by the hub.
    #[must_use]
    pub fn activity_timeout(&self) -> Duration {
        self.activity_timeout
    }

    /// Register a client.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::AlreadyExists`] when the id is taken; the registry
    /// is left unchanged.
    pub fn add(&self, client: Client) -> Result<(), HubError> {
        let mut clients = self.write();
        if clients.contains_key(client.id()) {
            return Err(AlreadyExistsError {
                kind: "Client",
                id: client.id().to_string(),
            }
            .into());
        }
        tracing::debug!(client = %client.id(), "client registered");
        clients.insert(client.id().clone(), client);
        Ok(())
    }

    /// Clone of the client registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when no such client exists.
    pub fn get(&self, id: &str) -> Result<Client, HubError> {
        self.read().get(id).cloned().ok_or_else(|| not_found(id))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Every client, ordered by id.
    #[must_use]
    pub fn list(&self) -> Vec<Client> {
        self.read().values().cloned().collect()
    }

    /// Unregister a client and return it.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when no such client exists.
    pub fn remove(&self, id: &str) -> Result<Client, HubError> {
        let removed = self.write().remove(id).ok_or_else(|| not_found(id))?;
        tracing::debug!(client = %removed.id(), "client removed");
        Ok(removed)
    }

    /// Record that the client was just heard from.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when no such client exists.
    pub fn trigger_activity(&self, id: &str) -> Result<(), HubError> {
        self.modify(id, Client::trigger_activity)
    }

    /// Store a new runtime id and return the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when no such client exists.
    pub fn update_runtime_id(&self, id: &str, runtime_id: i64) -> Result<i64, HubError> {
        let mut previous = runtime_id;
        self.modify(id, |client| previous = client.update_runtime_id(runtime_id))?;
        Ok(previous)
    }

    /// Whether the client was heard from within its activity timeout.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when no such client exists.
    pub fn is_active(&self, id: &str) -> Result<bool, HubError> {
        self.read()
            .get(id)
            .map(Client::is_active)
            .ok_or_else(|| not_found(id))
    }

    /// Replace the descriptive fields reported by the client.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when no such client exists.
    pub fn update_metadata(&self, id: &str, metadata: ClientMetadata) -> Result<(), HubError> {
        self.modify(id, move |client| {
            client.software = metadata.software;
            client.port_mapping = metadata.port_mapping;
            client.boot_mode = metadata.boot_mode;
            client.api_version = metadata.api_version;
        })
    }

    fn modify(&self, id: &str, f: impl FnOnce(&mut Client)) -> Result<(), HubError> {
        let mut clients = self.write();
        let client = clients.get_mut(id).ok_or_else(|| not_found(id))?;
        f(client);
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<ClientId, Client>> {
        self.clients.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<ClientId, Client>> {
        self.clients.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(id: &str) -> HubError {
    NotFoundError {
        kind: "Client",
        id: id.to_string(),
    }
    .into()
}
