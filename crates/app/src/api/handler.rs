//! Executes API routes and answers each accepted request exactly once.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use gadgethub_domain::error::{HubError, ValidationError};

use crate::api::{ApiResponse, Route};
use crate::applier::UpdateApplier;
use crate::codec::encode_client;
use crate::ports::{BroadcastPublisher, Request};
use crate::services::hub_service::{ClientSyncRequest, Heartbeat, HeartbeatRequest, HubService};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct IdRequest {
    id: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AckRequest {
    token: String,
    #[serde(default)]
    payload: Value,
}

/// Routes requests to the hub service, the update applier and the codec.
pub struct ApiHandler<P> {
    service: Arc<HubService<P>>,
    applier: Arc<UpdateApplier>,
}

impl<P> Clone for ApiHandler<P> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            applier: Arc::clone(&self.applier),
        }
    }
}

impl<P: BroadcastPublisher> ApiHandler<P> {
    pub fn new(service: Arc<HubService<P>>, applier: Arc<UpdateApplier>) -> Self {
        Self { service, applier }
    }

    #[must_use]
    pub fn service(&self) -> &Arc<HubService<P>> {
        &self.service
    }

    /// Handle a request if its path is routed.
    ///
    /// Returns `false`, without responding, for unknown paths. Otherwise the
    /// request is answered exactly once, with data or with the envelope.
    pub fn handle<R: Request>(&self, request: R) -> bool {
        let Some(route) = Route::from_path(request.path()) else {
            tracing::debug!(path = request.path(), "no route for path");
            return false;
        };
        let response = self.execute(route, request.payload());
        request.respond(response);
        true
    }

    /// Run a route and render its answer.
    #[must_use]
    pub fn execute(&self, route: Route, payload: &Value) -> Value {
        match self.dispatch(route, payload) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(
                    route = %route,
                    error_type = err.error_type(),
                    error = %err,
                    "request failed"
                );
                ApiResponse::from_error(&err).into_value()
            }
        }
    }

    fn dispatch(&self, route: Route, payload: &Value) -> Result<Value, HubError> {
        let gadgets = self.service.gadgets();
        let clients = self.service.clients();
        let codec = self.service.codec();
        match route {
            Route::GadgetUpdate => {
                self.applier.apply_payload(payload)?;
                Ok(ApiResponse::ok().into_value())
            }
            Route::GadgetGet => {
                let IdRequest { id } = parse(payload)?;
                let gadget = gadgets.get(&id)?;
                Ok(json!({ "gadget": codec.encode(&gadget)? }))
            }
            Route::GadgetList => {
                let all = gadgets.list();
                let batch = codec.encode_all(all.iter().map(Arc::as_ref));
                Ok(json!({ "gadgets": batch.payloads }))
            }
            Route::ClientGet => {
                let IdRequest { id } = parse(payload)?;
                Ok(json!({ "client": encode_client(&clients.get(&id)?) }))
            }
            Route::ClientList => {
                let all: Vec<Value> = clients.list().iter().map(encode_client).collect();
                Ok(json!({ "clients": all }))
            }
            Route::ClientHeartbeat => {
                let HeartbeatRequest { id, runtime_id } = parse(payload)?;
                let response = match self.service.heartbeat(&id, runtime_id)? {
                    Heartbeat::Alive | Heartbeat::Registered => ApiResponse::ok(),
                    Heartbeat::Rebooted { .. } => {
                        ApiResponse::ok_with(format!("Client '{id}' rebooted, full sync required"))
                    }
                };
                Ok(response.into_value())
            }
            Route::ClientSync => {
                let request: ClientSyncRequest = parse(payload)?;
                let id = request.id.clone();
                let report = self.service.sync_client(request)?;
                Ok(ApiResponse::ok_with(format!("Synced client '{id}': {}", report.summary()))
                    .into_value())
            }
            Route::ClientRemove => {
                let IdRequest { id } = parse(payload)?;
                let removed = self.service.remove_client(&id)?;
                Ok(ApiResponse::ok_with(format!(
                    "Removed client '{id}' and {} gadgets",
                    removed.len()
                ))
                .into_value())
            }
            Route::ClientAck => {
                let AckRequest { token, payload } = parse(payload)?;
                self.service.acknowledge(&token, payload)?;
                Ok(ApiResponse::ok().into_value())
            }
        }
    }
}

fn parse<T: DeserializeOwned>(payload: &Value) -> Result<T, ValidationError> {
    T::deserialize(payload).map_err(|err| ValidationError::MalformedPayload(err.to_string()))
}
