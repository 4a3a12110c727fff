//! # gadgethubd — gadgethub daemon
//!
//! Composition root that wires everything together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Build the client and gadget registries, the codec and the applier
//! - Subscribe the API broadcaster to the gadget registry so every gadget
//!   change reaches the outbound bus
//! - Set up local drivers and start their polling
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT), then tear drivers down
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use gadgethub_adapter_http_axum::state::AppState;
use gadgethub_adapter_virtual::VirtualDriver;
use gadgethub_app::api::{ApiBroadcaster, ApiHandler};
use gadgethub_app::applier::UpdateApplier;
use gadgethub_app::client_registry::ClientRegistry;
use gadgethub_app::codec::GadgetCodec;
use gadgethub_app::event_bus::InProcessBus;
use gadgethub_app::gadget_registry::GadgetRegistry;
use gadgethub_app::ports::LocalDriver;
use gadgethub_app::services::hub_service::HubService;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter '{}': {err}", config.logging.filter);
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Registries
    let clients = Arc::new(ClientRegistry::new(config.activity_timeout()));
    let gadgets = GadgetRegistry::new();

    // Wire format and update dispatch
    let codec = Arc::new(GadgetCodec::standard(Arc::clone(&clients))?);
    let applier = Arc::new(UpdateApplier::standard(Arc::clone(&gadgets))?);

    // Outbound bus
    let bus = Arc::new(InProcessBus::new(config.bus.capacity));
    gadgets.subscribe(Arc::new(ApiBroadcaster::new(
        Arc::clone(&codec),
        Arc::clone(&bus),
    )));

    // Services
    let service = HubService::new(
        Arc::clone(&clients),
        Arc::clone(&gadgets),
        codec,
        Arc::clone(&bus),
    )
    .with_ack_timeout(config.ack_timeout());

    // Local drivers
    let mut driver = config
        .integrations
        .virtual_enabled
        .then(|| VirtualDriver::new(config.virtual_driver()));
    if let Some(driver) = driver.as_mut() {
        let ids = driver
            .setup(&gadgets)
            .with_context(|| format!("failed to set up {} driver", driver.name()))?;
        tracing::info!(driver = driver.name(), gadgets = ids.len(), "driver ready");
        driver.start_background().await?;
    }

    // HTTP
    let state = AppState::new(ApiHandler::new(Arc::new(service), applier), bus);
    let app = gadgethub_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(%bind_addr, "gadgethubd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(driver) = driver.as_mut() {
        driver.teardown().await?;
    }
    tracing::info!("gadgethubd stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
