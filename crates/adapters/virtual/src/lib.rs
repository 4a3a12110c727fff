//! # gadgethub-adapter-virtual
//!
//! Virtual local driver for testing and demonstration.
//!
//! Registers three local gadgets:
//!
//! - an RGB lamp (`virtual_lamp`)
//! - a fan (`virtual_fan`)
//! - an AV receiver (`virtual_receiver`) backed by a simulated front panel
//!
//! The lamp and fan only change through the API. The receiver panel can be
//! operated out of band (see [`VirtualDriver::panel`]) and a background
//! poller mirrors it into the gadget, which broadcasts like any other change.

pub mod config;
pub mod devices;
pub mod poller;

use std::sync::Arc;

use gadgethub_app::gadget_registry::GadgetRegistry;
use gadgethub_app::ports::LocalDriver;
use gadgethub_domain::error::HubError;
use gadgethub_domain::gadget::Gadget;
use gadgethub_domain::id::GadgetId;
use tokio::task::JoinHandle;

pub use config::VirtualConfig;
pub use devices::{PanelReading, ReceiverPanel};
pub use poller::ReceiverPoller;

/// Local driver exposing simulated gadgets.
pub struct VirtualDriver {
    config: VirtualConfig,
    panel: Arc<ReceiverPanel>,
    receiver: Option<Arc<Gadget>>,
    poll_handle: Option<JoinHandle<()>>,
}

impl VirtualDriver {
    #[must_use]
    pub fn new(config: VirtualConfig) -> Self {
        let panel = Arc::new(ReceiverPanel::new(config.receiver_inputs.clone()));
        Self {
            config,
            panel,
            receiver: None,
            poll_handle: None,
        }
    }

    /// Handle on the simulated receiver panel.
    #[must_use]
    pub fn panel(&self) -> Arc<ReceiverPanel> {
        Arc::clone(&self.panel)
    }

    /// Whether the background poller is running.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poll_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Default for VirtualDriver {
    fn default() -> Self {
        Self::new(VirtualConfig::default())
    }
}

impl LocalDriver for VirtualDriver {
    fn name(&self) -> &'static str {
        "virtual"
    }

    fn setup(&mut self, gadgets: &GadgetRegistry) -> Result<Vec<GadgetId>, HubError> {
        let lamp = gadgets.add(devices::lamp()?)?;
        let fan = gadgets.add(devices::fan(self.config.fan_steps)?)?;
        let receiver = gadgets.add(devices::receiver(&self.panel)?)?;

        let ids = vec![lamp.id().clone(), fan.id().clone(), receiver.id().clone()];
        self.receiver = Some(receiver);

        tracing::info!(count = ids.len(), "virtual gadgets registered");
        Ok(ids)
    }

    async fn start_background(&mut self) -> Result<(), HubError> {
        let Some(receiver) = &self.receiver else {
            tracing::warn!("virtual driver started before setup, nothing to poll");
            return Ok(());
        };
        if self.poll_handle.is_some() {
            return Ok(());
        }
        let poller = ReceiverPoller::new(
            Arc::clone(&self.panel),
            Arc::clone(receiver),
            self.config.poll_interval,
        );
        self.poll_handle = Some(poller.start());
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), HubError> {
        if let Some(handle) = self.poll_handle.take() {
            handle.abort();
            tracing::info!("virtual receiver poller stopped");
        }
        Ok(())
    }
}
