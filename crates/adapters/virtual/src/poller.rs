//! Background loop mirroring the receiver panel into its gadget.
//!
//! Only what moved on the panel since the previous reading is pushed, so
//! values set through the API stay in place until someone touches the panel.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use gadgethub_domain::error::DomainValueError;
use gadgethub_domain::gadget::{AttributeChange, Gadget};
use tokio::task::JoinHandle;

use crate::devices::{PanelReading, ReceiverPanel};

/// Reads the panel and pushes what changed through the gadget's setters.
#[derive(Debug)]
pub struct ReceiverPoller {
    panel: Arc<ReceiverPanel>,
    gadget: Arc<Gadget>,
    interval: Duration,
    last: Mutex<PanelReading>,
}

impl ReceiverPoller {
    /// The current panel reading becomes the baseline for change detection.
    #[must_use]
    pub fn new(panel: Arc<ReceiverPanel>, gadget: Arc<Gadget>, interval: Duration) -> Self {
        let last = Mutex::new(panel.read());
        Self {
            panel,
            gadget,
            interval,
            last,
        }
    }

    /// Spawn the polling loop.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        tracing::info!(
            gadget = %self.gadget.id(),
            interval = ?self.interval,
            "receiver poller started"
        );
        loop {
            if let Err(err) = self.poll_once() {
                tracing::warn!(gadget = %self.gadget.id(), error = %err, "receiver poll failed");
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Apply what changed on the panel since the previous reading. Returns
    /// whether the gadget changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the panel reports an input the gadget does not know.
    pub fn poll_once(&self) -> Result<bool, DomainValueError> {
        let reading = self.panel.read();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let mut changes = Vec::new();
        if reading.power != last.power {
            changes.push(AttributeChange::Status(reading.power));
        }
        if reading.input != last.input {
            changes.push(AttributeChange::Source(ReceiverPanel::source(&reading)));
        }
        *last = reading.clone();
        drop(last);
        if changes.is_empty() {
            return Ok(false);
        }

        let changed = self.gadget.apply(&changes)?;
        if changed {
            tracing::debug!(
                gadget = %self.gadget.id(),
                power = reading.power,
                input = %reading.input,
                "receiver panel changed"
            );
        }
        Ok(changed)
    }
}
