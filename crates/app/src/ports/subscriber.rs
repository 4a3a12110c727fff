//! Subscriber port — receives gadget updates from the registry.

use gadgethub_domain::error::HubError;
use gadgethub_domain::gadget::Gadget;
use gadgethub_domain::update::ChangeSet;

/// One flushed gadget update: the live gadget plus the bits that changed.
#[derive(Debug, Clone, Copy)]
pub struct GadgetUpdate<'a> {
    pub gadget: &'a Gadget,
    pub changes: &'a ChangeSet,
}

/// Something that wants to hear about every gadget change.
///
/// Subscribers are called synchronously from the thread whose setter flushed
/// the change, after the subscriber list lock has been released. They must
/// not mutate the gadget they are handed.
pub trait GadgetSubscriber: Send + Sync {
    /// Name used in logs when delivery fails.
    fn name(&self) -> &str;

    /// Handle one update.
    ///
    /// # Errors
    ///
    /// Any error is logged by the registry; other subscribers still receive
    /// the update.
    fn receive_update(&self, update: &GadgetUpdate<'_>) -> Result<(), HubError>;
}
