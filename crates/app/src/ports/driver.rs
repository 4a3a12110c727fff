//! Local driver port — lifecycle of code that owns local gadgets.
//!
//! A driver bridges some piece of hardware (or a simulation of it) into the
//! hub. It registers its gadgets on startup and keeps them in sync with the
//! hardware, always through the gadgets' setters.

use std::future::Future;

use gadgethub_domain::error::HubError;
use gadgethub_domain::id::GadgetId;

use crate::gadget_registry::GadgetRegistry;

/// A pluggable local driver.
///
/// The binary crate calls the lifecycle methods in order:
///
/// 1. [`setup`](Self::setup) — register local gadgets
/// 2. [`start_background`](Self::start_background) — spawn polling tasks
/// 3. [`teardown`](Self::teardown) — stop them on shutdown
pub trait LocalDriver {
    /// Unique name identifying this driver (e.g. `"virtual"`).
    fn name(&self) -> &'static str;

    /// Register the driver's gadgets and return their ids.
    ///
    /// # Errors
    ///
    /// Returns an error if a gadget cannot be built or its id is taken.
    fn setup(&mut self, gadgets: &GadgetRegistry) -> Result<Vec<GadgetId>, HubError>;

    /// Start long-running polling. The default implementation is a no-op.
    fn start_background(&mut self) -> impl Future<Output = Result<(), HubError>> + Send {
        async { Ok(()) }
    }

    /// Called on graceful shutdown.
    fn teardown(&mut self) -> impl Future<Output = Result<(), HubError>> + Send;
}
