//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod driver;
pub mod publisher;
pub mod request;
pub mod subscriber;

pub use driver::LocalDriver;
pub use publisher::{BroadcastPublisher, OutboundMessage};
pub use request::Request;
pub use subscriber::{GadgetSubscriber, GadgetUpdate};
