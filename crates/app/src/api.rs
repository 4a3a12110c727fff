//! Request-level API — the exact-path route table, its handler, the response
//! envelope, and the subscriber that pushes gadget updates to transports.
//!
//! Transports (HTTP, sockets, …) wrap each inbound request in a
//! [`Request`](crate::ports::Request) and hand it to [`ApiHandler::handle`].
//! Commands answer with the [`ApiResponse`] envelope; queries answer with
//! data.

pub mod broadcaster;
pub mod handler;
pub mod response;
pub mod route;

pub use broadcaster::ApiBroadcaster;
pub use handler::ApiHandler;
pub use response::ApiResponse;
pub use route::Route;
