//! # gadgethub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Carry API requests: `POST /api/{path}` with a JSON body is handed to
//!   the [`ApiHandler`](gadgethub_app::api::ApiHandler) as a request whose
//!   path is everything after `/api/`
//! - Stream broadcasts (`gadget/update`, `client/ping`, …) to listeners as
//!   Server-Sent Events on `GET /api/stream`
//! - Expose `POST /clients/{id}/ping`, which waits for the client's
//!   acknowledgement
//!
//! Handled requests always answer `200 OK`: success or failure travels in the
//! body, exactly as the API layer rendered it. Non-200 statuses are reserved
//! for transport problems (unknown path, body that is not JSON).
//!
//! ## Dependency rule
//! Depends on `gadgethub-app` (for the API handler and the bus) and
//! `gadgethub-domain` (for error types). Never leaks axum types into the
//! domain.

pub mod api;
pub mod error;
pub mod request;
pub mod router;
pub mod state;
