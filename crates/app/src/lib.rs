//! # gadgethub-app
//!
//! Application layer — registries, broadcasting, wire codecs, the update
//! applier and the request-level API, plus the **port definitions** (traits)
//! adapters implement.
//!
//! ## Responsibilities
//! - Define **port traits**:
//!   - `GadgetSubscriber` — receives every gadget update flushed by a setter
//!   - `Request` — one inbound API request, answered exactly once
//!   - `BroadcastPublisher` — outbound messages for transports to forward
//!   - `LocalDriver` — lifecycle of drivers owning local gadgets
//! - Own the **client registry** and the **gadget registry** (the single
//!   publish point for gadget updates)
//! - Encode and decode gadgets through explicit **dispatch tables**
//! - Apply inbound updates through class schemas
//! - Route API paths to handlers and render the response envelope
//! - Provide **in-process infrastructure** (broadcast bus, acknowledgement
//!   tracking) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `gadgethub-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ack;
pub mod api;
pub mod applier;
pub mod client_registry;
pub mod codec;
pub mod event_bus;
pub mod gadget_registry;
pub mod ports;
pub mod services;
