//! # gadgethub-domain
//!
//! Pure domain model for the gadgethub home automation hub.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error taxonomy, timestamps
//! - Define **Gadgets** (local or remote device capabilities with typed, validated setters)
//! - Define the **Update Container** (per-gadget dirty bits consumed by broadcasts)
//! - Define **Clients** (embedded devices hosting remote gadgets, with liveness)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! Registries, codecs and transports live in the `app` crate.

pub mod error;
pub mod id;
pub mod time;

pub mod client;
pub mod gadget;
pub mod update;
