// src/server/coordinator/mod.rs

//! The coordinator and its components.
//!
//! One actor (`server::Coordinator`) owns four maps: live connections
//! (`registry`), waiting players (`queue`), active matches (`store`), and
//! durable player-to-match bindings (`presence`). The components are plain
//! structs; only the actor mutates them, so every operation is atomic with
//! respect to every other.

pub mod presence;
pub mod queue;
pub mod registry;
pub mod server;
pub mod store;
pub mod types;
