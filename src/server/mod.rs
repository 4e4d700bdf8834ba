// src/server/mod.rs

//! Server layer root module.
//!
//! This module organizes the coordinator's server components, including:
//! - Application state and routing
//! - Per-connection WebSocket session actors
//! - The coordinator actor (registry, queue, session store, presence, reaper)
//! - The client-facing error taxonomy

pub mod coordinator;
pub mod error;
pub mod messages;
pub mod router;
pub mod session;
pub mod state;
pub mod ws_error;
