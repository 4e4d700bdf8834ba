// src/server/state.rs

//! Application state for the coordinator server.
//!
//! Holds the address of the coordinator actor, shared with every
//! HTTP/WebSocket handler.

use actix::Addr;

use crate::server::coordinator::server::Coordinator;

/// Shared application state, injected into HTTP/WebSocket handlers.
pub struct AppState {
    /// Address of the coordinator actor (owns all session state).
    pub coordinator: Addr<Coordinator>,
}

impl AppState {
    pub fn new(coordinator: Addr<Coordinator>) -> Self {
        AppState { coordinator }
    }
}
