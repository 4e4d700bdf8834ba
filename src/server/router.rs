//! HTTP and WebSocket routing configuration.
//!
//! A single WebSocket endpoint carries the whole protocol; matchmaking,
//! moves, and recovery are distinguished by the event envelope, not by URL.

use actix_web::web;

use crate::server::session::ws_connect;

/// Configure the application's routes.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").to(ws_connect));
}
