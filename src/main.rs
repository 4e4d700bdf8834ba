//! Main entry point for the coordinator server.
//!
//! Initializes the actor system, starts the coordinator actor that owns all
//! session state, and launches the HTTP server with the WebSocket endpoint.

use actix::Actor;
use actix_web::{web, App, HttpServer};

use server::coordinator::server::Coordinator;

pub mod config;
mod game;
mod server;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger from environment variable (default to info level).
    env_logger::init();

    // Start the coordinator actor. No persistence collaborator is wired by
    // default; terminal results are handed over only when a sink is set.
    let coordinator = Coordinator::new(None).start();

    // Shared application state for HTTP/WebSocket handlers.
    let state = web::Data::new(server::state::AppState::new(coordinator));

    // Start the HTTP server with the WebSocket endpoint.
    HttpServer::new(move || {
        App::new()
            .wrap(
                actix_web::middleware::DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Headers", "*")),
            )
            .app_data(state.clone())
            .configure(crate::server::router::config)
    })
    .bind(("127.0.0.1", 8080))?
    .run()
    .await
}
