/// WebSocket session handler for one client connection.
///
/// This actor owns a single socket: it parses client frames into events and
/// relays them to the coordinator, and serializes coordinator events back to
/// the client. It holds no game state; the coordinator resolves the
/// connection id to this actor through the registry.
use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::error;
use uuid::Uuid;

use crate::server::coordinator::server::Coordinator;
use crate::server::coordinator::types::ConnectionId;
use crate::server::messages::{
    ClientEvent, ClientWsMessage, CloseSession, Connect, Disconnect, ServerWsMessage,
};
use crate::server::ws_error::ws_error_message;

pub struct ClientSession {
    pub connection: ConnectionId,
    pub coordinator: Addr<Coordinator>,
}

impl Actor for ClientSession {
    type Context = ws::WebsocketContext<Self>;

    /// Called when the socket opens. Hands the transport to the registry.
    fn started(&mut self, ctx: &mut Self::Context) {
        self.coordinator.do_send(Connect {
            connection: self.connection,
            session: ctx.address().recipient(),
            close: ctx.address().recipient(),
        });
    }

    /// Called when the socket closes for any reason. The coordinator routes
    /// this into presence handling rather than tearing the match down.
    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.coordinator.do_send(Disconnect {
            connection: self.connection,
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ClientSession {
    /// Handles incoming WebSocket frames from the client.
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                match serde_json::from_str::<ClientWsMessage>(&text) {
                    Ok(message) => {
                        self.coordinator.do_send(ClientEvent {
                            connection: self.connection,
                            message,
                        });
                    }
                    Err(_e) => {
                        // Malformed frames are a local, per-request failure.
                        ctx.text(ws_error_message(
                            "INVALID_MESSAGE",
                            "Invalid client message",
                            None,
                        ));
                    }
                }
            }
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Close(_)) => ctx.stop(),
            _ => (),
        }
    }
}

impl Handler<ServerWsMessage> for ClientSession {
    type Result = ();

    /// Serializes a coordinator event and writes it to the socket.
    fn handle(&mut self, msg: ServerWsMessage, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg) {
            Ok(text) => ctx.text(text),
            Err(e) => {
                error!("[Session] Failed to serialize server message: {}", e);
                ctx.text(ws_error_message(
                    "INTERNAL_ERROR",
                    "Internal server error",
                    None,
                ));
                ctx.close(Some(ws::CloseReason {
                    code: ws::CloseCode::Error,
                    description: Some("Internal server error".into()),
                }));
                ctx.stop();
            }
        }
    }
}

impl Handler<CloseSession> for ClientSession {
    type Result = ();

    /// Kicked by the coordinator: tell the client why, then close the socket.
    fn handle(&mut self, msg: CloseSession, ctx: &mut Self::Context) {
        ctx.text(ws_error_message("SESSION_CLOSED", &msg.reason, None));
        ctx.close(Some(ws::CloseReason {
            code: ws::CloseCode::Policy,
            description: Some(msg.reason),
        }));
        ctx.stop();
    }
}

/// WebSocket endpoint. Mints a fresh connection id per accepted socket;
/// player identity arrives later, inside the events themselves (the client
/// is authenticated upstream).
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<crate::server::state::AppState>,
) -> Result<HttpResponse, Error> {
    let connection = Uuid::new_v4();
    ws::start(
        ClientSession {
            connection,
            coordinator: data.coordinator.clone(),
        },
        &req,
        stream,
    )
}
