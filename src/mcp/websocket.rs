use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::dispatch::McpDispatcher;
use super::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use super::session::McpSession;

/// WebSocket heartbeat interval
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
/// Client timeout - close connection if no heartbeat received
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// MCP WebSocket actor
pub struct McpWebSocket {
    session: McpSession,
    dispatcher: Arc<McpDispatcher>,
    hb: Instant,
}

impl McpWebSocket {
    pub fn new(dispatcher: Arc<McpDispatcher>) -> Self {
        Self {
            session: McpSession::new(),
            dispatcher,
            hb: Instant::now(),
        }
    }

    /// Start heartbeat process to check connection health
    fn hb(&self, ctx: &mut <Self as Actor>::Context) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!("MCP WebSocket client heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }

            ctx.ping(b"");
        });
    }
}

impl Actor for McpWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "MCP WebSocket connection started: session_id={}",
            self.session.id
        );
        self.hb(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(
            "MCP WebSocket connection closed: session_id={}, requests={}, age_secs={}",
            self.session.id,
            self.session.requests,
            self.session.age_secs()
        );
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for McpWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                tracing::debug!("[MCP] Received JSON-RPC message: {}", text);
                self.session.record_request();

                let request: JsonRpcRequest = match serde_json::from_str(&text) {
                    Ok(req) => req,
                    Err(e) => {
                        tracing::error!("[MCP] Failed to parse JSON-RPC request: {}", e);
                        ctx.address().do_send(SendResponse(JsonRpcResponse::error(
                            None,
                            JsonRpcError::parse_error(),
                        )));
                        return;
                    }
                };

                let dispatcher = self.dispatcher.clone();
                let addr = ctx.address();
                actix::spawn(async move {
                    if let Some(response) = dispatcher.handle(request).await {
                        addr.do_send(SendResponse(response));
                    } else {
                        tracing::debug!("[MCP] Dropped response for notification (no id)");
                    }
                });
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("Binary messages not supported in MCP protocol");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("MCP WebSocket close received: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Err(err) => {
                tracing::warn!("MCP WebSocket protocol error: {}", err);
                ctx.stop();
            }
            _ => {}
        }
    }
}

/// Message to send JSON-RPC response back to client
#[derive(actix::Message)]
#[rtype(result = "()")]
struct SendResponse(JsonRpcResponse);

impl actix::Handler<SendResponse> for McpWebSocket {
    type Result = ();

    fn handle(&mut self, msg: SendResponse, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg.0) {
            Ok(response_text) => {
                tracing::debug!(
                    "[MCP] Sending JSON-RPC response: id={:?}, has_result={}, has_error={}",
                    msg.0.id,
                    msg.0.result.is_some(),
                    msg.0.error.is_some(),
                );
                ctx.text(response_text);
            }
            Err(err) => tracing::error!("[MCP] Failed to serialize response: {}", err),
        }
    }
}

/// WebSocket route handler - entry point for MCP connections
#[tracing::instrument(name = "MCP WebSocket connection", skip(req, stream, dispatcher))]
pub async fn mcp_websocket(
    req: HttpRequest,
    stream: web::Payload,
    dispatcher: web::Data<Arc<McpDispatcher>>,
) -> Result<HttpResponse, Error> {
    tracing::info!("New MCP WebSocket connection request");

    ws::start(McpWebSocket::new(dispatcher.get_ref().clone()), &req, stream)
}
