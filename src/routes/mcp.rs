use std::sync::Arc;
use std::time::Duration;

use actix_web::http::header;
use actix_web::web::{self, Bytes};
use actix_web::{HttpRequest, HttpResponse};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mcp::{
    CallToolRequest, JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpDispatcher, ProgressEvent,
};

const PROGRESS_STEPS: usize = 3;
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);
const EVENT_STREAM: &str = "text/event-stream";

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    #[serde(default)]
    pub stream: Option<String>,
}

fn wants_stream(req: &HttpRequest) -> bool {
    let accepts_events = req
        .headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains(EVENT_STREAM))
        .unwrap_or(false);
    let query = web::Query::<StreamQuery>::from_query(req.query_string())
        .map(|q| q.into_inner())
        .unwrap_or_default();

    accepts_events || query.stream.as_deref() == Some("true")
}

/// JSON-RPC over HTTP, optionally answered as server-sent events.
#[tracing::instrument(name = "MCP HTTP request", skip(req, body, dispatcher))]
pub async fn mcp_post(
    req: HttpRequest,
    body: Bytes,
    dispatcher: web::Data<Arc<McpDispatcher>>,
) -> HttpResponse {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!("Failed to parse JSON-RPC body: {}", err);
            return HttpResponse::BadRequest()
                .json(JsonRpcResponse::error(None, JsonRpcError::parse_error()));
        }
    };
    let id = value.get("id").cloned();
    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!("Body is not a JSON-RPC request: {}", err);
            return HttpResponse::BadRequest()
                .json(JsonRpcResponse::error(id, JsonRpcError::invalid_request()));
        }
    };

    let streaming = wants_stream(&req);
    let progress_tool = progress_tool(&request);

    let Some(response) = dispatcher.handle(request).await else {
        return HttpResponse::Accepted().finish();
    };

    if !streaming {
        return HttpResponse::Ok().json(response);
    }

    let steps = if progress_tool.is_some() { PROGRESS_STEPS } else { 0 };
    let tool = progress_tool.unwrap_or_default();
    let first = sse_event(&response);
    let progress = stream::unfold(1usize, move |step| {
        let tool = tool.clone();
        async move {
            if step > steps {
                return None;
            }
            tokio::time::sleep(PROGRESS_INTERVAL).await;
            Some((sse_event(&ProgressEvent::new(&tool, step, PROGRESS_STEPS)), step + 1))
        }
    });

    HttpResponse::Ok()
        .content_type(EVENT_STREAM)
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(stream::once(async move { first }).chain(progress))
}

/// Name of the tool a `tools/call` request targets, if it parses.
fn progress_tool(request: &JsonRpcRequest) -> Option<String> {
    if request.method != "tools/call" {
        return None;
    }
    request
        .params
        .clone()
        .and_then(|p| serde_json::from_value::<CallToolRequest>(p).ok())
        .map(|call| call.name)
}

fn sse_event<T: Serialize>(payload: &T) -> Result<Bytes, serde_json::Error> {
    let data = serde_json::to_string(payload)?;
    Ok(Bytes::from(format!("data: {}\n\n", data)))
}
