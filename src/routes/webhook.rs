use actix_web::web::{self, Bytes};
use actix_web::{HttpRequest, HttpResponse};

use super::sync::RemoteSync;
use crate::helpers::JsonResponse;
use crate::sync::webhook::{EVENT_HEADER, SIGNATURE_HEADER};
use crate::sync::WebhookError;

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// GitHub push webhook. Registered for POST only.
#[tracing::instrument(name = "GitHub webhook", skip(req, body, remote))]
pub async fn webhook_handler(
    req: HttpRequest,
    body: Bytes,
    remote: web::Data<RemoteSync>,
) -> Result<HttpResponse, WebhookError> {
    let Some(handler) = remote.get_ref() else {
        return Ok(
            JsonResponse::<()>::not_implemented("Webhook handler not configured").into_response(),
        );
    };

    let outcome = handler
        .handle(
            header(&req, EVENT_HEADER),
            header(&req, SIGNATURE_HEADER),
            &body,
        )
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "Webhook rejected");
            err
        })?;

    Ok(JsonResponse::<()>::ok(&outcome.message(), None).into_response())
}
