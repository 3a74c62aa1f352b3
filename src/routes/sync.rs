use std::sync::Arc;

use actix_web::{post, web, HttpResponse};

use crate::helpers::JsonResponse;
use crate::sync::{SyncError, WebhookHandler};

/// Remote sync wiring shared by `/api/sync` and `/webhook`; `None` when `GITHUB_REPO` is unset.
pub type RemoteSync = Option<Arc<WebhookHandler>>;

#[tracing::instrument(name = "Manual sync", skip(remote))]
#[post("/sync")]
pub async fn sync_handler(remote: web::Data<RemoteSync>) -> HttpResponse {
    let Some(handler) = remote.get_ref() else {
        return JsonResponse::<()>::not_implemented("GitHub sync not configured").into_response();
    };

    let sync = handler.sync().clone();
    let result = web::block(move || sync.sync())
        .await
        .map_err(|e| SyncError::Join(e.to_string()))
        .and_then(|r| r);

    match result {
        Ok(report) => JsonResponse::ok("Sync completed", Some(report)).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Manual sync failed");
            JsonResponse::<()>::internal_error(&format!("Sync failed: {}", err)).into_response()
        }
    }
}
