use std::sync::Arc;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

use super::error::SyncError;
use super::github::{GitHubSync, SyncReport};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
pub const EVENT_HEADER: &str = "X-GitHub-Event";
const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref", default)]
    pub git_ref: String,
    pub repository: Option<PushRepository>,
    #[serde(default)]
    pub commits: Vec<PushCommit>,
}

#[derive(Debug, Deserialize)]
pub struct PushRepository {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub clone_url: String,
}

#[derive(Debug, Deserialize)]
pub struct PushCommit {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
}

impl PushCommit {
    fn paths(&self) -> impl Iterator<Item = &String> {
        self.added
            .iter()
            .chain(self.modified.iter())
            .chain(self.removed.iter())
    }
}

#[derive(Debug)]
pub enum WebhookOutcome {
    /// Event type other than `push`.
    Ignored { event: String },
    /// Push that touched neither the config nor the test cases.
    NoRelevantChanges,
    Synced(SyncReport),
}

impl WebhookOutcome {
    pub fn message(&self) -> String {
        match self {
            Self::Ignored { event } => format!("Event '{}' ignored", event),
            Self::NoRelevantChanges => "No relevant changes".to_string(),
            Self::Synced(_) => "Sync completed".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("missing X-GitHub-Event header")]
    MissingEvent,
    #[error("invalid push payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("sync failed: {0}")]
    Sync(#[from] SyncError),
}

impl ResponseError for WebhookError {
    fn error_response(&self) -> HttpResponse {
        let message = match self {
            Self::InvalidSignature => "Unauthorized",
            Self::MissingEvent => "Bad request",
            Self::InvalidPayload(_) => "Invalid payload",
            Self::Sync(_) => "Sync failed",
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": message,
            "details": self.to_string(),
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::MissingEvent | Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::Sync(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Check `sha256=<hex>` against the HMAC-SHA256 of `body`, in constant time.
pub fn verify_signature(secret: &str, body: &[u8], signature: Option<&str>) -> bool {
    let Some(hex_digest) = signature.and_then(|s| s.strip_prefix(SIGNATURE_PREFIX)) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Whether any path in the push falls under the tracked config or test case locations.
pub fn touches_tracked_paths(payload: &PushPayload, config_path: &str, testcases_path: &str) -> bool {
    let config_dir = config_path.rfind('/').map(|i| &config_path[..=i]);
    let testcases_prefix = format!("{}/", testcases_path.trim_end_matches('/'));

    payload.commits.iter().flat_map(PushCommit::paths).any(|path| {
        let config_hit = match config_dir {
            Some(dir) => path.starts_with(dir),
            None => path == config_path,
        };
        config_hit || path.starts_with(&testcases_prefix)
    })
}

pub struct WebhookHandler {
    sync: Arc<GitHubSync>,
    secret: Option<String>,
}

impl WebhookHandler {
    pub fn new(sync: Arc<GitHubSync>) -> Self {
        let secret = sync
            .settings()
            .webhook_secret
            .clone()
            .filter(|s| !s.is_empty());
        Self { sync, secret }
    }

    pub fn sync(&self) -> &Arc<GitHubSync> {
        &self.sync
    }

    /// Authenticate and act on one delivery. The signature is checked before anything else.
    pub async fn handle(
        &self,
        event: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<WebhookOutcome, WebhookError> {
        if let Some(secret) = &self.secret {
            if !verify_signature(secret, body, signature) {
                tracing::warn!("Webhook signature verification failed");
                return Err(WebhookError::InvalidSignature);
            }
        }

        let event = event.ok_or(WebhookError::MissingEvent)?;
        if event != "push" {
            tracing::info!(event, "Ignoring webhook event");
            return Ok(WebhookOutcome::Ignored {
                event: event.to_string(),
            });
        }

        let payload: PushPayload = serde_json::from_slice(body)?;
        tracing::info!(
            git_ref = %payload.git_ref,
            repository = %payload.repository.as_ref().map(|r| r.full_name.as_str()).unwrap_or(""),
            commits = payload.commits.len(),
            "Received push event"
        );

        if !touches_tracked_paths(
            &payload,
            self.sync.repo_config_path(),
            self.sync.repo_testcases_path(),
        ) {
            tracing::info!("Push did not touch tools config or test cases");
            return Ok(WebhookOutcome::NoRelevantChanges);
        }

        let sync = self.sync.clone();
        let report = tokio::task::spawn_blocking(move || sync.sync())
            .await
            .map_err(|e| SyncError::Join(e.to_string()))??;

        Ok(WebhookOutcome::Synced(report))
    }
}
