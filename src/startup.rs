use crate::configuration::Settings;
use crate::helpers::JsonResponse;
use crate::mcp::{self, ConfigWatcher, McpDispatcher, TestCaseStore, ToolRegistry};
use crate::routes::{self, RemoteSync};
use crate::sync::{GitHubSync, WebhookHandler};
use actix_cors::Cors;
use actix_web::{dev::Server, error, guard, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

/// Everything the HTTP layer shares. Keep it alive for the server's lifetime: dropping it
/// stops the config watcher.
pub struct AppState {
    pub dispatcher: Arc<McpDispatcher>,
    pub remote: RemoteSync,
    pub watcher: Option<ConfigWatcher>,
}

/// Resolve paths, run the startup sync when configured, load the registry and start watching.
pub async fn bootstrap(settings: &Settings) -> AppState {
    let github = settings
        .github
        .clone()
        .map(|s| Arc::new(GitHubSync::from_settings(s)));

    let (config_path, testcases) = match &github {
        Some(sync) => {
            tracing::info!(repo = %sync.display_url(), "GitHub sync enabled, running initial sync");
            let initial = sync.clone();
            match tokio::task::spawn_blocking(move || initial.sync()).await {
                Ok(Ok(report)) => tracing::info!(?report, "Initial sync finished"),
                Ok(Err(err)) => {
                    tracing::error!(error = %err, "Initial sync failed, continuing with cached files")
                }
                Err(err) => tracing::error!(error = %err, "Initial sync task failed"),
            }
            (sync.config_path(), TestCaseStore::new(sync.testcases_dir()))
        }
        None => {
            let path = settings.tools_config.clone();
            let store = match &settings.testcases_dir {
                Some(dir) => TestCaseStore::new(dir.clone()),
                None => TestCaseStore::for_config(&path),
            };
            (path, store)
        }
    };

    tracing::info!(
        config = %config_path.display(),
        testcases = %testcases.dir().display(),
        "Loading tools"
    );
    let registry = Arc::new(ToolRegistry::load(&config_path));

    let watcher = match ConfigWatcher::spawn(registry.clone()) {
        Ok(watcher) => {
            tracing::info!(path = %watcher.tracked_path().display(), "Watching tools config");
            Some(watcher)
        }
        Err(err) => {
            tracing::warn!(error = %err, "Config watcher not started, hot reload disabled");
            None
        }
    };

    AppState {
        dispatcher: Arc::new(McpDispatcher::new(registry, Arc::new(testcases))),
        remote: github.map(|sync| Arc::new(WebhookHandler::new(sync))),
        watcher,
    }
}

pub async fn run(listener: TcpListener, state: &AppState) -> Result<Server, std::io::Error> {
    let dispatcher = web::Data::new(state.dispatcher.clone());
    let remote = web::Data::new(state.remote.clone());

    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let msg = match &err {
            error::JsonPayloadError::Deserialize(err) => format!(
                "Invalid request at line {}, column {}: {}",
                err.line(),
                err.column(),
                err
            ),
            _ => format!("Invalid request: {}", err),
        };
        error::InternalError::from_response(
            err,
            JsonResponse::<()>::not_valid(&msg).into_response(),
        )
        .into()
    });

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .app_data(json_config.clone())
            .app_data(dispatcher.clone())
            .app_data(remote.clone())
            .service(routes::health_check)
            .service(
                web::resource("/mcp")
                    .route(web::post().to(routes::mcp_post))
                    .route(
                        web::get()
                            .guard(guard::Header("upgrade", "websocket"))
                            .to(mcp::mcp_websocket),
                    ),
            )
            .service(
                web::scope("/api")
                    .service(routes::save_handler)
                    .service(routes::sync_handler),
            )
            .service(web::resource("/webhook").route(web::post().to(routes::webhook_handler)))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
