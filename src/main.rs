use mock_mcp::configuration::get_configuration;
use mock_mcp::startup::{bootstrap, run};
use mock_mcp::telemetry::{get_subscriber, init_subscriber};
use std::net::TcpListener;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("mock-mcp".into(), "info".into());
    init_subscriber(subscriber);

    let settings = get_configuration()?;
    let state = bootstrap(&settings).await;

    let address = format!("{}:{}", settings.app_host, settings.app_port);
    tracing::info!(
        %address,
        remote_sync = state.remote.is_some(),
        "Starting Mock MCP Server: POST /mcp, WS /mcp, GET /health, POST /api/testcase/save, POST /api/sync, POST /webhook"
    );
    let listener =
        TcpListener::bind(&address).expect(&format!("failed to bind to {}", settings.app_port));

    run(listener, &state).await?.await?;
    Ok(())
}
