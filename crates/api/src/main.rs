use colosseum_api::{AppConfig, StartupError};
use colosseum_events::EventBus;

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    colosseum_observability::init(&config.log);

    let app = colosseum_api::app::build_app(&config, EventBus::global()).await?;
    if !app.report.all_ready() {
        tracing::warn!(failed = ?app.report.failed, "starting with failed modules");
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: config.bind_addr,
            source,
        })?;

    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app.router)
        .await
        .map_err(StartupError::Serve)
}
