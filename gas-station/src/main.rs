use anyhow::Context;
use gas_station::{
    build_router, server, shutdown, telemetry, AppState, Consumer, InMemorySource, LoggingHandler,
    Settings,
};
use gas_station_retries::RetryClientBuilder;
use gas_station_store::InMemoryRepository;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    telemetry::init(&settings.log_filter, settings.log_format);

    let source = Arc::new(InMemorySource::new());
    let consumer = Consumer::new(
        settings.consumer.clone(),
        source.clone(),
        Arc::new(LoggingHandler),
    )
    .start()
    .await
    .context("message consumer failed to start")?;

    let http = RetryClientBuilder::new()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        .build()
        .context("HTTP client init failed")?;

    let state = AppState::new(http, Arc::new(InMemoryRepository::new("documents")));
    let app = build_router(state, settings.body_limit);

    let listener = server::bind(settings.bind_addr).await?;
    server::serve(listener, app, shutdown::signal()).await?;

    source.close();
    consumer.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}
