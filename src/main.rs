//! Main entry point for the gallery gateway

use gen_gallery_gateway::{
    api, config::Settings, upstream::Dispatcher, AppError, AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    settings.validate()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    if settings.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    info!("Starting gallery gateway");
    info!(
        "Loaded configuration: server={}:{}",
        settings.server.host, settings.server.port
    );

    if settings.upstream.is_unconfigured() {
        // Generation requests will fail until API_KEY or API_URL is set
        error!(error = %AppError::NoCredentialsConfigured, "Upstream is not configured");
    }

    let dispatcher = Arc::new(Dispatcher::new(&settings.upstream)?);
    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    let app_state = Arc::new(AppState::new(settings, dispatcher));
    app_state.content.ensure_dirs().await?;

    let app = api::routes::create_router(app_state);

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
