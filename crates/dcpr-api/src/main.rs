use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use dcpr_core::config::LayeredConfig;
use dcpr_retrieval::ConfiguredPipeline;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dcpr_api::{create_router, ApiConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dcpr_api=info,dcpr_retrieval=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api_config = ApiConfig::from_env();

    let config = LayeredConfig::with_defaults()
        .load_from_optional_file("dcpr.toml")
        .context("Failed to load configuration file")?
        .load_from_env();
    config.validate()?;

    tracing::info!(
        port = api_config.port,
        index = %config.index_path.value.display(),
        llm = %config.llm.value,
        embedder = %config.embedder.value,
        "Starting DCPR API server"
    );

    let pipeline = ConfiguredPipeline::from_config(&config).map_err(|e| {
        tracing::error!(error = %e, "Failed to start the retrieval pipeline");
        e
    })?;

    let state = AppState::new(pipeline, config.index_path.value.clone());

    let origin = api_config
        .cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin '{}'", api_config.cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let app = create_router(state).layer(cors);

    let addr = api_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on {}", addr);
    tracing::info!("CORS enabled for {}", api_config.cors_origin);

    axum::serve(listener, app).await?;

    Ok(())
}
