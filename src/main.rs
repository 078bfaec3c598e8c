use anyhow::Result;

use adminportal_bff::{
    app,
    auth::TokenVerifier,
    config::{self, EnvelopeMode},
    domain::FeatureRegistry,
    logging,
    services::{codec_from_mode, ReportCache, UpstreamClient},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        upstream = %settings.upstream_base_url,
        "Starting admin portal BFF"
    );

    if settings.env.is_prod() && settings.envelope == EnvelopeMode::Plain {
        tracing::warn!("ENVELOPE_MODE=plain in production, upstream payloads are not encrypted");
    }

    // Feature registry with optional hash-suffixed upstream paths
    let features = FeatureRegistry::load(settings.upstream_routes_file.as_deref())?;

    // Create upstream client
    let upstream = UpstreamClient::new(
        &settings.upstream_base_url,
        settings.upstream_api_token.clone(),
        settings.upstream_timeout_seconds,
        codec_from_mode(&settings.envelope),
    )?;

    // Optionally check upstream health (non-blocking)
    tokio::spawn({
        let upstream = upstream.clone();
        async move {
            match upstream.health_check().await {
                Ok(()) => tracing::info!("Upstream admin API is healthy"),
                Err(e) => tracing::warn!(error = %e, "Upstream health check failed - reports will error until it recovers"),
            }
        }
    });

    let verifier = TokenVerifier::new(&settings.admin_jwt_secret, settings.admin_jwt_issuer.clone());
    let reports = ReportCache::new(settings.report_cache_ttl_seconds);

    // Create application state
    let state = app::AppState::new(settings.clone(), verifier, features, upstream, reports);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
