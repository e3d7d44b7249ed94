use std::sync::Arc;

use onboarding_flow::config::AppConfig;
use onboarding_flow::onboarding::model::SeedData;
use onboarding_flow::onboarding::{
    DraftStore, FileKeyValueStore, HttpPlatformClient, OnboardingRouteState, OnboardingSession,
    PlatformApi, PlatformSubmitter, StepNavigator, StepRegistry, SubmissionCoordinator,
    TracingTelemetry, onboarding_routes,
};
use onboarding_flow::webhook::{LoggingMembershipHandler, webhook_routes};
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export PLATFORM_API_KEY=...");
        std::process::exit(1);
    });

    eprintln!("Onboarding Flow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   User: {}", config.user_id);
    eprintln!("   Platform: {}", config.platform.api_base);
    eprintln!("   Drafts: {}", config.data_dir.display());
    eprintln!("   API: http://0.0.0.0:{}/api/onboarding/step", config.port);

    // ── Wizard ──────────────────────────────────────────────────────────
    let drafts = DraftStore::new(Arc::new(FileKeyValueStore::new(config.data_dir.clone())));
    let seed = SeedData {
        name: config.seed_name.clone(),
        email: config.seed_email.clone(),
    };
    let navigator = StepNavigator::new(
        Arc::new(StepRegistry::onboarding()),
        drafts.clone(),
        Arc::new(TracingTelemetry::new()),
        seed.into_partial(),
    );

    // ── Platform ────────────────────────────────────────────────────────
    let platform: Arc<dyn PlatformApi> = Arc::new(HttpPlatformClient::new(config.platform.clone()));
    let coordinator = SubmissionCoordinator::new(
        Arc::new(PlatformSubmitter::new(platform.clone(), config.user_id.clone())),
        drafts,
        config.wizard.clone(),
    );

    let session = OnboardingSession::start(
        platform.as_ref(),
        &config.user_id,
        config.seed_name.clone(),
        navigator,
        coordinator,
    )
    .await;
    if session.is_bypassed() {
        eprintln!("   Onboarding: already complete");
    }

    // ── Server ──────────────────────────────────────────────────────────
    let app = onboarding_routes(OnboardingRouteState::new(session))
        .merge(webhook_routes(Arc::new(LoggingMembershipHandler)))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Onboarding server started");
    axum::serve(listener, app).await?;

    Ok(())
}
