use std::sync::Arc;

use role_signup::config::SignupConfig;
use role_signup::registration::{
    HttpAccountService, HttpImageHost, RegistrationManager, RegistrationRouteState,
    registration_routes,
};
use role_signup::store::{DraftStore, LibSqlDraftStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = SignupConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export SIGNUP_SERVICE_URL=https://accounts.example.com/api/register");
        std::process::exit(1);
    });

    eprintln!("role-signup v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Account service: {}", config.service_url);
    eprintln!("   Draft store: {} (session {})", config.db_path.display(), config.session_id);
    eprintln!(
        "   Image host: {}",
        config.image_host_url.as_deref().unwrap_or("disabled")
    );
    if let Some(role) = config.preselected_role {
        eprintln!("   Pre-selected role: {role}");
    }
    eprintln!("   API: http://0.0.0.0:{}/api/registration/status\n", config.port);

    // ── Draft store ─────────────────────────────────────────────────────
    let store: Arc<dyn DraftStore> =
        Arc::new(LibSqlDraftStore::new_local(&config.db_path, &config.session_id).await?);

    // ── Account service ─────────────────────────────────────────────────
    let service = Arc::new(HttpAccountService::new(
        config.service_url.clone(),
        config.service_api_key.clone(),
        config.request_timeout,
    )?);

    let mut manager = RegistrationManager::start(store, service, config.preselected_role).await;
    if let Some(ref url) = config.image_host_url {
        manager = manager.with_image_host(Arc::new(HttpImageHost::new(url.clone())));
    }

    let app = registration_routes(RegistrationRouteState {
        manager: Arc::new(manager),
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Registration API started");
    axum::serve(listener, app).await?;

    Ok(())
}
