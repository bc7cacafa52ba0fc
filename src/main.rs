// ABOUTME: Main entry point for the sick-leave report service
// ABOUTME: Loads settings, initializes tracing and the database, then serves the router

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use sickleave::credentials::Argon2Verifier;
use sickleave::settings::Settings;
use sickleave::storage::Storage;
use sickleave::telemetry::TracingTelemetry;
use sickleave::{AppState, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sickleave=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::new()?;
    if settings.admin.token == "change-me" {
        tracing::warn!("admin token is the default; set SICKLEAVE__ADMIN__TOKEN");
    }

    let storage = Storage::connect(&settings.database.url).await?;
    let addr = settings.server.addr();

    let state = AppState::new(
        storage,
        settings,
        Arc::new(Argon2Verifier::default()),
        Arc::new(TracingTelemetry),
    );

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            sessions.cleanup_expired_sessions();
        }
    });

    let app = router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
