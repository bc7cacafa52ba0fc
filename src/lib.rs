// ABOUTME: Sick-leave report service library: shared state, routing and components
// ABOUTME: Wires login, reports, activities, exports and admin endpoints onto one axum router

pub mod activity;
pub mod admin;
pub mod auth;
pub mod auth_helpers;
pub mod client;
pub mod credentials;
pub mod dates;
pub mod device;
pub mod entities;
pub mod error;
pub mod export;
pub mod extract;
pub mod local_store;
pub mod middleware;
pub mod migration;
pub mod reports;
pub mod session;
pub mod settings;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
mod storage_tests;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use activity::ActivityLog;
use credentials::CredentialVerifier;
use session::SessionStore;
use settings::Settings;
use storage::Storage;
use telemetry::Telemetry;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub sessions: SessionStore,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub telemetry: Arc<dyn Telemetry>,
    pub activity: ActivityLog,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        storage: Storage,
        settings: Settings,
        verifier: Arc<dyn CredentialVerifier>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        let storage = Arc::new(storage);
        let sessions = SessionStore::new(settings.server.session_max_age_secs);
        let activity = ActivityLog::new(storage.clone(), telemetry.clone());
        Self {
            storage,
            sessions,
            verifier,
            telemetry,
            activity,
            settings: Arc::new(settings),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/biometric", post(auth::biometric))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route(
            "/reports",
            post(reports::create_report).get(reports::list_reports),
        )
        .route("/reports/search", post(reports::search_reports))
        .route("/reports/stats", get(reports::report_stats))
        .route(
            "/reports/:id",
            get(reports::get_report).put(reports::update_report),
        )
        .route("/reports/:id/delete", post(reports::delete_report))
        .route("/activities", get(activity::list_recent))
        .route("/activities/unread", get(activity::list_unread))
        .route("/activities/read-all", post(activity::mark_all_read))
        .route("/activities/:id/read", post(activity::mark_read))
        .route("/generate-pptx", post(export::generate_pptx))
        .route("/generate-pdf", post(export::generate_pdf))
        .route(
            "/admin/users",
            post(admin::create_user).get(admin::users),
        )
        .route("/admin/devices", get(admin::devices))
        .route("/admin/devices/:id/approve", post(admin::approve))
        .route("/admin/devices/:id/reject", post(admin::reject))
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
