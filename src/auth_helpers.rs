// ABOUTME: Authentication helper functions for session validation in endpoints
// ABOUTME: Resolves the session identity from cookies and checks the admin token header

use crate::{AppState, error, session};
use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

pub fn validate_session(jar: &CookieJar, state: &AppState) -> error::Result<session::SessionData> {
    session::extract_session_from_jar(jar, &state.sessions)
}

pub fn get_user_info_from_session(
    jar: &CookieJar,
    state: &AppState,
) -> error::Result<(uuid::Uuid, String)> {
    let session_data = validate_session(jar, state)?;
    Ok((session_data.identity.user_id, session_data.identity.username))
}

pub fn require_admin(headers: &HeaderMap, state: &AppState) -> error::Result<()> {
    let supplied = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| error::AppError::Unauthorized("Missing admin token".to_string()))?;

    if supplied.is_empty() || supplied != state.settings.admin.token {
        return Err(error::AppError::Unauthorized("Invalid admin token".to_string()));
    }
    Ok(())
}
