// ABOUTME: Username/password login gated by per-device administrator approval
// ABOUTME: Registers unknown devices as pending and issues session cookies on success

use axum::{extract::State, response::Json};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credentials::CredentialVerifier;
use crate::error::{AppError, Result};
use crate::extract::{AppJson, null_as_empty};
use crate::session::{self, SessionIdentity};
use crate::storage::Storage;
use crate::{AppState, auth_helpers};

// Verified against when the username is unknown so both failure paths do the same work.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Runs the login state machine: credentials first, then the device gate.
pub async fn authorize(
    storage: &Storage,
    verifier: &dyn CredentialVerifier,
    username: &str,
    password: &str,
    device_id: &str,
) -> Result<SessionIdentity> {
    if device_id.trim().is_empty() {
        return Err(AppError::missing("device_id"));
    }

    let Some(user) = storage.find_user_by_username(username).await? else {
        let _ = verifier.verify(password, DUMMY_HASH);
        return Err(AppError::InvalidCredentials);
    };

    match verifier.verify(password, &user.password) {
        Ok(true) => {}
        Ok(false) => return Err(AppError::InvalidCredentials),
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "stored password hash is unreadable");
            return Err(AppError::InvalidCredentials);
        }
    }

    match storage.find_device(user.id, device_id).await? {
        None => {
            storage.register_device(user.id, device_id).await?;
            tracing::info!(user_id = %user.id, device_id, "registered new device pending approval");
            Err(AppError::DeviceNotAuthorized {
                newly_registered: true,
            })
        }
        Some(device) if !device.is_approved => Err(AppError::DeviceNotAuthorized {
            newly_registered: false,
        }),
        Some(_) => Ok(SessionIdentity {
            user_id: user.id,
            username: user.username,
            device_id: device_id.to_string(),
        }),
    }
}

/// Biometric re-entry: trusts the cached identity only while its device stays approved.
pub async fn reauthenticate(
    storage: &Storage,
    user_id: Uuid,
    device_id: &str,
) -> Result<SessionIdentity> {
    let denied = AppError::DeviceNotAuthorized {
        newly_registered: false,
    };

    let Some(user) = storage.find_user_by_id(user_id).await? else {
        return Err(denied);
    };

    match storage.find_device(user.id, device_id).await? {
        Some(device) if device.is_approved => Ok(SessionIdentity {
            user_id: user.id,
            username: user.username,
            device_id: device_id.to_string(),
        }),
        _ => Err(denied),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub password: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub device_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BiometricRequest {
    pub user_id: Uuid,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub device_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user_id: Uuid,
    pub username: String,
    pub device_id: String,
}

fn start_session(state: &AppState, jar: CookieJar, identity: SessionIdentity) -> (CookieJar, Json<LoginResponse>) {
    let response = LoginResponse {
        success: true,
        user_id: identity.user_id,
        username: identity.username.clone(),
        device_id: identity.device_id.clone(),
    };

    let session_id = state.sessions.create_session(identity);
    let cookie = session::create_session_cookie(
        session_id,
        state.settings.server.secure_cookies,
        state.sessions.max_age_seconds(),
    );

    (jar.add(cookie), Json(response))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let identity = authorize(
        &state.storage,
        state.verifier.as_ref(),
        &req.username,
        &req.password,
        &req.device_id,
    )
    .await?;

    tracing::info!(user_id = %identity.user_id, device_id = %identity.device_id, "login succeeded");
    Ok(start_session(&state, jar, identity))
}

pub async fn biometric(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(req): AppJson<BiometricRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let identity = reauthenticate(&state.storage, req.user_id, &req.device_id).await?;

    tracing::info!(user_id = %identity.user_id, device_id = %identity.device_id, "biometric re-entry succeeded");
    Ok(start_session(&state, jar, identity))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>)> {
    if let Some(session_cookie) = jar.get(session::SESSION_COOKIE_NAME) {
        state.sessions.remove_session(session_cookie.value());
    }

    let logout_cookie = session::create_logout_cookie(state.settings.server.secure_cookies);
    let jar = jar.add(logout_cookie);

    Ok((jar, Json(serde_json::json!({"success": true}))))
}

pub async fn me(State(state): State<AppState>, jar: CookieJar) -> Result<Json<SessionIdentity>> {
    let session = auth_helpers::validate_session(&jar, &state)?;
    Ok(Json(session.identity))
}
