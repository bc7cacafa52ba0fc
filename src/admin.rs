// ABOUTME: Administrator operations for user accounts and device approval
// ABOUTME: Every endpoint requires the configured admin token header

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credentials::CredentialVerifier;
use crate::entities::{activity::ActivityKind, authorized_device, user};
use crate::error::{AppError, Result};
use crate::extract::{AppJson, null_as_empty};
use crate::storage::Storage;
use crate::{AppState, activity::ActivityLog, auth_helpers};

#[derive(Debug, Deserialize)]
pub struct NewUser {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub password: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: Option<String>,
    pub device_id: String,
    pub is_approved: bool,
    pub created_at: i64,
}

pub async fn add_user(
    storage: &Storage,
    verifier: &dyn CredentialVerifier,
    request: &NewUser,
) -> Result<user::Model> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(AppError::missing("username"));
    }
    if request.password.is_empty() {
        return Err(AppError::missing("password"));
    }
    if request.password != request.confirm_password {
        return Err(AppError::mismatch("confirm_password"));
    }
    if storage.find_user_by_username(username).await?.is_some() {
        return Err(AppError::duplicate("username"));
    }

    let hash = verifier.hash(&request.password)?;
    let created = storage.create_user(username, &hash).await?;
    tracing::info!(user_id = %created.id, "user created");
    Ok(created)
}

pub async fn list_devices(storage: &Storage) -> Result<Vec<DeviceSummary>> {
    Ok(storage
        .list_devices()
        .await?
        .into_iter()
        .map(|(device, owner)| DeviceSummary {
            id: device.id,
            user_id: device.user_id,
            username: owner.map(|u| u.username),
            device_id: device.device_id,
            is_approved: device.is_approved,
            created_at: device.created_at,
        })
        .collect())
}

pub async fn approve_device(
    storage: &Storage,
    activity: &ActivityLog,
    id: Uuid,
) -> Result<authorized_device::Model> {
    let device = storage
        .approve_device(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("device {}", id)))?;

    tracing::info!(device_id = %device.device_id, user_id = %device.user_id, "device approved");
    activity
        .record(
            device.user_id,
            ActivityKind::System,
            "تمت الموافقة على جهازك",
            Some(format!("تمت الموافقة على الجهاز {}", device.device_id)),
            None,
        )
        .await;
    Ok(device)
}

pub async fn reject_device(storage: &Storage, id: Uuid) -> Result<authorized_device::Model> {
    let device = storage
        .delete_device(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("device {}", id)))?;
    tracing::info!(device_id = %device.device_id, user_id = %device.user_id, "device rejected");
    Ok(device)
}

pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(request): AppJson<NewUser>,
) -> Result<(StatusCode, Json<user::Model>)> {
    auth_helpers::require_admin(&headers, &state)?;
    let created = add_user(&state.storage, state.verifier.as_ref(), &request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<user::Model>>> {
    auth_helpers::require_admin(&headers, &state)?;
    Ok(Json(state.storage.list_users().await?))
}

pub async fn devices(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<DeviceSummary>>> {
    auth_helpers::require_admin(&headers, &state)?;
    Ok(Json(list_devices(&state.storage).await?))
}

pub async fn approve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<authorized_device::Model>> {
    auth_helpers::require_admin(&headers, &state)?;
    Ok(Json(approve_device(&state.storage, &state.activity, id).await?))
}

pub async fn reject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    auth_helpers::require_admin(&headers, &state)?;
    let device = reject_device(&state.storage, id).await?;
    state.sessions.revoke_device(device.user_id, &device.device_id);
    Ok(Json(serde_json::json!({"success": true})))
}
