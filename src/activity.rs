// ABOUTME: Append-only activity trail for report actions, downloads and admin notices
// ABOUTME: Recording never fails the caller; storage errors go to the telemetry sink

use axum::{
    Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::cookie::CookieJar;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::activity::{self, ActivityKind};
use crate::error::{AppError, Result};
use crate::storage::{Storage, now_millis};
use crate::telemetry::Telemetry;
use crate::{AppState, auth_helpers};

pub const DEFAULT_RECENT_LIMIT: u64 = 5;
const MAX_RECENT_LIMIT: u64 = 100;

#[derive(Clone)]
pub struct ActivityLog {
    storage: Arc<Storage>,
    telemetry: Arc<dyn Telemetry>,
}

impl ActivityLog {
    pub fn new(storage: Arc<Storage>, telemetry: Arc<dyn Telemetry>) -> Self {
        Self { storage, telemetry }
    }

    pub async fn record(
        &self,
        user_id: Uuid,
        kind: ActivityKind,
        title: impl Into<String>,
        description: Option<String>,
        report_id: Option<Uuid>,
    ) {
        let model = activity::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            report_id: Set(report_id),
            activity_type: Set(kind),
            title: Set(title.into()),
            description: Set(description),
            is_read: Set(false),
            created_at: Set(now_millis()),
        };

        match self.storage.insert_activity(model).await {
            Ok(saved) => tracing::debug!(activity_id = %saved.id, kind = ?kind, "activity recorded"),
            Err(e) => self.telemetry.swallowed("activity.record", &e),
        }
    }

    pub async fn recent(&self, user_id: Uuid, limit: u64) -> Result<Vec<activity::Model>> {
        self.storage.recent_activities(user_id, limit).await
    }

    pub async fn unread(&self, user_id: Uuid) -> Result<Vec<activity::Model>> {
        self.storage.unread_activities(user_id).await
    }

    pub async fn mark_read(&self, user_id: Uuid, activity_id: Uuid) -> Result<()> {
        if self.storage.mark_activity_read(user_id, activity_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("activity {}", activity_id)))
        }
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        self.storage.mark_all_activities_read(user_id).await
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ActivityList {
    pub activities: Vec<activity::Model>,
}

pub async fn list_recent(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<RecentQuery>,
) -> Result<Json<ActivityList>> {
    let session = auth_helpers::validate_session(&jar, &state)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);
    let activities = state
        .activity
        .recent(session.identity.user_id, limit)
        .await?;
    Ok(Json(ActivityList { activities }))
}

pub async fn list_unread(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<ActivityList>> {
    let session = auth_helpers::validate_session(&jar, &state)?;
    let activities = state.activity.unread(session.identity.user_id).await?;
    Ok(Json(ActivityList { activities }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(activity_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let session = auth_helpers::validate_session(&jar, &state)?;
    state
        .activity
        .mark_read(session.identity.user_id, activity_id)
        .await?;
    Ok(Json(serde_json::json!({"success": true})))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<serde_json::Value>> {
    let session = auth_helpers::validate_session(&jar, &state)?;
    let updated = state.activity.mark_all_read(session.identity.user_id).await?;
    Ok(Json(serde_json::json!({"success": true, "updated": updated})))
}
