// ABOUTME: Session management with HttpOnly cookies for authenticated report operations
// ABOUTME: Holds the session identity (user id, username, device token) established at login

use crate::error::{AppError, Result};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub user_id: Uuid,
    pub username: String,
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub identity: SessionIdentity,
    pub created_at: i64,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
    max_age_seconds: i64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SESSION_MAX_AGE)
    }
}

impl SessionStore {
    pub fn new(max_age_seconds: i64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_age_seconds,
        }
    }

    pub fn max_age_seconds(&self) -> i64 {
        self.max_age_seconds
    }

    pub fn create_session(&self, identity: SessionIdentity) -> String {
        let session_id = Uuid::new_v4().to_string();
        let session_data = SessionData {
            identity,
            created_at: chrono::Utc::now().timestamp(),
        };

        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(session_id.clone(), session_data);
        }

        session_id
    }

    pub fn get_session(&self, session_id: &str) -> Option<SessionData> {
        let cutoff = chrono::Utc::now().timestamp() - self.max_age_seconds;
        let sessions = self.sessions.read().ok()?;
        sessions
            .get(session_id)
            .filter(|session| session.created_at > cutoff)
            .cloned()
    }

    pub fn remove_session(&self, session_id: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(session_id);
        }
    }

    /// Drops every session bound to a device, used when a device is rejected.
    pub fn revoke_device(&self, user_id: Uuid, device_id: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.retain(|_, session| {
                !(session.identity.user_id == user_id && session.identity.device_id == device_id)
            });
        }
    }

    pub fn cleanup_expired_sessions(&self) {
        let cutoff = chrono::Utc::now().timestamp() - self.max_age_seconds;

        if let Ok(mut sessions) = self.sessions.write() {
            sessions.retain(|_, session| session.created_at > cutoff);
        }
    }
}

pub const SESSION_COOKIE_NAME: &str = "sickleave_session";
const SESSION_MAX_AGE: i64 = 24 * 60 * 60; // 24 hours

pub fn create_session_cookie(session_id: String, secure: bool, max_age: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(max_age))
        .path("/")
        .build()
}

pub fn create_logout_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(0))
        .path("/")
        .build()
}

pub fn extract_session_from_jar(
    jar: &CookieJar,
    session_store: &SessionStore,
) -> Result<SessionData> {
    let session_cookie = jar
        .get(SESSION_COOKIE_NAME)
        .ok_or_else(|| AppError::Unauthorized("No session cookie found".to_string()))?;

    let session_data = session_store
        .get_session(session_cookie.value())
        .ok_or_else(|| AppError::Unauthorized("Invalid session".to_string()))?;

    Ok(session_data)
}
