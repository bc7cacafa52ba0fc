// ABOUTME: HTTP client for front ends: device identity, cached login and biometric re-entry
// ABOUTME: Keeps the session cookie in a reqwest cookie store and the identity in a LocalStore

use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::LoginResponse;
use crate::device;
use crate::local_store::{CachedIdentity, LocalSession, LocalStore};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("device not authorized: {0}")]
    DeviceNotAuthorized(String),
    #[error("no cached identity for biometric login")]
    NoCachedIdentity,
    #[error("biometric login is disabled")]
    BiometricDisabled,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("local storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

pub struct SickLeaveClient {
    http: reqwest::Client,
    base_url: String,
    session: LocalSession,
}

impl SickLeaveClient {
    pub fn new(base_url: impl Into<String>, store: LocalStore) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: LocalSession::new(store),
        })
    }

    /// Authenticated requests reuse this client so the session cookie is sent.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn session(&self) -> &LocalSession {
        &self.session
    }

    pub fn device_id(&mut self) -> Result<String, ClientError> {
        Ok(device::device_token(self.session.store_mut())?)
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let device_id = self.device_id()?;
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({
                "username": username,
                "password": password,
                "device_id": device_id,
            }))
            .send()
            .await?;

        let login = Self::parse_login(response).await?;
        self.session.save_identity(&CachedIdentity {
            user_id: login.user_id.to_string(),
            username: login.username.clone(),
            device_id: login.device_id.clone(),
        })?;
        tracing::debug!(user_id = %login.user_id, "login cached");
        Ok(login)
    }

    pub async fn biometric_login(&mut self) -> Result<LoginResponse, ClientError> {
        let identity = self.session.identity().ok_or(ClientError::NoCachedIdentity)?;
        if !self.session.biometric_enabled() {
            return Err(ClientError::BiometricDisabled);
        }

        let Ok(user_id) = Uuid::parse_str(&identity.user_id) else {
            self.session.clear_identity()?;
            return Err(ClientError::NoCachedIdentity);
        };

        let response = self
            .http
            .post(self.url("/auth/biometric"))
            .json(&json!({
                "user_id": user_id,
                "device_id": identity.device_id,
            }))
            .send()
            .await?;

        match Self::parse_login(response).await {
            Ok(login) => Ok(login),
            Err(e @ (ClientError::DeviceNotAuthorized(_) | ClientError::InvalidCredentials)) => {
                tracing::warn!(error = %e, "biometric login rejected; clearing cached identity");
                self.session.clear_identity()?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub fn set_biometric_enabled(&mut self, enabled: bool) -> Result<(), ClientError> {
        Ok(self.session.set_biometric_enabled(enabled)?)
    }

    /// Ends the server session; the device token stays cached.
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let response = self.http.post(self.url("/auth/logout")).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        self.session.clear_login()?;
        Ok(())
    }

    async fn parse_login(response: reqwest::Response) -> Result<LoginResponse, ClientError> {
        if response.status().is_success() {
            Ok(response.json::<LoginResponse>().await?)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn error_from(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let body = response.json::<ErrorBody>().await.ok();
        let (code, message) = body
            .map(|b| (b.error, b.message))
            .unwrap_or_default();

        match code.as_str() {
            "invalid_credentials" => ClientError::InvalidCredentials,
            "device_not_authorized" => ClientError::DeviceNotAuthorized(message),
            _ => ClientError::Server { status, message },
        }
    }
}
