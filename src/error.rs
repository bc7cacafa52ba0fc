// ABOUTME: Centralized error handling for report, login, export and admin operations
// ABOUTME: Maps failures to status codes with localized messages and never leaks internals to clients

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Why a field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    Missing,
    Invalid,
    Mismatch,
    Duplicate,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {field} ({reason:?})")]
    Validation {
        field: String,
        reason: ValidationReason,
    },
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Device not authorized (newly registered: {newly_registered})")]
    DeviceNotAuthorized { newly_registered: bool },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Export error: {0}")]
    Export(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::rejected(field, ValidationReason::Missing)
    }

    pub fn invalid(field: impl Into<String>) -> Self {
        Self::rejected(field, ValidationReason::Invalid)
    }

    pub fn mismatch(field: impl Into<String>) -> Self {
        Self::rejected(field, ValidationReason::Mismatch)
    }

    pub fn duplicate(field: impl Into<String>) -> Self {
        Self::rejected(field, ValidationReason::Duplicate)
    }

    fn rejected(field: impl Into<String>, reason: ValidationReason) -> Self {
        AppError::Validation {
            field: field.into(),
            reason,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::DeviceNotAuthorized { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::Export(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-facing error code, stable across locales.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::DeviceNotAuthorized { .. } => "device_not_authorized",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Database(_) => "database_error",
            AppError::Export(_) => "export_error",
            AppError::Config(_) | AppError::Internal(_) => "internal_error",
        }
    }

    /// User-facing message in Arabic.
    pub fn localized(&self) -> String {
        match self {
            AppError::Validation { field, reason } => match (reason, field.as_str()) {
                (ValidationReason::Missing, _) => format!("حقل {} مطلوب", field),
                (ValidationReason::Invalid, _) => format!("قيمة حقل {} غير صالحة", field),
                (ValidationReason::Mismatch, "confirm_password") => {
                    "كلمة المرور وتأكيد كلمة المرور غير متطابقين".to_string()
                }
                (ValidationReason::Mismatch, _) => format!("قيمة حقل {} غير متطابقة", field),
                (ValidationReason::Duplicate, "username") => {
                    "اسم المستخدم موجود بالفعل".to_string()
                }
                (ValidationReason::Duplicate, _) => format!("قيمة حقل {} موجودة بالفعل", field),
            },
            AppError::InvalidCredentials => "اسم المستخدم أو كلمة المرور غير صحيحة".to_string(),
            AppError::DeviceNotAuthorized {
                newly_registered: true,
            } => "هذا الجهاز غير مصرح به. يرجى الانتظار حتى يتم الموافقة عليه من قبل المسؤول"
                .to_string(),
            AppError::DeviceNotAuthorized {
                newly_registered: false,
            } => "هذا الجهاز في انتظار الموافقة من قبل المسؤول".to_string(),
            AppError::NotFound(_) => "لم يتم العثور على نتائج".to_string(),
            AppError::Unauthorized(_) => "يرجى تسجيل الدخول مرة أخرى".to_string(),
            AppError::Export(_) => "حدث خطأ أثناء تنزيل الملف".to_string(),
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                "حدث خطأ غير متوقع. يرجى المحاولة مرة أخرى".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
            }
            AppError::Export(_) => tracing::error!(error = %self, "export failed"),
            AppError::InvalidCredentials
            | AppError::DeviceNotAuthorized { .. }
            | AppError::Unauthorized(_) => tracing::warn!(error = %self, "access denied"),
            AppError::Validation { .. } => tracing::warn!(error = %self, "bad request"),
            AppError::NotFound(_) => tracing::info!(error = %self, "not found"),
        }

        let body = Json(json!({
            "error": self.code(),
            "message": self.localized(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "request body rejected");
        AppError::invalid("body")
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
