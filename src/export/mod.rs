// ABOUTME: Report export to slide-deck (PPTX) and paginated (PDF) documents
// ABOUTME: Renders from a flat payload and serves the file with a download filename

pub mod pdf;
pub mod pptx;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::entities::activity::ActivityKind;
use crate::error::{AppError, Result};
use crate::extract::{AppJson, null_as_default, null_as_empty};
use crate::telemetry::Telemetry;
use crate::{AppState, auth_helpers};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("zip packaging failed: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("pdf assembly failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat record handed to the renderers, keyed the way front ends send it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct ReportPayload {
    #[serde(deserialize_with = "null_as_empty")]
    pub service_code: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub id_number: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub name_ar: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub name_en: String,
    #[serde(deserialize_with = "null_as_default")]
    pub days_count: i64,
    #[serde(deserialize_with = "null_as_empty")]
    pub entry_date_gregorian: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub exit_date_gregorian: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub entry_date_hijri: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub exit_date_hijri: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub report_issue_date: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub nationality_ar: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub nationality_en: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub doctor_name_ar: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub doctor_name_en: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub job_title_ar: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub job_title_en: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub hospital_name_ar: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub hospital_name_en: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub print_date: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub print_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Pptx,
    Pdf,
}

impl ExportKind {
    pub fn extension(self) -> &'static str {
        match self {
            ExportKind::Pptx => "pptx",
            ExportKind::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportKind::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            ExportKind::Pdf => "application/pdf",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ExportKind::Pptx => "PPTX",
            ExportKind::Pdf => "PDF",
        }
    }

    pub fn filename(self, payload: &ReportPayload) -> String {
        format!(
            "sickLeaves_{}_{}.{}",
            payload.name_ar,
            payload.id_number,
            self.extension()
        )
    }
}

/// Renders a document; failures go to telemetry and come back as `None`.
pub fn render(
    kind: ExportKind,
    payload: &ReportPayload,
    telemetry: &dyn Telemetry,
) -> Option<Vec<u8>> {
    let rendered = match kind {
        ExportKind::Pptx => pptx::render(payload),
        ExportKind::Pdf => pdf::render(payload),
    };

    match rendered {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            telemetry.swallowed("export.render", &e);
            None
        }
    }
}

fn content_disposition(filename: &str) -> HeaderValue {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "._-".contains(c) { c } else { '_' })
        .collect();
    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(filename)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

async fn serve(state: AppState, jar: CookieJar, kind: ExportKind, payload: ReportPayload) -> Result<Response> {
    let bytes = render(kind, &payload, state.telemetry.as_ref())
        .ok_or_else(|| AppError::Export(format!("{} rendering failed", kind.label())))?;

    // A download is attributed only when the caller has a session.
    if let Ok((user_id, _)) = auth_helpers::get_user_info_from_session(&jar, &state) {
        state
            .activity
            .record(
                user_id,
                ActivityKind::Download,
                format!("تم تنزيل تقرير بصيغة {}", kind.label()),
                Some(format!(
                    "تم تنزيل تقرير بصيغة {} للمريض {}",
                    kind.label(),
                    payload.name_ar
                )),
                None,
            )
            .await;
    }

    tracing::info!(kind = kind.extension(), size = bytes.len(), "export rendered");

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(kind.content_type()));
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition(&kind.filename(&payload)),
    );
    Ok((headers, bytes).into_response())
}

pub async fn generate_pptx(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<ReportPayload>,
) -> Result<Response> {
    serve(state, jar, ExportKind::Pptx, payload).await
}

pub async fn generate_pdf(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<ReportPayload>,
) -> Result<Response> {
    serve(state, jar, ExportKind::Pdf, payload).await
}

/// Escapes text for inclusion in XML character data and attributes.
///
/// Characters XML 1.0 cannot carry at all are dropped.
pub(crate) fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            '\u{0}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}' => {}
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
pub(crate) fn sample_payload() -> ReportPayload {
    ReportPayload {
        service_code: "SC-77".into(),
        id_number: "1098765432".into(),
        name_ar: "أحمد علي".into(),
        name_en: "Ahmed Ali".into(),
        days_count: 3,
        entry_date_gregorian: "2025-01-01".into(),
        exit_date_gregorian: "2025-01-03".into(),
        entry_date_hijri: "01/07/1446".into(),
        exit_date_hijri: "03/07/1446".into(),
        report_issue_date: "2025-01-01".into(),
        nationality_ar: "السعودية".into(),
        nationality_en: "Saudi Arabia".into(),
        doctor_name_ar: "د. خالد".into(),
        doctor_name_en: "Dr. Khalid".into(),
        job_title_ar: "طبيب".into(),
        job_title_en: "Doctor".into(),
        hospital_name_ar: "مستشفى الشفاء".into(),
        hospital_name_en: "Al Shifa Hospital".into(),
        print_date: "Wednesday, 1 January 2025".into(),
        print_time: "09:15 AM".into(),
    }
}
