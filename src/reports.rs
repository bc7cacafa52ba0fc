// ABOUTME: Report create, search, fetch, update, soft-delete, paging and stats operations
// ABOUTME: Validates bilingual form input, derives exit and Hijri dates, and records activities

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::NaiveDate;
use sea_orm::{IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::activity::ActivityLog;
use crate::dates;
use crate::entities::{activity::ActivityKind, report};
use crate::error::{AppError, Result};
use crate::extract::{AppJson, null_as_default, null_as_empty};
use crate::storage::{Storage, now_millis};
use crate::{AppState, auth_helpers};

pub const PAGE_SIZE: u64 = 5;

const REQUIRED_ON_UPDATE: [&str; 11] = [
    "service_code",
    "id_number",
    "name_ar",
    "name_en",
    "days_count",
    "entry_date_gregorian",
    "entry_date_hijri",
    "doctor_name_ar",
    "doctor_name_en",
    "hospital_name_ar",
    "hospital_name_en",
];

/// Entry Hijri date is derived on create when left blank.
const REQUIRED_ON_CREATE: [&str; 10] = [
    "service_code",
    "id_number",
    "name_ar",
    "name_en",
    "days_count",
    "entry_date_gregorian",
    "doctor_name_ar",
    "doctor_name_en",
    "hospital_name_ar",
    "hospital_name_en",
];

const DEFAULT_NATIONALITY_AR: &str = "السعودية";
const DEFAULT_NATIONALITY_EN: &str = "Saudi Arabia";
const DEFAULT_JOB_TITLE_AR: &str = "طبيب";
const DEFAULT_JOB_TITLE_EN: &str = "Doctor";

/// Form fields arrive as text; the day count may also arrive as a JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DaysInput {
    Number(i64),
    Text(String),
}

impl Default for DaysInput {
    fn default() -> Self {
        DaysInput::Text(String::new())
    }
}

impl DaysInput {
    fn as_text(&self) -> String {
        match self {
            DaysInput::Number(n) => n.to_string(),
            DaysInput::Text(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportForm {
    #[serde(deserialize_with = "null_as_empty")]
    pub service_code: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub id_number: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub name_ar: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub name_en: String,
    #[serde(deserialize_with = "null_as_default")]
    pub days_count: DaysInput,
    #[serde(deserialize_with = "null_as_empty")]
    pub entry_date_gregorian: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub entry_date_hijri: String,
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

impl ReportForm {
    fn field(&self, name: &str) -> String {
        match name {
            "service_code" => self.service_code.trim().to_string(),
            "id_number" => self.id_number.trim().to_string(),
            "name_ar" => self.name_ar.trim().to_string(),
            "name_en" => self.name_en.trim().to_string(),
            "days_count" => self.days_count.as_text(),
            "entry_date_gregorian" => self.entry_date_gregorian.trim().to_string(),
            "entry_date_hijri" => self.entry_date_hijri.trim().to_string(),
            "doctor_name_ar" => self.doctor_name_ar.trim().to_string(),
            "doctor_name_en" => self.doctor_name_en.trim().to_string(),
            "hospital_name_ar" => self.hospital_name_ar.trim().to_string(),
            "hospital_name_en" => self.hospital_name_en.trim().to_string(),
            _ => String::new(),
        }
    }

    fn first_missing(&self, required: &[&'static str]) -> Option<&'static str> {
        required
            .iter()
            .copied()
            .find(|name| self.field(name).is_empty())
    }
}

/// A validated form with every derived value filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFields {
    pub service_code: String,
    pub id_number: String,
    pub name_ar: String,
    pub name_en: String,
    pub days_count: i32,
    pub entry_date_gregorian: NaiveDate,
    pub exit_date_gregorian: NaiveDate,
    pub entry_date_hijri: String,
    pub exit_date_hijri: String,
    pub report_issue_date: Option<NaiveDate>,
    pub nationality_ar: String,
    pub nationality_en: String,
    pub doctor_name_ar: String,
    pub doctor_name_en: String,
    pub job_title_ar: String,
    pub job_title_en: String,
    pub hospital_name_ar: String,
    pub hospital_name_en: String,
    pub print_date: String,
    pub print_time: String,
}

fn or_default(value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn parse_days(form: &ReportForm) -> Result<i32> {
    let days = match &form.days_count {
        DaysInput::Number(n) => i32::try_from(*n).ok(),
        DaysInput::Text(s) => s.trim().parse::<i32>().ok(),
    };
    days.filter(|d| *d >= 0)
        .ok_or_else(|| AppError::invalid("days_count"))
}

fn parse_optional_date(value: &str, field: &str) -> Result<Option<NaiveDate>> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    dates::parse_gregorian(value)
        .map(Some)
        .ok_or_else(|| AppError::invalid(field))
}

/// Validates the form and derives exit and Hijri dates.
///
/// On create, blank Hijri dates are derived from the Gregorian ones and blank
/// optional text falls back to the usual defaults. On update, blank optional
/// text is stored as given.
pub fn normalize(form: &ReportForm, creating: bool) -> Result<ReportFields> {
    let required: &[&'static str] = if creating {
        &REQUIRED_ON_CREATE
    } else {
        &REQUIRED_ON_UPDATE
    };
    if let Some(missing) = form.first_missing(required) {
        return Err(AppError::missing(missing));
    }

    let days_count = parse_days(form)?;
    let entry = dates::parse_gregorian(&form.entry_date_gregorian)
        .ok_or_else(|| AppError::invalid("entry_date_gregorian"))?;
    let exit = dates::exit_date(entry, days_count.unsigned_abs())
        .ok_or_else(|| AppError::invalid("days_count"))?;
    let report_issue_date = parse_optional_date(&form.report_issue_date, "report_issue_date")?;

    let text = |value: &str, default: &str| {
        if creating {
            or_default(value, default)
        } else {
            value.trim().to_string()
        }
    };

    let entry_date_hijri = text(&form.entry_date_hijri, &dates::hijri_from_date(entry));
    // Always follows the derived exit date.
    let exit_date_hijri = dates::hijri_from_date(exit);

    let now = chrono::Local::now();
    Ok(ReportFields {
        service_code: form.service_code.trim().to_string(),
        id_number: form.id_number.trim().to_string(),
        name_ar: form.name_ar.trim().to_string(),
        name_en: form.name_en.trim().to_string(),
        days_count,
        entry_date_gregorian: entry,
        exit_date_gregorian: exit,
        entry_date_hijri,
        exit_date_hijri,
        report_issue_date: if creating {
            report_issue_date.or_else(|| Some(now.date_naive()))
        } else {
            report_issue_date
        },
        nationality_ar: text(&form.nationality_ar, DEFAULT_NATIONALITY_AR),
        nationality_en: text(&form.nationality_en, DEFAULT_NATIONALITY_EN),
        doctor_name_ar: form.doctor_name_ar.trim().to_string(),
        doctor_name_en: form.doctor_name_en.trim().to_string(),
        job_title_ar: text(&form.job_title_ar, DEFAULT_JOB_TITLE_AR),
        job_title_en: text(&form.job_title_en, DEFAULT_JOB_TITLE_EN),
        hospital_name_ar: form.hospital_name_ar.trim().to_string(),
        hospital_name_en: form.hospital_name_en.trim().to_string(),
        print_date: text(&form.print_date, &now.format("%A, %-d %B %Y").to_string()),
        print_time: text(&form.print_time, &now.format("%I:%M %p").to_string()),
    })
}

fn apply(model: &mut report::ActiveModel, fields: ReportFields) {
    model.service_code = Set(fields.service_code);
    model.id_number = Set(fields.id_number);
    model.name_ar = Set(fields.name_ar);
    model.name_en = Set(fields.name_en);
    model.days_count = Set(fields.days_count);
    model.entry_date_gregorian = Set(fields.entry_date_gregorian);
    model.exit_date_gregorian = Set(fields.exit_date_gregorian);
    model.entry_date_hijri = Set(fields.entry_date_hijri);
    model.exit_date_hijri = Set(fields.exit_date_hijri);
    model.report_issue_date = Set(fields.report_issue_date);
    model.nationality_ar = Set(fields.nationality_ar);
    model.nationality_en = Set(fields.nationality_en);
    model.doctor_name_ar = Set(fields.doctor_name_ar);
    model.doctor_name_en = Set(fields.doctor_name_en);
    model.job_title_ar = Set(fields.job_title_ar);
    model.job_title_en = Set(fields.job_title_en);
    model.hospital_name_ar = Set(fields.hospital_name_ar);
    model.hospital_name_en = Set(fields.hospital_name_en);
    model.print_date = Set(fields.print_date);
    model.print_time = Set(fields.print_time);
}

pub async fn create(
    storage: &Storage,
    activity: &ActivityLog,
    user_id: Uuid,
    form: &ReportForm,
) -> Result<Uuid> {
    let fields = normalize(form, true)?;
    let now = now_millis();

    let mut model = report::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    apply(&mut model, fields);

    let saved = storage.insert_report(model).await?;
    tracing::info!(report_id = %saved.id, %user_id, "report created");

    activity
        .record(
            user_id,
            ActivityKind::Add,
            "تم إضافة تقرير جديد",
            Some(format!(
                "تم إضافة تقرير جديد للمريض {} برقم هوية {}",
                saved.name_ar, saved.id_number
            )),
            Some(saved.id),
        )
        .await;

    Ok(saved.id)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub service_code: Option<String>,
    pub id_number: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "reports", rename_all = "snake_case")]
pub enum SearchOutcome {
    NotFound,
    Single(Box<report::Model>),
    Multiple(Vec<report::Model>),
}

pub async fn search(storage: &Storage, user_id: Uuid, query: &SearchQuery) -> Result<SearchOutcome> {
    let service_code = non_blank(&query.service_code);
    let id_number = non_blank(&query.id_number);
    if service_code.is_none() && id_number.is_none() {
        return Err(AppError::missing("service_code"));
    }

    let mut found = storage
        .search_reports(user_id, service_code, id_number)
        .await?;

    Ok(match found.len() {
        0 => SearchOutcome::NotFound,
        1 => SearchOutcome::Single(Box::new(found.remove(0))),
        _ => SearchOutcome::Multiple(found),
    })
}

async fn fetch_live(storage: &Storage, user_id: Uuid, report_id: Uuid) -> Result<report::Model> {
    storage
        .find_live_report(user_id, report_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("report {}", report_id)))
}

pub async fn get(
    storage: &Storage,
    activity: &ActivityLog,
    user_id: Uuid,
    report_id: Uuid,
) -> Result<report::Model> {
    let found = fetch_live(storage, user_id, report_id).await?;
    activity
        .record(
            user_id,
            ActivityKind::View,
            "تم عرض تقرير",
            Some(format!(
                "تم عرض تقرير للمريض {} برقم هوية {}",
                found.name_ar, found.id_number
            )),
            Some(found.id),
        )
        .await;
    Ok(found)
}

pub async fn update(
    storage: &Storage,
    activity: &ActivityLog,
    user_id: Uuid,
    report_id: Uuid,
    form: &ReportForm,
) -> Result<report::Model> {
    let mut fields = normalize(form, false)?;
    let existing = fetch_live(storage, user_id, report_id).await?;

    // A moved entry date invalidates the Hijri value the client resent.
    if fields.entry_date_gregorian != existing.entry_date_gregorian {
        fields.entry_date_hijri = dates::hijri_from_date(fields.entry_date_gregorian);
    }

    let mut model = existing.into_active_model();
    apply(&mut model, fields);
    model.updated_at = Set(now_millis());

    let saved = storage.update_report(model).await?;
    tracing::info!(report_id = %saved.id, %user_id, "report updated");

    activity
        .record(
            user_id,
            ActivityKind::Edit,
            "تم تعديل تقرير",
            Some(format!(
                "تم تعديل تقرير للمريض {} برقم هوية {}",
                saved.name_ar, saved.id_number
            )),
            Some(saved.id),
        )
        .await;

    Ok(saved)
}

pub async fn soft_delete(
    storage: &Storage,
    activity: &ActivityLog,
    user_id: Uuid,
    report_id: Uuid,
) -> Result<()> {
    let existing = fetch_live(storage, user_id, report_id).await?;
    let (name_ar, id_number) = (existing.name_ar.clone(), existing.id_number.clone());

    let mut model = existing.into_active_model();
    model.is_deleted = Set(true);
    model.updated_at = Set(now_millis());
    storage.update_report(model).await?;
    tracing::info!(%report_id, %user_id, "report soft-deleted");

    activity
        .record(
            user_id,
            ActivityKind::Delete,
            "تم حذف تقرير",
            Some(format!("تم حذف تقرير للمريض {} برقم هوية {}", name_ar, id_number)),
            Some(report_id),
        )
        .await;

    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportList {
    pub count: u64,
    pub total_pages: u64,
    pub page: u64,
    pub reports: Vec<report::Model>,
}

pub async fn list(storage: &Storage, user_id: Uuid, page: u64) -> Result<ReportList> {
    let page = storage.page_reports(user_id, page, PAGE_SIZE).await?;
    Ok(ReportList {
        count: page.count,
        total_pages: page.total_pages,
        page: page.page,
        reports: page.items,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportStats {
    pub total_reports: i64,
    pub active_reports: i64,
    pub deleted_reports: i64,
    pub last_report_at: Option<i64>,
}

pub async fn stats(storage: &Storage, user_id: Uuid) -> Result<ReportStats> {
    Ok(storage
        .report_stats(user_id)
        .await?
        .map(|row| ReportStats {
            total_reports: row.total_reports,
            active_reports: row.active_reports,
            deleted_reports: row.deleted_reports,
            last_report_at: row.last_report_at,
        })
        .unwrap_or_default())
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
}

pub async fn create_report(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(form): AppJson<ReportForm>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let session = auth_helpers::validate_session(&jar, &state)?;
    let id = create(&state.storage, &state.activity, session.identity.user_id, &form).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"success": true, "id": id})),
    ))
}

pub async fn list_reports(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<PageQuery>,
) -> Result<Json<ReportList>> {
    let session = auth_helpers::validate_session(&jar, &state)?;
    let page = list(&state.storage, session.identity.user_id, query.page.unwrap_or(1)).await?;
    Ok(Json(page))
}

pub async fn search_reports(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(query): AppJson<SearchQuery>,
) -> Result<Json<SearchOutcome>> {
    let session = auth_helpers::validate_session(&jar, &state)?;
    Ok(Json(search(&state.storage, session.identity.user_id, &query).await?))
}

pub async fn report_stats(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<ReportStats>> {
    let session = auth_helpers::validate_session(&jar, &state)?;
    Ok(Json(stats(&state.storage, session.identity.user_id).await?))
}

pub async fn get_report(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(report_id): Path<Uuid>,
) -> Result<Json<report::Model>> {
    let session = auth_helpers::validate_session(&jar, &state)?;
    let found = get(&state.storage, &state.activity, session.identity.user_id, report_id).await?;
    Ok(Json(found))
}

pub async fn update_report(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(report_id): Path<Uuid>,
    AppJson(form): AppJson<ReportForm>,
) -> Result<Json<report::Model>> {
    let session = auth_helpers::validate_session(&jar, &state)?;
    let saved = update(
        &state.storage,
        &state.activity,
        session.identity.user_id,
        report_id,
        &form,
    )
    .await?;
    Ok(Json(saved))
}

pub async fn delete_report(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(report_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let session = auth_helpers::validate_session(&jar, &state)?;
    soft_delete(&state.storage, &state.activity, session.identity.user_id, report_id).await?;
    Ok(Json(serde_json::json!({"success": true})))
}
