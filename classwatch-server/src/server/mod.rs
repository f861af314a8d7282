mod config;
pub mod reports;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::middleware;
use axum::response::Response as AxumResponse;
use axum::{
    Json, Router,
    extract::{FromRequest, Path, Query, Request, State},
    http::{Method, StatusCode, header},
    routing::{delete, get, post, put},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
pub use config::{AppConfig, Role, UserConfig};
use classwatch_shared::api;
use classwatch_shared::domain::{Severity, TabletStatus};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info_span;
use uuid::Uuid;

use crate::storage::models;
use crate::storage::{Store, StorageError};
use reports::{ReportFormat, ReportGenerator, StubReportGenerator};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Store,
    reports: Arc<dyn ReportGenerator>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Store) -> Self {
        Self::with_report_generator(config, store, Arc::new(StubReportGenerator))
    }

    /// Swap in a real document encoder without touching the routes.
    pub fn with_report_generator(
        config: AppConfig,
        store: Store,
        reports: Arc<dyn ReportGenerator>,
    ) -> Self {
        Self {
            config,
            store,
            reports,
        }
    }
}

#[derive(Clone, Debug)]
struct ReqId(pub String);

pub fn router(state: AppState) -> Router {
    // Trace with request context (method, path, request_id)
    let trace = TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
        let request_id = req
            .extensions()
            .get::<ReqId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
        )
    });

    let app = Router::new()
        .route("/healthz", get(health))
        .route("/api/dashboard/stats", get(api_dashboard_stats))
        .route("/api/students", get(api_list_students).post(api_create_student))
        .route(
            "/api/students/{id}",
            get(api_get_student).put(api_update_student),
        )
        .route("/api/students/{id}/activities", get(api_student_activities))
        .route("/api/tablets", get(api_list_tablets).post(api_create_tablet))
        .route("/api/tablets/{id}/status", put(api_update_tablet_status))
        .route("/api/tablets/{id}/activity", get(api_tablet_activity))
        .route("/api/tablets/{id}/block-site", post(api_block_site_for_tablet))
        .route("/api/activities", post(api_create_activity))
        .route("/api/alerts", get(api_list_alerts).post(api_create_alert))
        .route("/api/alerts/{id}/resolve", put(api_resolve_alert))
        .route(
            "/api/blocked-sites",
            get(api_list_blocked_sites).post(api_create_blocked_site),
        )
        .route("/api/blocked-sites/{id}", delete(api_delete_blocked_site))
        .route(
            "/api/security-policies",
            get(api_list_security_policies).post(api_create_security_policy),
        )
        .route("/api/security-policies/{id}", put(api_update_security_policy))
        .route("/api/reports/export", get(api_export_report))
        .route("/api/emergency/lock-all", post(api_lock_all))
        .with_state(state.clone())
        .layer(trace)
        .layer(middleware::from_fn(add_request_id));

    // Optionally add CORS for dev if configured
    if let Some(origin) = &state.config.dev_cors_origin {
        let hv = header::HeaderValue::from_str(origin)
            .unwrap_or(header::HeaderValue::from_static("http://localhost:5173"));
        let cors = CorsLayer::new()
            .allow_origin(hv)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]);
        app.layer(cors)
    } else {
        app
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn add_request_id(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let hdr = HeaderName::from_static("x-request-id");
    // Use provided x-request-id if present, else generate
    let rid = req
        .headers()
        .get(&hdr)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    // Put into request extensions for trace layer & handlers
    req.extensions_mut().insert(ReqId(rid.clone()));
    let mut resp = next.run(req).await;
    if let Ok(hv) = HeaderValue::from_str(&rid) {
        resp.headers_mut().insert(hdr, hv);
    }
    Ok(resp)
}

/// `Json` wrapper that turns body/shape rejections into a 400 instead
/// of axum's default 422.
struct AppJson<T>(T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = axum::extract::rejection::JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(AppError::bad_request(rejection.body_text())),
        }
    }
}

// Handlers

async fn api_dashboard_stats(
    State(state): State<AppState>,
) -> Result<Json<api::DashboardStatsDto>, AppError> {
    let stats = state
        .store
        .dashboard_stats()
        .await
        .map_err(AppError::internal)?;
    Ok(Json(api::DashboardStatsDto {
        active_tablets: stats.active_tablets,
        total_tablets: stats.total_tablets,
        active_alerts: stats.active_alerts,
        average_time: stats.average_time,
        blocked_sites: stats.blocked_sites,
    }))
}

async fn api_list_students(
    State(state): State<AppState>,
) -> Result<Json<Vec<api::StudentDto>>, AppError> {
    let rows = state
        .store
        .list_students()
        .await
        .map_err(AppError::internal)?;
    Ok(Json(rows.into_iter().map(student_dto).collect()))
}

async fn api_create_student(
    State(state): State<AppState>,
    AppJson(body): AppJson<api::NewStudentReq>,
) -> Result<Json<api::StudentDto>, AppError> {
    let row = state
        .store
        .create_student(body)
        .await
        .map_err(AppError::from_storage)?;
    Ok(Json(student_dto(row)))
}

async fn api_get_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<api::StudentDto>, AppError> {
    let row = state
        .store
        .get_student(&id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("student not found: {}", id)))?;
    Ok(Json(student_dto(row)))
}

async fn api_update_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<api::UpdateStudentReq>,
) -> Result<Json<api::StudentDto>, AppError> {
    let row = state
        .store
        .update_student(&id, body)
        .await
        .map_err(AppError::from_storage)?
        .ok_or_else(|| AppError::not_found(format!("student not found: {}", id)))?;
    Ok(Json(student_dto(row)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityRange {
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn api_student_activities(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(range): Query<ActivityRange>,
) -> Result<Json<Vec<api::ActivityDto>>, AppError> {
    let from = parse_date_param(range.start_date.as_deref())?;
    let to = parse_date_param(range.end_date.as_deref())?;
    let rows = state
        .store
        .list_student_activities(&id, from, to)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(rows.into_iter().map(activity_dto).collect()))
}

async fn api_list_tablets(
    State(state): State<AppState>,
) -> Result<Json<Vec<api::TabletDto>>, AppError> {
    let rows = state
        .store
        .list_tablets()
        .await
        .map_err(AppError::internal)?;
    let items = rows
        .into_iter()
        .map(|(tablet, student)| tablet_dto(tablet, student))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(items))
}

async fn api_create_tablet(
    State(state): State<AppState>,
    AppJson(body): AppJson<api::NewTabletReq>,
) -> Result<Json<api::TabletDto>, AppError> {
    let row = state
        .store
        .create_tablet(body)
        .await
        .map_err(AppError::from_storage)?;
    Ok(Json(tablet_dto(row, None)?))
}

async fn api_update_tablet_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<api::UpdateTabletStatusReq>,
) -> Result<Json<api::TabletDto>, AppError> {
    let row = state
        .store
        .update_tablet_status(&id, body.status, body.is_blocked)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("tablet not found: {}", id)))?;
    Ok(Json(tablet_dto(row, None)?))
}

async fn api_tablet_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<api::TabletActivityDto>>, AppError> {
    let rows = state
        .store
        .list_tablet_activities(&id)
        .await
        .map_err(AppError::internal)?;
    let items = rows
        .into_iter()
        .map(|(a, student_name)| api::TabletActivityDto {
            student: student_name.map(|name| api::ActivityStudentDto {
                id: a.student_id.clone(),
                name,
            }),
            id: a.id,
            activity_type: a.activity_type,
            application: a.application,
            url: a.url,
            title: a.title,
            category: a.category,
            duration: a.duration,
            is_blocked: a.is_blocked,
            timestamp: utc(a.timestamp),
        })
        .collect();
    Ok(Json(items))
}

async fn api_block_site_for_tablet(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<api::BlockSiteReq>,
) -> Result<Json<api::ActionResp>, AppError> {
    state
        .store
        .block_site_for_tablet(&id, &body.url, &body.reason)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(api::ActionResp {
        success: true,
        message: "Site blocked".into(),
    }))
}

async fn api_create_activity(
    State(state): State<AppState>,
    AppJson(body): AppJson<api::NewActivityReq>,
) -> Result<Json<api::ActivityDto>, AppError> {
    let row = state
        .store
        .create_activity(body)
        .await
        .map_err(AppError::from_storage)?;
    Ok(Json(activity_dto(row)))
}

#[derive(Deserialize)]
struct AlertsQuery {
    resolved: Option<bool>,
}

async fn api_list_alerts(
    State(state): State<AppState>,
    Query(q): Query<AlertsQuery>,
) -> Result<Json<Vec<api::AlertDto>>, AppError> {
    let rows = state
        .store
        .list_alerts(q.resolved)
        .await
        .map_err(AppError::internal)?;
    let items = rows
        .into_iter()
        .map(|(a, student_name, tablet_number)| {
            let severity = parse_severity(&a.severity)?;
            Ok(api::AlertDto {
                student: student_name.map(|name| api::ActivityStudentDto {
                    id: a.student_id.clone(),
                    name,
                }),
                tablet: tablet_number.map(|n| api::AlertTabletDto {
                    id: a.tablet_id.clone(),
                    tablet_number: n,
                }),
                id: a.id,
                alert_type: a.alert_type,
                severity,
                title: a.title,
                description: a.description,
                is_resolved: a.is_resolved,
                created_at: utc(a.created_at),
                resolved_at: a.resolved_at.map(utc),
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;
    Ok(Json(items))
}

async fn api_create_alert(
    State(state): State<AppState>,
    AppJson(body): AppJson<api::NewAlertReq>,
) -> Result<Json<api::AlertRecordDto>, AppError> {
    let row = state
        .store
        .create_alert(body)
        .await
        .map_err(AppError::from_storage)?;
    alert_record_dto(row).map(Json)
}

async fn api_resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<api::ResolveAlertReq>,
) -> Result<Json<api::AlertRecordDto>, AppError> {
    let row = state
        .store
        .resolve_alert(&id, &body.resolved_by)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("alert not found: {}", id)))?;
    alert_record_dto(row).map(Json)
}

async fn api_list_blocked_sites(
    State(state): State<AppState>,
) -> Result<Json<Vec<api::BlockedSiteDto>>, AppError> {
    let rows = state
        .store
        .list_blocked_sites()
        .await
        .map_err(AppError::internal)?;
    Ok(Json(rows.into_iter().map(blocked_site_dto).collect()))
}

async fn api_create_blocked_site(
    State(state): State<AppState>,
    AppJson(body): AppJson<api::NewBlockedSiteReq>,
) -> Result<Json<api::BlockedSiteDto>, AppError> {
    let row = state
        .store
        .create_blocked_site(body)
        .await
        .map_err(AppError::from_storage)?;
    Ok(Json(blocked_site_dto(row)))
}

async fn api_delete_blocked_site(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<api::ActionResp>, AppError> {
    let deleted = state
        .store
        .delete_blocked_site(&id)
        .await
        .map_err(AppError::internal)?;
    if !deleted {
        return Err(AppError::not_found(format!("blocked site not found: {}", id)));
    }
    Ok(Json(api::ActionResp {
        success: true,
        message: "Site removed".into(),
    }))
}

async fn api_list_security_policies(
    State(state): State<AppState>,
) -> Result<Json<Vec<api::SecurityPolicyDto>>, AppError> {
    let rows = state
        .store
        .list_security_policies()
        .await
        .map_err(AppError::internal)?;
    let items = rows
        .into_iter()
        .map(policy_dto)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(items))
}

async fn api_create_security_policy(
    State(state): State<AppState>,
    AppJson(body): AppJson<api::NewSecurityPolicyReq>,
) -> Result<Json<api::SecurityPolicyDto>, AppError> {
    let row = state
        .store
        .create_security_policy(body)
        .await
        .map_err(AppError::from_storage)?;
    policy_dto(row).map(Json)
}

async fn api_update_security_policy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<api::UpdateSecurityPolicyReq>,
) -> Result<Json<api::SecurityPolicyDto>, AppError> {
    let row = state
        .store
        .update_security_policy(&id, body)
        .await
        .map_err(AppError::from_storage)?
        .ok_or_else(|| AppError::not_found(format!("security policy not found: {}", id)))?;
    policy_dto(row).map(Json)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportQuery {
    #[serde(rename = "type")]
    report_type: Option<String>,
    format: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    student_id: Option<String>,
}

async fn api_export_report(
    State(state): State<AppState>,
    Query(q): Query<ReportQuery>,
) -> Result<AxumResponse, AppError> {
    let format: ReportFormat = q
        .format
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|()| AppError::bad_request("Invalid format specified"))?;
    let report_type = q.report_type.unwrap_or_default();
    let body = state.reports.generate(
        format,
        &report_type,
        q.start_date.as_deref().unwrap_or_default(),
        q.end_date.as_deref().unwrap_or_default(),
        q.student_id.as_deref(),
    );

    let filename = format!(
        "report-{}-{}.{}",
        report_type,
        Utc::now().timestamp_millis(),
        format.file_extension()
    );
    let mut resp = axum::response::Response::new(axum::body::Body::from(body));
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(format.content_type()),
    );
    if let Ok(hv) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)) {
        resp.headers_mut().insert(header::CONTENT_DISPOSITION, hv);
    }
    Ok(resp)
}

async fn api_lock_all(
    State(state): State<AppState>,
) -> Result<Json<api::ActionResp>, AppError> {
    let locked = state
        .store
        .lock_all_tablets()
        .await
        .map_err(AppError::internal)?;
    tracing::info!(locked, "emergency lock-all");
    Ok(Json(api::ActionResp {
        success: true,
        message: "All tablets locked".into(),
    }))
}

// DTO mapping

fn utc(dt: NaiveDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc)
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date
/// (interpreted as midnight UTC, matching the previous console).
fn parse_date_param(raw: Option<&str>) -> Result<Option<NaiveDateTime>, AppError> {
    let Some(s) = raw else {
        return Ok(None);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(dt.naive_utc()));
    }
    if let Ok(d) = s.parse::<NaiveDate>() {
        return Ok(Some(d.and_hms_opt(0, 0, 0).expect("valid midnight")));
    }
    Err(AppError::bad_request(format!("invalid date: {}", s)))
}

fn parse_status(raw: &str) -> Result<TabletStatus, AppError> {
    raw.parse::<TabletStatus>().map_err(AppError::internal)
}

fn parse_severity(raw: &str) -> Result<Severity, AppError> {
    raw.parse::<Severity>().map_err(AppError::internal)
}

fn student_dto(s: models::Student) -> api::StudentDto {
    api::StudentDto {
        id: s.id,
        name: s.name,
        grade: s.grade,
        email: s.email,
        tablet_id: s.tablet_id,
        is_active: s.is_active,
        created_at: utc(s.created_at),
    }
}

fn tablet_dto(
    t: models::Tablet,
    student: Option<(String, String, String)>,
) -> Result<api::TabletDto, AppError> {
    let status = parse_status(&t.status)?;
    Ok(api::TabletDto {
        id: t.id,
        tablet_number: t.tablet_number,
        status,
        last_activity: t.last_activity.map(utc),
        current_app: t.current_app,
        current_url: t.current_url,
        screen_time: t.screen_time,
        is_blocked: t.is_blocked,
        created_at: utc(t.created_at),
        student: student.map(|(id, name, grade)| api::TabletStudentDto { id, name, grade }),
    })
}

fn activity_dto(a: models::Activity) -> api::ActivityDto {
    api::ActivityDto {
        id: a.id,
        student_id: a.student_id,
        tablet_id: a.tablet_id,
        activity_type: a.activity_type,
        application: a.application,
        url: a.url,
        title: a.title,
        category: a.category,
        duration: a.duration,
        is_blocked: a.is_blocked,
        timestamp: utc(a.timestamp),
    }
}

fn alert_record_dto(a: models::Alert) -> Result<api::AlertRecordDto, AppError> {
    let severity = parse_severity(&a.severity)?;
    Ok(api::AlertRecordDto {
        id: a.id,
        student_id: a.student_id,
        tablet_id: a.tablet_id,
        alert_type: a.alert_type,
        severity,
        title: a.title,
        description: a.description,
        is_resolved: a.is_resolved,
        resolved_by: a.resolved_by,
        resolved_at: a.resolved_at.map(utc),
        created_at: utc(a.created_at),
    })
}

fn blocked_site_dto(s: models::BlockedSite) -> api::BlockedSiteDto {
    api::BlockedSiteDto {
        id: s.id,
        url: s.url,
        category: s.category,
        reason: s.reason,
        is_active: s.is_active,
        created_at: utc(s.created_at),
    }
}

fn policy_dto(p: models::SecurityPolicy) -> Result<api::SecurityPolicyDto, AppError> {
    let rules: serde_json::Value =
        serde_json::from_str(&p.rules).map_err(AppError::internal)?;
    Ok(api::SecurityPolicyDto {
        id: p.id,
        name: p.name,
        description: p.description,
        rules,
        is_active: p.is_active,
        created_at: utc(p.created_at),
    })
}

// Errors

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl AppError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        Self::BadRequest(msg.into())
    }
    fn not_found<T: Into<String>>(msg: T) -> Self {
        Self::NotFound(msg.into())
    }
    fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }

    /// Storage failures surface as 500, except unique-constraint
    /// violations on create, which are the caller's fault.
    fn from_storage(e: StorageError) -> Self {
        if e.is_unique_violation() {
            Self::BadRequest("value conflicts with an existing record".into())
        } else if let StorageError::InvalidInput(msg) = e {
            Self::BadRequest(msg)
        } else {
            Self::internal(e)
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg, kind, detail) = match self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m, "bad_request", None),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m, "not_found", None),
            // Do not leak internal error details to clients, but log them
            AppError::Internal(m) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
                "internal",
                Some(m),
            ),
        };
        if let Some(detail) = detail {
            tracing::error!(status = %status, kind = kind, message = %msg, detail = %detail, "request failed");
        } else {
            tracing::error!(status = %status, kind = kind, message = %msg, "request failed");
        }
        let body = axum::Json(ErrorBody { error: msg });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_params_accept_both_shapes() {
        let midnight = parse_date_param(Some("2026-08-15")).unwrap().unwrap();
        assert_eq!(midnight.format("%H:%M:%S").to_string(), "00:00:00");
        let precise = parse_date_param(Some("2026-08-15T10:30:00Z")).unwrap().unwrap();
        assert_eq!(precise.format("%H:%M:%S").to_string(), "10:30:00");
        assert!(parse_date_param(None).unwrap().is_none());
        assert!(parse_date_param(Some("not-a-date")).is_err());
    }
}
