//! Minimal REST client helpers for consumers of the server API.

use super::endpoints as ep;
use super::*;
use once_cell::sync::Lazy;
use std::time::Duration;

pub use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("http: {0}")]
    Http(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("serde: {0}")]
    Serde(String),
}

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .tcp_keepalive(Some(Duration::from_secs(180)))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(180))
        .timeout(Duration::from_secs(60))
        .build()
        .expect("failed to build HTTP client")
});

async fn handle_json<T: for<'de> serde::Deserialize<'de>>(
    res: reqwest::Response,
) -> Result<T, RestError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(RestError::Status {
            status: status.as_u16(),
            body,
        });
    }
    res.json::<T>()
        .await
        .map_err(|e| RestError::Serde(e.to_string()))
}

async fn get_json<T: for<'de> serde::Deserialize<'de>>(url: String) -> Result<T, RestError> {
    let res = HTTP_CLIENT
        .get(url)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

async fn post_json<B: serde::Serialize, T: for<'de> serde::Deserialize<'de>>(
    url: String,
    body: &B,
) -> Result<T, RestError> {
    let res = HTTP_CLIENT
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

async fn put_json<B: serde::Serialize, T: for<'de> serde::Deserialize<'de>>(
    url: String,
    body: &B,
) -> Result<T, RestError> {
    let res = HTTP_CLIENT
        .put(url)
        .json(body)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn dashboard_stats(base: &str) -> Result<DashboardStatsDto, RestError> {
    get_json(ep::dashboard_stats(base)).await
}

pub async fn list_students(base: &str) -> Result<Vec<StudentDto>, RestError> {
    get_json(ep::students(base)).await
}

pub async fn get_student(base: &str, id: &str) -> Result<StudentDto, RestError> {
    get_json(ep::student(base, id)).await
}

pub async fn create_student(base: &str, req: &NewStudentReq) -> Result<StudentDto, RestError> {
    post_json(ep::students(base), req).await
}

pub async fn update_student(
    base: &str,
    id: &str,
    req: &UpdateStudentReq,
) -> Result<StudentDto, RestError> {
    put_json(ep::student(base, id), req).await
}

pub async fn list_tablets(base: &str) -> Result<Vec<TabletDto>, RestError> {
    get_json(ep::tablets(base)).await
}

pub async fn create_tablet(base: &str, req: &NewTabletReq) -> Result<TabletDto, RestError> {
    post_json(ep::tablets(base), req).await
}

pub async fn update_tablet_status(
    base: &str,
    id: &str,
    req: &UpdateTabletStatusReq,
) -> Result<TabletDto, RestError> {
    put_json(ep::tablet_status(base, id), req).await
}

pub async fn tablet_activity(base: &str, id: &str) -> Result<Vec<TabletActivityDto>, RestError> {
    get_json(ep::tablet_activity(base, id)).await
}

pub async fn create_activity(base: &str, req: &NewActivityReq) -> Result<ActivityDto, RestError> {
    post_json(ep::activities(base), req).await
}

pub async fn student_activities(
    base: &str,
    id: &str,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<Vec<ActivityDto>, RestError> {
    let mut url = ep::student_activities(base, id);
    let mut sep = '?';
    if let Some(s) = start_date {
        url.push(sep);
        url.push_str(&format!("startDate={}", s));
        sep = '&';
    }
    if let Some(e) = end_date {
        url.push(sep);
        url.push_str(&format!("endDate={}", e));
    }
    get_json(url).await
}

pub async fn list_alerts(base: &str, resolved: Option<bool>) -> Result<Vec<AlertDto>, RestError> {
    let mut url = ep::alerts(base);
    if let Some(r) = resolved {
        url.push_str(&format!("?resolved={}", r));
    }
    get_json(url).await
}

pub async fn create_alert(base: &str, req: &NewAlertReq) -> Result<AlertRecordDto, RestError> {
    post_json(ep::alerts(base), req).await
}

pub async fn resolve_alert(
    base: &str,
    id: &str,
    req: &ResolveAlertReq,
) -> Result<AlertRecordDto, RestError> {
    put_json(ep::alert_resolve(base, id), req).await
}

pub async fn list_blocked_sites(base: &str) -> Result<Vec<BlockedSiteDto>, RestError> {
    get_json(ep::blocked_sites(base)).await
}

pub async fn create_blocked_site(
    base: &str,
    req: &NewBlockedSiteReq,
) -> Result<BlockedSiteDto, RestError> {
    post_json(ep::blocked_sites(base), req).await
}

pub async fn emergency_lock_all(base: &str) -> Result<ActionResp, RestError> {
    let res = HTTP_CLIENT
        .post(ep::emergency_lock_all(base))
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn block_site_for_tablet(
    base: &str,
    tablet_id: &str,
    req: &BlockSiteReq,
) -> Result<ActionResp, RestError> {
    post_json(ep::tablet_block_site(base, tablet_id), req).await
}
