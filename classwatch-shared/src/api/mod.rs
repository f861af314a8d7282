use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Severity, TabletStatus};

pub mod endpoints;
#[cfg(feature = "rest-client")]
pub mod rest;

pub const API_PREFIX: &str = "/api";

// Students

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDto {
    pub id: String,
    pub name: String,
    pub grade: String,
    pub email: Option<String>,
    pub tablet_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudentReq {
    pub name: String,
    pub grade: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub tablet_id: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentReq {
    pub name: Option<String>,
    pub grade: Option<String>,
    pub email: Option<String>,
    pub tablet_id: Option<String>,
    pub is_active: Option<bool>,
}

// Tablets

/// Student summary embedded in a tablet listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabletStudentDto {
    pub id: String,
    pub name: String,
    pub grade: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabletDto {
    pub id: String,
    pub tablet_number: String,
    pub status: TabletStatus,
    pub last_activity: Option<DateTime<Utc>>,
    pub current_app: Option<String>,
    pub current_url: Option<String>,
    pub screen_time: i32,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<TabletStudentDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTabletReq {
    pub tablet_number: String,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default = "default_status")]
    pub status: TabletStatus,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_app: Option<String>,
    #[serde(default)]
    pub current_url: Option<String>,
    #[serde(default)]
    pub screen_time: i32,
    #[serde(default)]
    pub is_blocked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTabletStatusReq {
    pub status: TabletStatus,
    #[serde(default)]
    pub is_blocked: Option<bool>,
}

// Activities

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDto {
    pub id: String,
    pub student_id: String,
    pub tablet_id: String,
    pub activity_type: String,
    pub application: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub duration: i32,
    pub is_blocked: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivityReq {
    pub student_id: String,
    pub tablet_id: String,
    pub activity_type: String,
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub duration: i32,
    #[serde(default)]
    pub is_blocked: bool,
}

/// Activity as returned by the per-tablet feed, with the owning
/// student's name resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabletActivityDto {
    pub id: String,
    pub activity_type: String,
    pub application: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub duration: i32,
    pub is_blocked: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<ActivityStudentDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStudentDto {
    pub id: String,
    pub name: String,
}

// Alerts

/// Alert joined with student and tablet summaries for the console list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDto {
    pub id: String,
    pub alert_type: String,
    pub severity: Severity,
    pub title: String,
    pub description: Option<String>,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<ActivityStudentDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tablet: Option<AlertTabletDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertTabletDto {
    pub id: String,
    pub tablet_number: String,
}

/// Raw alert row, as returned by create/resolve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecordDto {
    pub id: String,
    pub student_id: String,
    pub tablet_id: String,
    pub alert_type: String,
    pub severity: Severity,
    pub title: String,
    pub description: Option<String>,
    pub is_resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlertReq {
    pub student_id: String,
    pub tablet_id: String,
    pub alert_type: String,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_resolved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveAlertReq {
    pub resolved_by: String,
}

// Blocked sites

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedSiteDto {
    pub id: String,
    pub url: String,
    pub category: String,
    pub reason: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBlockedSiteReq {
    pub url: String,
    pub category: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSiteReq {
    pub url: String,
    pub reason: String,
}

// Security policies

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityPolicyDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub rules: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSecurityPolicyReq {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub rules: serde_json::Value,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSecurityPolicyReq {
    pub name: Option<String>,
    pub description: Option<String>,
    pub rules: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}

// Dashboard

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatsDto {
    pub active_tablets: i64,
    pub total_tablets: i64,
    pub active_alerts: i64,
    /// Mean screen time (minutes) over currently-online tablets,
    /// rounded to the nearest integer; 0 when none are online.
    pub average_time: i64,
    pub blocked_sites: i64,
}

// Actions

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResp {
    pub success: bool,
    pub message: String,
}

fn default_true() -> bool {
    true
}

fn default_status() -> TabletStatus {
    TabletStatus::Offline
}

fn default_severity() -> Severity {
    Severity::Medium
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_alert_defaults() {
        let req: NewAlertReq = serde_json::from_str(
            r#"{"studentId":"s1","tabletId":"t1","alertType":"inappropriate_content","title":"x"}"#,
        )
        .unwrap();
        assert_eq!(req.severity, Severity::Medium);
        assert!(!req.is_resolved);
    }

    #[test]
    fn new_tablet_rejects_missing_number() {
        let res: Result<NewTabletReq, _> = serde_json::from_str(r#"{"status":"online"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn dto_field_names_are_camel_case() {
        let stats = DashboardStatsDto {
            active_tablets: 1,
            total_tablets: 2,
            active_alerts: 0,
            average_time: 30,
            blocked_sites: 4,
        };
        let v = serde_json::to_value(&stats).unwrap();
        assert_eq!(v["activeTablets"], 1);
        assert_eq!(v["averageTime"], 30);
    }
}
