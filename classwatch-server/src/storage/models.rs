use crate::storage::schema::{
    activities, alerts, blocked_sites, security_policies, students, tablets, users,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password: String,
    pub role: String,
    pub name: String,
    pub email: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub role: &'a str,
    pub name: &'a str,
    pub email: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = students)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub grade: String,
    pub email: Option<String>,
    pub tablet_id: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = students)]
pub struct NewStudent<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub grade: &'a str,
    pub email: Option<&'a str>,
    pub tablet_id: Option<&'a str>,
    pub is_active: bool,
}

/// Partial student update; `None` fields keep their stored value.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = students)]
pub struct StudentChangeset {
    pub name: Option<String>,
    pub grade: Option<String>,
    pub email: Option<String>,
    pub tablet_id: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = tablets)]
#[diesel(belongs_to(Student, foreign_key = student_id))]
pub struct Tablet {
    pub id: String,
    pub tablet_number: String,
    pub student_id: Option<String>,
    pub status: String,
    pub last_activity: Option<NaiveDateTime>,
    pub current_app: Option<String>,
    pub current_url: Option<String>,
    pub screen_time: i32,
    pub is_blocked: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = tablets)]
pub struct NewTablet<'a> {
    pub id: &'a str,
    pub tablet_number: &'a str,
    pub student_id: Option<&'a str>,
    pub status: &'a str,
    pub last_activity: Option<NaiveDateTime>,
    pub current_app: Option<&'a str>,
    pub current_url: Option<&'a str>,
    pub screen_time: i32,
    pub is_blocked: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = activities)]
#[diesel(belongs_to(Student, foreign_key = student_id))]
#[diesel(belongs_to(Tablet, foreign_key = tablet_id))]
pub struct Activity {
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
    pub timestamp: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = activities)]
pub struct NewActivity<'a> {
    pub id: &'a str,
    pub student_id: &'a str,
    pub tablet_id: &'a str,
    pub activity_type: &'a str,
    pub application: Option<&'a str>,
    pub url: Option<&'a str>,
    pub title: Option<&'a str>,
    pub category: Option<&'a str>,
    pub duration: i32,
    pub is_blocked: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = alerts)]
#[diesel(belongs_to(Student, foreign_key = student_id))]
#[diesel(belongs_to(Tablet, foreign_key = tablet_id))]
#[diesel(belongs_to(User, foreign_key = resolved_by))]
pub struct Alert {
    pub id: String,
    pub student_id: String,
    pub tablet_id: String,
    pub alert_type: String,
    pub severity: String,
    pub title: String,
    pub description: Option<String>,
    pub is_resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = alerts)]
pub struct NewAlert<'a> {
    pub id: &'a str,
    pub student_id: &'a str,
    pub tablet_id: &'a str,
    pub alert_type: &'a str,
    pub severity: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub is_resolved: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = blocked_sites)]
pub struct BlockedSite {
    pub id: String,
    pub url: String,
    pub category: String,
    pub reason: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = blocked_sites)]
pub struct NewBlockedSite<'a> {
    pub id: &'a str,
    pub url: &'a str,
    pub category: &'a str,
    pub reason: Option<&'a str>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = security_policies)]
pub struct SecurityPolicy {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// JSON rule document, stored as text.
    pub rules: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = security_policies)]
pub struct NewSecurityPolicy<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub rules: &'a str,
    pub is_active: bool,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = security_policies)]
pub struct SecurityPolicyChangeset {
    pub name: Option<String>,
    pub description: Option<String>,
    pub rules: Option<String>,
    pub is_active: Option<bool>,
}
