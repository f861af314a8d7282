//! URL builders for the REST surface, shared by the server's router
//! layout and the rest-client helpers.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use super::API_PREFIX;

fn base_join(base: &str, path: &str) -> String {
    let b = base.trim_end_matches('/');
    let p = path.trim_start_matches('/');
    format!("{}/{}", b, p)
}

fn enc(s: &str) -> String {
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}

pub fn dashboard_stats(base: &str) -> String {
    base_join(base, &format!("{}/dashboard/stats", API_PREFIX))
}
pub fn students(base: &str) -> String {
    base_join(base, &format!("{}/students", API_PREFIX))
}
pub fn student(base: &str, id: &str) -> String {
    base_join(base, &format!("{}/students/{}", API_PREFIX, enc(id)))
}
pub fn student_activities(base: &str, id: &str) -> String {
    base_join(
        base,
        &format!("{}/students/{}/activities", API_PREFIX, enc(id)),
    )
}
pub fn tablets(base: &str) -> String {
    base_join(base, &format!("{}/tablets", API_PREFIX))
}
pub fn tablet_status(base: &str, id: &str) -> String {
    base_join(base, &format!("{}/tablets/{}/status", API_PREFIX, enc(id)))
}
pub fn tablet_activity(base: &str, id: &str) -> String {
    base_join(
        base,
        &format!("{}/tablets/{}/activity", API_PREFIX, enc(id)),
    )
}
pub fn tablet_block_site(base: &str, id: &str) -> String {
    base_join(
        base,
        &format!("{}/tablets/{}/block-site", API_PREFIX, enc(id)),
    )
}
pub fn activities(base: &str) -> String {
    base_join(base, &format!("{}/activities", API_PREFIX))
}
pub fn alerts(base: &str) -> String {
    base_join(base, &format!("{}/alerts", API_PREFIX))
}
pub fn alert_resolve(base: &str, id: &str) -> String {
    base_join(base, &format!("{}/alerts/{}/resolve", API_PREFIX, enc(id)))
}
pub fn blocked_sites(base: &str) -> String {
    base_join(base, &format!("{}/blocked-sites", API_PREFIX))
}
pub fn blocked_site(base: &str, id: &str) -> String {
    base_join(base, &format!("{}/blocked-sites/{}", API_PREFIX, enc(id)))
}
pub fn security_policies(base: &str) -> String {
    base_join(base, &format!("{}/security-policies", API_PREFIX))
}
pub fn security_policy(base: &str, id: &str) -> String {
    base_join(
        base,
        &format!("{}/security-policies/{}", API_PREFIX, enc(id)),
    )
}
pub fn reports_export(base: &str) -> String {
    base_join(base, &format!("{}/reports/export", API_PREFIX))
}
pub fn emergency_lock_all(base: &str) -> String {
    base_join(base, &format!("{}/emergency/lock-all", API_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_without_double_slash() {
        assert_eq!(
            dashboard_stats("http://localhost:5858/"),
            "http://localhost:5858/api/dashboard/stats"
        );
    }

    #[test]
    fn path_segments_are_encoded() {
        let url = tablet_status("http://h", "a/b");
        assert_eq!(url, "http://h/api/tablets/a%2Fb/status");
    }
}
