use axum::http::StatusCode;
use classwatch_server::{server, storage};
use classwatch_shared::api::rest;
use classwatch_shared::api::{NewTabletReq, UpdateTabletStatusReq};
use classwatch_shared::domain::TabletStatus;
use reqwest::Client;
use serde_json::{Value, json};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::Path;

struct TestServer {
    base: String,
    client: Client,
    handle: tokio::task::JoinHandle<()>,
    _tempdir: tempfile::TempDir,
}

impl TestServer {
    async fn spawn() -> Option<Self> {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let (addr, handle) = match start_server(&db_path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                eprintln!("Skipping test due to sandbox restrictions: {e}");
                return None;
            }
            Err(e) => panic!("failed to start server: {e}"),
        };
        Some(Self {
            base: format!("http://{}", addr),
            client: Client::new(),
            handle,
            _tempdir: dir,
        })
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let url = format!("{}{}", self.base, path);
        let mut req = match method {
            "GET" => self.client.get(&url),
            "POST" => self.client.post(&url),
            "PUT" => self.client.put(&url),
            "DELETE" => self.client.delete(&url),
            other => panic!("unsupported method {other}"),
        };
        if let Some(b) = body {
            req = req.json(&b);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status();
        let text = resp.text().await.unwrap();
        let val = if text.is_empty() {
            json!(null)
        } else {
            serde_json::from_str(&text).unwrap_or(json!({"raw": text}))
        };
        (status, val)
    }

    async fn request_expect(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        expected: StatusCode,
    ) -> Value {
        let (status, value) = self.request(method, path, body).await;
        assert_eq!(
            status, expected,
            "{method} {path} returned {status:?} with body {value:?}",
        );
        value
    }

    /// Create a student and a tablet wired together, returning
    /// (student_id, tablet_id).
    async fn seed_pair(&self, tablet_number: &str, grade: &str) -> (String, String) {
        let student = self
            .request_expect(
                "POST",
                "/api/students",
                Some(json!({"name": format!("Student {tablet_number}"), "grade": grade, "tabletId": tablet_number})),
                StatusCode::OK,
            )
            .await;
        let student_id = student["id"].as_str().unwrap().to_string();
        let tablet = self
            .request_expect(
                "POST",
                "/api/tablets",
                Some(json!({"tabletNumber": tablet_number, "studentId": student_id, "status": "online"})),
                StatusCode::OK,
            )
            .await;
        (student_id, tablet["id"].as_str().unwrap().to_string())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn start_server(
    tmp_db: &Path,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), std::io::Error> {
    let config = server::AppConfig {
        users: vec![server::UserConfig {
            username: "teacher".into(),
            password: "secret123".into(),
            role: server::Role::Teacher,
            name: "Test Teacher".into(),
            email: None,
        }],
        dev_cors_origin: None,
        listen_port: None,
    };

    let store = storage::Store::connect_sqlite(tmp_db.to_str().unwrap())
        .await
        .expect("db");
    let seeds: Vec<storage::UserSeed> = config.users.iter().map(|u| u.to_seed()).collect();
    store.seed_users(&seeds).await.expect("seed");

    let state = server::AppState::new(config, store);
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Ok((addr, handle))
}

#[tokio::test]
async fn health_and_empty_dashboard() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    server
        .request_expect("GET", "/healthz", None, StatusCode::OK)
        .await;
    let stats = server
        .request_expect("GET", "/api/dashboard/stats", None, StatusCode::OK)
        .await;
    assert_eq!(stats["totalTablets"], 0);
    assert_eq!(stats["activeTablets"], 0);
    assert_eq!(stats["activeAlerts"], 0);
    assert_eq!(stats["averageTime"], 0);
    assert_eq!(stats["blockedSites"], 0);
}

#[tokio::test]
async fn dashboard_averages_only_online_tablets() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    for (number, status, screen_time) in [
        ("T-01", "online", 40),
        ("T-02", "online", 20),
        ("T-03", "offline", 999),
    ] {
        server
            .request_expect(
                "POST",
                "/api/tablets",
                Some(json!({"tabletNumber": number, "status": status, "screenTime": screen_time})),
                StatusCode::OK,
            )
            .await;
    }
    let stats = server
        .request_expect("GET", "/api/dashboard/stats", None, StatusCode::OK)
        .await;
    assert_eq!(stats["totalTablets"], 3);
    assert_eq!(stats["activeTablets"], 2);
    assert_eq!(stats["averageTime"], 30);
}

#[tokio::test]
async fn lock_all_is_idempotent() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    for (number, status) in [("T-01", "online"), ("T-02", "online"), ("T-03", "offline")] {
        server
            .request_expect(
                "POST",
                "/api/tablets",
                Some(json!({"tabletNumber": number, "status": status})),
                StatusCode::OK,
            )
            .await;
    }

    async fn snapshot(server: &TestServer) -> Vec<(String, String, bool)> {
        let tablets = server
            .request_expect("GET", "/api/tablets", None, StatusCode::OK)
            .await;
        tablets
            .as_array()
            .unwrap()
            .iter()
            .map(|t| {
                (
                    t["tabletNumber"].as_str().unwrap().to_string(),
                    t["status"].as_str().unwrap().to_string(),
                    t["isBlocked"].as_bool().unwrap(),
                )
            })
            .collect()
    }

    server
        .request_expect("POST", "/api/emergency/lock-all", None, StatusCode::OK)
        .await;
    let after_first = snapshot(&server).await;
    assert_eq!(
        after_first,
        vec![
            ("T-01".into(), "blocked".into(), true),
            ("T-02".into(), "blocked".into(), true),
            // offline tablets are left alone
            ("T-03".into(), "offline".into(), false),
        ]
    );

    server
        .request_expect("POST", "/api/emergency/lock-all", None, StatusCode::OK)
        .await;
    assert_eq!(snapshot(&server).await, after_first);
}

#[tokio::test]
async fn alert_resolution_flow() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (student_id, tablet_id) = server.seed_pair("T-01", "5A").await;

    let alert = server
        .request_expect(
            "POST",
            "/api/alerts",
            Some(json!({
                "studentId": student_id,
                "tabletId": tablet_id,
                "alertType": "inappropriate_content",
                "severity": "high",
                "title": "Flagged site visit"
            })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(alert["isResolved"], false);
    assert!(alert["resolvedAt"].is_null());
    let alert_id = alert["id"].as_str().unwrap().to_string();

    let unresolved = server
        .request_expect("GET", "/api/alerts?resolved=false", None, StatusCode::OK)
        .await;
    assert!(
        unresolved
            .as_array()
            .unwrap()
            .iter()
            .any(|a| a["id"] == alert_id.as_str())
    );
    // joined summaries are present
    assert_eq!(
        unresolved.as_array().unwrap()[0]["tablet"]["tabletNumber"],
        "T-01"
    );

    let resolved = server
        .request_expect(
            "PUT",
            &format!("/api/alerts/{}/resolve", alert_id),
            Some(json!({"resolvedBy": "user-1"})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(resolved["isResolved"], true);
    assert!(resolved["resolvedAt"].is_string());
    assert_eq!(resolved["resolvedBy"], "user-1");

    let unresolved = server
        .request_expect("GET", "/api/alerts?resolved=false", None, StatusCode::OK)
        .await;
    assert!(
        !unresolved
            .as_array()
            .unwrap()
            .iter()
            .any(|a| a["id"] == alert_id.as_str())
    );
    let resolved_list = server
        .request_expect("GET", "/api/alerts?resolved=true", None, StatusCode::OK)
        .await;
    assert!(
        resolved_list
            .as_array()
            .unwrap()
            .iter()
            .any(|a| a["id"] == alert_id.as_str())
    );

    // Double-resolve succeeds and overwrites the resolver
    let again = server
        .request_expect(
            "PUT",
            &format!("/api/alerts/{}/resolve", alert_id),
            Some(json!({"resolvedBy": "user-2"})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(again["isResolved"], true);
    assert_eq!(again["resolvedBy"], "user-2");
}

#[tokio::test]
async fn duplicate_tablet_assignment_is_rejected() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    server
        .request_expect(
            "POST",
            "/api/students",
            Some(json!({"name": "Ana", "grade": "5A", "tabletId": "T-01"})),
            StatusCode::OK,
        )
        .await;
    server
        .request_expect(
            "POST",
            "/api/students",
            Some(json!({"name": "Ben", "grade": "5A", "tabletId": "T-01"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
}

#[tokio::test]
async fn missing_entities_return_404() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    server
        .request_expect("GET", "/api/students/nope", None, StatusCode::NOT_FOUND)
        .await;
    server
        .request_expect(
            "PUT",
            "/api/tablets/nope/status",
            Some(json!({"status": "online"})),
            StatusCode::NOT_FOUND,
        )
        .await;
    server
        .request_expect(
            "PUT",
            "/api/alerts/nope/resolve",
            Some(json!({"resolvedBy": "user-1"})),
            StatusCode::NOT_FOUND,
        )
        .await;
    server
        .request_expect(
            "DELETE",
            "/api/blocked-sites/nope",
            None,
            StatusCode::NOT_FOUND,
        )
        .await;
}

#[tokio::test]
async fn malformed_bodies_return_400() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    // missing tabletNumber
    server
        .request_expect(
            "POST",
            "/api/tablets",
            Some(json!({"status": "online"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    // status outside the enum
    server
        .request_expect(
            "POST",
            "/api/tablets",
            Some(json!({"tabletNumber": "T-01", "status": "asleep"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
}

#[tokio::test]
async fn block_site_locks_matching_tablet_only() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let browsing = server
        .request_expect(
            "POST",
            "/api/tablets",
            Some(json!({
                "tabletNumber": "T-01",
                "status": "online",
                "currentUrl": "https://games.example.com/play"
            })),
            StatusCode::OK,
        )
        .await;
    let other = server
        .request_expect(
            "POST",
            "/api/tablets",
            Some(json!({
                "tabletNumber": "T-02",
                "status": "online",
                "currentUrl": "https://wiki.example.org"
            })),
            StatusCode::OK,
        )
        .await;
    let browsing_id = browsing["id"].as_str().unwrap();

    server
        .request_expect(
            "POST",
            &format!("/api/tablets/{}/block-site", browsing_id),
            Some(json!({"url": "games.example", "reason": "distraction"})),
            StatusCode::OK,
        )
        .await;

    let sites = server
        .request_expect("GET", "/api/blocked-sites", None, StatusCode::OK)
        .await;
    let site = &sites.as_array().unwrap()[0];
    assert_eq!(site["url"], "games.example");
    assert_eq!(site["category"], "inappropriate");
    assert_eq!(site["isActive"], true);

    let tablets = server
        .request_expect("GET", "/api/tablets", None, StatusCode::OK)
        .await;
    for t in tablets.as_array().unwrap() {
        if t["id"] == browsing_id {
            assert_eq!(t["status"], "blocked");
            assert_eq!(t["isBlocked"], true);
        } else {
            assert_eq!(t["id"], other["id"]);
            assert_eq!(t["status"], "online");
        }
    }

    let stats = server
        .request_expect("GET", "/api/dashboard/stats", None, StatusCode::OK)
        .await;
    assert_eq!(stats["blockedSites"], 1);
}

#[tokio::test]
async fn activity_feeds_and_range_filter() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (student_id, tablet_id) = server.seed_pair("T-01", "6B").await;

    for i in 0..12 {
        server
            .request_expect(
                "POST",
                "/api/activities",
                Some(json!({
                    "studentId": student_id,
                    "tabletId": tablet_id,
                    "activityType": "web_navigation",
                    "url": format!("https://example.org/page/{i}"),
                    "category": "educational",
                    "duration": 5
                })),
                StatusCode::OK,
            )
            .await;
    }

    // Per-tablet feed caps at the 10 most recent and resolves names
    let feed = server
        .request_expect(
            "GET",
            &format!("/api/tablets/{}/activity", tablet_id),
            None,
            StatusCode::OK,
        )
        .await;
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 10);
    assert_eq!(feed[0]["student"]["name"], "Student T-01");

    let all = server
        .request_expect(
            "GET",
            &format!("/api/students/{}/activities", student_id),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(all.as_array().unwrap().len(), 12);

    let within = server
        .request_expect(
            "GET",
            &format!(
                "/api/students/{}/activities?startDate=2000-01-01&endDate=2100-01-01",
                student_id
            ),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(within.as_array().unwrap().len(), 12);

    let future = server
        .request_expect(
            "GET",
            &format!("/api/students/{}/activities?startDate=2100-01-01", student_id),
            None,
            StatusCode::OK,
        )
        .await;
    assert!(future.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn report_export_formats() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let url = format!(
        "{}/api/reports/export?type=activity&format=pdf&startDate=2026-08-01&endDate=2026-08-15",
        server.base
    );
    let resp = server.client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );
    let disposition = resp.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"report-activity-"));
    assert!(disposition.ends_with(".pdf\""));
    let body = resp.text().await.unwrap();
    assert_eq!(
        body,
        "PDF Report - Type: activity, Period: 2026-08-01 to 2026-08-15"
    );

    let url = format!(
        "{}/api/reports/export?type=usage&format=excel&startDate=a&endDate=b&studentId=s1",
        server.base
    );
    let resp = server.client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    server
        .request_expect(
            "GET",
            "/api/reports/export?type=activity&format=csv",
            None,
            StatusCode::BAD_REQUEST,
        )
        .await;
}

#[tokio::test]
async fn security_policy_lifecycle() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let policy = server
        .request_expect(
            "POST",
            "/api/security-policies",
            Some(json!({
                "name": "No social media",
                "rules": {"blockCategories": ["social"]}
            })),
            StatusCode::OK,
        )
        .await;
    let policy_id = policy["id"].as_str().unwrap().to_string();
    assert_eq!(policy["rules"]["blockCategories"][0], "social");

    let listed = server
        .request_expect("GET", "/api/security-policies", None, StatusCode::OK)
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Deactivating hides the policy from the active listing
    server
        .request_expect(
            "PUT",
            &format!("/api/security-policies/{}", policy_id),
            Some(json!({"isActive": false})),
            StatusCode::OK,
        )
        .await;
    let listed = server
        .request_expect("GET", "/api/security-policies", None, StatusCode::OK)
        .await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn rest_client_round_trip() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };

    let created = rest::create_tablet(
        &server.base,
        &NewTabletReq {
            tablet_number: "T-09".into(),
            student_id: None,
            status: TabletStatus::Online,
            last_activity: None,
            current_app: None,
            current_url: None,
            screen_time: 15,
            is_blocked: false,
        },
    )
    .await
    .unwrap();
    assert_eq!(created.status, TabletStatus::Online);

    let updated = rest::update_tablet_status(
        &server.base,
        &created.id,
        &UpdateTabletStatusReq {
            status: TabletStatus::Warning,
            is_blocked: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.status, TabletStatus::Warning);
    assert!(!updated.is_blocked);

    let stats = rest::dashboard_stats(&server.base).await.unwrap();
    assert_eq!(stats.total_tablets, 1);
    // warning tablets are not "active"
    assert_eq!(stats.active_tablets, 0);
    assert_eq!(stats.average_time, 0);

    let tablets = rest::list_tablets(&server.base).await.unwrap();
    assert_eq!(tablets.len(), 1);
    assert!(tablets[0].student.is_none());

    let err = rest::update_tablet_status(
        &server.base,
        "missing",
        &UpdateTabletStatusReq {
            status: TabletStatus::Online,
            is_blocked: None,
        },
    )
    .await
    .unwrap_err();
    match err {
        rest::RestError::Status { status, .. } => assert_eq!(status, 404),
        other => panic!("unexpected error: {other}"),
    }
}
