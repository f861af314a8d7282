pub mod models;
pub mod schema;

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use models::{
    Activity, Alert, BlockedSite, NewActivity, NewAlert, NewBlockedSite, NewSecurityPolicy,
    NewStudent, NewTablet, NewUser, SecurityPolicy, SecurityPolicyChangeset, Student,
    StudentChangeset, Tablet, User,
};
use tracing::trace;

use classwatch_shared::api as dto;
use classwatch_shared::domain::TabletStatus;

/// Structured error type for all storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A Diesel ORM error (query failure, constraint violation, etc.)
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Failed to acquire or build a connection from the pool.
    #[error("pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A database migration failed to apply.
    #[error("migration error: {0}")]
    Migration(String),

    /// The caller supplied invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl StorageError {
    /// True when the error is a unique-constraint violation, e.g. a
    /// duplicate student tablet assignment or tablet number.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Database(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ))
        )
    }
}

/// A seed account read from the config file.
#[derive(Debug, Clone)]
pub struct UserSeed {
    pub username: String,
    pub password: String,
    pub role: String,
    pub name: String,
    pub email: Option<String>,
}

/// Aggregate counters backing the dashboard header cards.
#[derive(Debug, Clone, Copy)]
pub struct DashboardStats {
    pub total_tablets: i64,
    pub active_tablets: i64,
    pub active_alerts: i64,
    pub blocked_sites: i64,
    pub average_time: i64,
}

#[derive(Clone)]
pub struct Store {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

impl Store {
    pub async fn connect_sqlite(path: &str) -> Result<Self, StorageError> {
        let url = path.to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(url);
        let pool = Pool::builder().max_size(8).build(manager)?;

        // Run pending Diesel migrations on startup (auto-init empty DBs)
        {
            let pool_clone = pool.clone();
            tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
                const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
                let mut conn = pool_clone.get()?;
                configure_sqlite_conn(&mut conn)?;
                conn.run_pending_migrations(MIGRATIONS)
                    .map_err(|e| StorageError::Migration(e.to_string()))?;
                Ok(())
            })
            .await??;
        }

        Ok(Store { pool })
    }

    /// Upsert teacher accounts from the config file, keyed by username.
    pub async fn seed_users(&self, seeds: &[UserSeed]) -> Result<(), StorageError> {
        use schema::users;

        let pool = self.pool.clone();
        let seeds_owned = seeds.to_owned();
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;

            for s in &seeds_owned {
                let id = uuid::Uuid::new_v4().to_string();
                let new_user = NewUser {
                    id: &id,
                    username: &s.username,
                    password: &s.password,
                    role: &s.role,
                    name: &s.name,
                    email: s.email.as_deref(),
                };
                diesel::insert_into(users::table)
                    .values(&new_user)
                    .on_conflict(users::username)
                    .do_update()
                    .set((
                        users::password.eq(&s.password),
                        users::role.eq(&s.role),
                        users::name.eq(&s.name),
                        users::email.eq(s.email.as_deref()),
                    ))
                    .execute(&mut conn)?;
            }

            Ok(())
        })
        .await?
    }

    pub async fn get_user(&self, id_: &str) -> Result<Option<User>, StorageError> {
        use schema::users::dsl::*;
        let pool = self.pool.clone();
        let uid = id_.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<User>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(users
                .filter(id.eq(&uid))
                .first::<User>(&mut conn)
                .optional()?)
        })
        .await?
    }

    pub async fn get_user_by_username(&self, name_: &str) -> Result<Option<User>, StorageError> {
        use schema::users::dsl::*;
        let pool = self.pool.clone();
        let uname = name_.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<User>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(users
                .filter(username.eq(&uname))
                .first::<User>(&mut conn)
                .optional()?)
        })
        .await?
    }

    pub async fn list_students(&self) -> Result<Vec<Student>, StorageError> {
        use schema::students::dsl::*;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<Student>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(students
                .order(created_at.desc())
                .load::<Student>(&mut conn)?)
        })
        .await?
    }

    pub async fn get_student(&self, id_: &str) -> Result<Option<Student>, StorageError> {
        use schema::students::dsl::*;
        let pool = self.pool.clone();
        let sid = id_.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<Student>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(students
                .filter(id.eq(&sid))
                .first::<Student>(&mut conn)
                .optional()?)
        })
        .await?
    }

    pub async fn create_student(&self, req: dto::NewStudentReq) -> Result<Student, StorageError> {
        use schema::students;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Student, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let id = uuid::Uuid::new_v4().to_string();
            let new_student = NewStudent {
                id: &id,
                name: &req.name,
                grade: &req.grade,
                email: req.email.as_deref(),
                tablet_id: req.tablet_id.as_deref(),
                is_active: req.is_active,
            };
            Ok(diesel::insert_into(students::table)
                .values(&new_student)
                .returning(Student::as_returning())
                .get_result(&mut conn)?)
        })
        .await?
    }

    pub async fn update_student(
        &self,
        id_: &str,
        req: dto::UpdateStudentReq,
    ) -> Result<Option<Student>, StorageError> {
        use schema::students::dsl::*;
        let pool = self.pool.clone();
        let sid = id_.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<Student>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let changes = StudentChangeset {
                name: req.name,
                grade: req.grade,
                email: req.email,
                tablet_id: req.tablet_id,
                is_active: req.is_active,
            };
            Ok(diesel::update(students.filter(id.eq(&sid)))
                .set(&changes)
                .returning(Student::as_returning())
                .get_result(&mut conn)
                .optional()?)
        })
        .await?
    }

    /// All tablets with their assigned student (if any), ordered by
    /// tablet number.
    pub async fn list_tablets(
        &self,
    ) -> Result<Vec<(Tablet, Option<(String, String, String)>)>, StorageError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(
            move || -> Result<Vec<(Tablet, Option<(String, String, String)>)>, StorageError> {
                let mut conn = pool.get()?;
                configure_sqlite_conn(&mut conn)?;
                use crate::storage::schema::{students, tablets};
                Ok(tablets::table
                    .left_join(students::table.on(students::id.nullable().eq(tablets::student_id)))
                    .order(tablets::tablet_number.asc())
                    .select((
                        Tablet::as_select(),
                        (students::id, students::name, students::grade).nullable(),
                    ))
                    .load::<(Tablet, Option<(String, String, String)>)>(&mut conn)?)
            },
        )
        .await?
    }

    pub async fn get_tablet(&self, id_: &str) -> Result<Option<Tablet>, StorageError> {
        use schema::tablets::dsl::*;
        let pool = self.pool.clone();
        let tid = id_.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<Tablet>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(tablets
                .filter(id.eq(&tid))
                .first::<Tablet>(&mut conn)
                .optional()?)
        })
        .await?
    }

    pub async fn create_tablet(&self, req: dto::NewTabletReq) -> Result<Tablet, StorageError> {
        use schema::tablets;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Tablet, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let id = uuid::Uuid::new_v4().to_string();
            let new_tablet = NewTablet {
                id: &id,
                tablet_number: &req.tablet_number,
                student_id: req.student_id.as_deref(),
                status: req.status.as_str(),
                last_activity: req.last_activity.map(|t| t.naive_utc()),
                current_app: req.current_app.as_deref(),
                current_url: req.current_url.as_deref(),
                screen_time: req.screen_time,
                is_blocked: req.is_blocked,
            };
            Ok(diesel::insert_into(tablets::table)
                .values(&new_tablet)
                .returning(Tablet::as_returning())
                .get_result(&mut conn)?)
        })
        .await?
    }

    /// Partial status update; returns `None` when the tablet id is
    /// unknown.
    pub async fn update_tablet_status(
        &self,
        id_: &str,
        status_: TabletStatus,
        is_blocked_: Option<bool>,
    ) -> Result<Option<Tablet>, StorageError> {
        use schema::tablets::dsl::*;
        let pool = self.pool.clone();
        let tid = id_.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<Tablet>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let query = diesel::update(tablets.filter(id.eq(&tid)));
            let row = match is_blocked_ {
                Some(blocked) => query
                    .set((status.eq(status_.as_str()), is_blocked.eq(blocked)))
                    .returning(Tablet::as_returning())
                    .get_result(&mut conn)
                    .optional()?,
                None => query
                    .set(status.eq(status_.as_str()))
                    .returning(Tablet::as_returning())
                    .get_result(&mut conn)
                    .optional()?,
            };
            Ok(row)
        })
        .await?
    }

    /// The 10 most recent activities on a tablet, newest first, with
    /// the owning student's name.
    pub async fn list_tablet_activities(
        &self,
        tablet_id_: &str,
    ) -> Result<Vec<(Activity, Option<String>)>, StorageError> {
        let pool = self.pool.clone();
        let tid = tablet_id_.to_string();
        tokio::task::spawn_blocking(
            move || -> Result<Vec<(Activity, Option<String>)>, StorageError> {
                let mut conn = pool.get()?;
                configure_sqlite_conn(&mut conn)?;
                use crate::storage::schema::{activities, students};
                Ok(activities::table
                    .left_join(students::table.on(students::id.eq(activities::student_id)))
                    .filter(activities::tablet_id.eq(&tid))
                    .order(activities::timestamp.desc())
                    .limit(10)
                    .select((Activity::as_select(), students::name.nullable()))
                    .load::<(Activity, Option<String>)>(&mut conn)?)
            },
        )
        .await?
    }

    /// Force every online tablet into the blocked state. Idempotent:
    /// once nothing is online, re-running affects zero rows.
    pub async fn lock_all_tablets(&self) -> Result<usize, StorageError> {
        use schema::tablets::dsl::*;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<usize, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let locked = diesel::update(
                tablets.filter(status.eq(TabletStatus::Online.as_str())),
            )
            .set((
                status.eq(TabletStatus::Blocked.as_str()),
                is_blocked.eq(true),
            ))
            .execute(&mut conn)?;
            trace!(locked, "lock_all_tablets");
            Ok(locked)
        })
        .await?
    }

    /// Register a blocked site and, when the named tablet is currently
    /// on a URL containing `url` as a substring, force it to blocked.
    /// Both steps run in one transaction so the conditional lock cannot
    /// race a concurrent URL change.
    ///
    /// Returns whether the tablet was locked. A missing tablet id is
    /// not an error; the site row is still recorded.
    pub async fn block_site_for_tablet(
        &self,
        tablet_id_: &str,
        url_: &str,
        reason_: &str,
    ) -> Result<bool, StorageError> {
        let pool = self.pool.clone();
        let tid = tablet_id_.to_string();
        let url_owned = url_.to_string();
        let reason_owned = reason_.to_string();
        tokio::task::spawn_blocking(move || -> Result<bool, StorageError> {
            use crate::storage::schema::{blocked_sites, tablets};
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let mut locked = false;
            conn.immediate_transaction(|conn| -> Result<(), StorageError> {
                let site_id = uuid::Uuid::new_v4().to_string();
                let new_site = NewBlockedSite {
                    id: &site_id,
                    url: &url_owned,
                    category: "inappropriate",
                    reason: Some(&reason_owned),
                    is_active: true,
                };
                diesel::insert_into(blocked_sites::table)
                    .values(&new_site)
                    .execute(conn)?;

                let current: Option<Option<String>> = tablets::table
                    .filter(tablets::id.eq(&tid))
                    .select(tablets::current_url)
                    .first::<Option<String>>(conn)
                    .optional()?;
                if let Some(Some(current_url)) = current
                    && current_url.contains(&url_owned)
                {
                    diesel::update(tablets::table.filter(tablets::id.eq(&tid)))
                        .set((
                            tablets::status.eq(TabletStatus::Blocked.as_str()),
                            tablets::is_blocked.eq(true),
                        ))
                        .execute(conn)?;
                    locked = true;
                }
                Ok(())
            })?;
            Ok(locked)
        })
        .await?
    }

    pub async fn create_activity(&self, req: dto::NewActivityReq) -> Result<Activity, StorageError> {
        use schema::activities;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Activity, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let id = uuid::Uuid::new_v4().to_string();
            let new_activity = NewActivity {
                id: &id,
                student_id: &req.student_id,
                tablet_id: &req.tablet_id,
                activity_type: &req.activity_type,
                application: req.application.as_deref(),
                url: req.url.as_deref(),
                title: req.title.as_deref(),
                category: req.category.as_deref(),
                duration: req.duration,
                is_blocked: req.is_blocked,
            };
            Ok(diesel::insert_into(activities::table)
                .values(&new_activity)
                .returning(Activity::as_returning())
                .get_result(&mut conn)?)
        })
        .await?
    }

    /// Activities for a student, optionally bounded by an inclusive
    /// timestamp range, newest first.
    pub async fn list_student_activities(
        &self,
        student_id_: &str,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
    ) -> Result<Vec<Activity>, StorageError> {
        use schema::activities::dsl::*;
        let pool = self.pool.clone();
        let sid = student_id_.to_string();
        tokio::task::spawn_blocking(move || -> Result<Vec<Activity>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let mut query = activities.filter(student_id.eq(&sid)).into_boxed();
            if let Some(f) = from {
                query = query.filter(timestamp.ge(f));
            }
            if let Some(t) = to {
                query = query.filter(timestamp.le(t));
            }
            Ok(query
                .order(timestamp.desc())
                .load::<Activity>(&mut conn)?)
        })
        .await?
    }

    /// Alerts joined with student and tablet summaries, optionally
    /// filtered by resolution state, newest first.
    pub async fn list_alerts(
        &self,
        resolved: Option<bool>,
    ) -> Result<Vec<(Alert, Option<String>, Option<String>)>, StorageError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(
            move || -> Result<Vec<(Alert, Option<String>, Option<String>)>, StorageError> {
                let mut conn = pool.get()?;
                configure_sqlite_conn(&mut conn)?;
                use crate::storage::schema::{alerts, students, tablets};
                let mut query = alerts::table
                    .left_join(students::table.on(students::id.eq(alerts::student_id)))
                    .left_join(tablets::table.on(tablets::id.eq(alerts::tablet_id)))
                    .into_boxed();
                if let Some(r) = resolved {
                    query = query.filter(alerts::is_resolved.eq(r));
                }
                Ok(query
                    .order(alerts::created_at.desc())
                    .select((
                        Alert::as_select(),
                        students::name.nullable(),
                        tablets::tablet_number.nullable(),
                    ))
                    .load::<(Alert, Option<String>, Option<String>)>(&mut conn)?)
            },
        )
        .await?
    }

    pub async fn create_alert(&self, req: dto::NewAlertReq) -> Result<Alert, StorageError> {
        use schema::alerts;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Alert, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let id = uuid::Uuid::new_v4().to_string();
            let new_alert = NewAlert {
                id: &id,
                student_id: &req.student_id,
                tablet_id: &req.tablet_id,
                alert_type: &req.alert_type,
                severity: req.severity.as_str(),
                title: &req.title,
                description: req.description.as_deref(),
                is_resolved: req.is_resolved,
            };
            Ok(diesel::insert_into(alerts::table)
                .values(&new_alert)
                .returning(Alert::as_returning())
                .get_result(&mut conn)?)
        })
        .await?
    }

    /// Mark an alert resolved. Resolving an already-resolved alert
    /// succeeds and overwrites `resolved_by`/`resolved_at`. Returns
    /// `None` when the alert id is unknown.
    pub async fn resolve_alert(
        &self,
        id_: &str,
        resolved_by_: &str,
    ) -> Result<Option<Alert>, StorageError> {
        use schema::alerts::dsl::*;
        let pool = self.pool.clone();
        let aid = id_.to_string();
        let resolver = resolved_by_.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<Alert>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let now = Utc::now().naive_utc();
            Ok(diesel::update(alerts.filter(id.eq(&aid)))
                .set((
                    is_resolved.eq(true),
                    resolved_by.eq(&resolver),
                    resolved_at.eq(now),
                ))
                .returning(Alert::as_returning())
                .get_result(&mut conn)
                .optional()?)
        })
        .await?
    }

    pub async fn list_blocked_sites(&self) -> Result<Vec<BlockedSite>, StorageError> {
        use schema::blocked_sites::dsl::*;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<BlockedSite>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(blocked_sites
                .order(created_at.desc())
                .load::<BlockedSite>(&mut conn)?)
        })
        .await?
    }

    pub async fn create_blocked_site(
        &self,
        req: dto::NewBlockedSiteReq,
    ) -> Result<BlockedSite, StorageError> {
        use schema::blocked_sites;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<BlockedSite, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let id = uuid::Uuid::new_v4().to_string();
            let new_site = NewBlockedSite {
                id: &id,
                url: &req.url,
                category: &req.category,
                reason: req.reason.as_deref(),
                is_active: req.is_active,
            };
            Ok(diesel::insert_into(blocked_sites::table)
                .values(&new_site)
                .returning(BlockedSite::as_returning())
                .get_result(&mut conn)?)
        })
        .await?
    }

    pub async fn delete_blocked_site(&self, id_: &str) -> Result<bool, StorageError> {
        use schema::blocked_sites::dsl::*;
        let pool = self.pool.clone();
        let sid = id_.to_string();
        tokio::task::spawn_blocking(move || -> Result<bool, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let deleted = diesel::delete(blocked_sites.filter(id.eq(&sid))).execute(&mut conn)?;
            Ok(deleted > 0)
        })
        .await?
    }

    /// Active security policies only; inactive ones are retained but
    /// hidden from the console.
    pub async fn list_security_policies(&self) -> Result<Vec<SecurityPolicy>, StorageError> {
        use schema::security_policies::dsl::*;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<SecurityPolicy>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(security_policies
                .filter(is_active.eq(true))
                .load::<SecurityPolicy>(&mut conn)?)
        })
        .await?
    }

    pub async fn create_security_policy(
        &self,
        req: dto::NewSecurityPolicyReq,
    ) -> Result<SecurityPolicy, StorageError> {
        use schema::security_policies;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<SecurityPolicy, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let id = uuid::Uuid::new_v4().to_string();
            let rules_text = serde_json::to_string(&req.rules)
                .map_err(|e| StorageError::InvalidInput(format!("rules: {e}")))?;
            let new_policy = NewSecurityPolicy {
                id: &id,
                name: &req.name,
                description: req.description.as_deref(),
                rules: &rules_text,
                is_active: req.is_active,
            };
            Ok(diesel::insert_into(security_policies::table)
                .values(&new_policy)
                .returning(SecurityPolicy::as_returning())
                .get_result(&mut conn)?)
        })
        .await?
    }

    pub async fn update_security_policy(
        &self,
        id_: &str,
        req: dto::UpdateSecurityPolicyReq,
    ) -> Result<Option<SecurityPolicy>, StorageError> {
        use schema::security_policies::dsl::*;
        let pool = self.pool.clone();
        let pid = id_.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<SecurityPolicy>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let rules_text = match &req.rules {
                Some(v) => Some(
                    serde_json::to_string(v)
                        .map_err(|e| StorageError::InvalidInput(format!("rules: {e}")))?,
                ),
                None => None,
            };
            let changes = SecurityPolicyChangeset {
                name: req.name,
                description: req.description,
                rules: rules_text,
                is_active: req.is_active,
            };
            Ok(diesel::update(security_policies.filter(id.eq(&pid)))
                .set(&changes)
                .returning(SecurityPolicy::as_returning())
                .get_result(&mut conn)
                .optional()?)
        })
        .await?
    }

    /// Counters for the dashboard header. The average is computed over
    /// currently-online tablets only and rounds to the nearest minute.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, StorageError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<DashboardStats, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            use crate::storage::schema::{alerts, blocked_sites, tablets};

            let total_tablets: i64 = tablets::table.count().get_result(&mut conn)?;
            let active_tablets: i64 = tablets::table
                .filter(tablets::status.eq(TabletStatus::Online.as_str()))
                .count()
                .get_result(&mut conn)?;
            let active_alerts: i64 = alerts::table
                .filter(alerts::is_resolved.eq(false))
                .count()
                .get_result(&mut conn)?;
            let active_sites: i64 = blocked_sites::table
                .filter(blocked_sites::is_active.eq(true))
                .count()
                .get_result(&mut conn)?;

            let online_times: Vec<i32> = tablets::table
                .filter(tablets::status.eq(TabletStatus::Online.as_str()))
                .select(tablets::screen_time)
                .load::<i32>(&mut conn)?;
            let average_time = if online_times.is_empty() {
                0
            } else {
                let sum: i64 = online_times.iter().map(|&t| t as i64).sum();
                (sum as f64 / online_times.len() as f64).round() as i64
            };

            Ok(DashboardStats {
                total_tablets,
                active_tablets,
                active_alerts,
                blocked_sites: active_sites,
                average_time,
            })
        })
        .await?
    }
}

fn configure_sqlite_conn(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    // Enable WAL for better read/write concurrency and set a busy timeout
    // Ignore the result rows; Diesel's execute is fine for PRAGMAs
    diesel::sql_query("PRAGMA journal_mode=WAL;").execute(conn)?;
    diesel::sql_query("PRAGMA synchronous=NORMAL;").execute(conn)?;
    diesel::sql_query("PRAGMA busy_timeout=5000;").execute(conn)?;
    Ok(())
}
