use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::StreamExt;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{FromRow, MySqlPool};

use super::PresenceStore;
use crate::error::{StoreError, StoreResult};
use crate::model::attendance::{AttendanceSession, NewSession, OpenOutcome, STATUS_PRESENT};
use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::role::{EmployeeStatus, Role, WorkProfile};
use crate::model::site::Site;
use crate::model::tenant::{EmployeeId, SiteId, TenantId};

/// MySQL duplicate-key SQLSTATE.
const DUPLICATE_KEY: &str = "23000";

const EMPLOYEE_COLUMNS: &str = "id, tenant_id, name, phone, work_profile, site_id, role, status, leave_balance, created_at";
const SESSION_COLUMNS: &str = "id, tenant_id, employee_id, work_date, check_in, check_out, status, latitude, longitude, distance_m, flagged";
const LEAVE_COLUMNS: &str =
    "id, tenant_id, employee_id, leave_date, starts_at, ends_at, status, created_at";

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> StoreResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }
}

#[derive(FromRow)]
struct EmployeeRow {
    id: String,
    tenant_id: String,
    name: String,
    phone: String,
    work_profile: String,
    site_id: Option<String>,
    role: String,
    status: String,
    leave_balance: f64,
    created_at: DateTime<Utc>,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = StoreError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        Ok(Employee {
            work_profile: parse_column::<WorkProfile>("work_profile", &row.work_profile)?,
            role: parse_column::<Role>("role", &row.role)?,
            status: parse_column::<EmployeeStatus>("status", &row.status)?,
            id: EmployeeId(row.id),
            tenant_id: TenantId(row.tenant_id),
            name: row.name,
            phone: row.phone,
            site_id: row.site_id.map(SiteId),
            leave_balance: row.leave_balance,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct SiteRow {
    id: String,
    tenant_id: String,
    name: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    radius_m: Option<u32>,
}

impl From<SiteRow> for Site {
    fn from(row: SiteRow) -> Self {
        Site {
            id: SiteId(row.id),
            tenant_id: TenantId(row.tenant_id),
            name: row.name,
            latitude: row.latitude,
            longitude: row.longitude,
            radius_m: row.radius_m,
        }
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: String,
    tenant_id: String,
    employee_id: String,
    work_date: NaiveDate,
    check_in: DateTime<Utc>,
    check_out: Option<DateTime<Utc>>,
    status: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    distance_m: Option<u32>,
    flagged: bool,
}

impl From<SessionRow> for AttendanceSession {
    fn from(row: SessionRow) -> Self {
        AttendanceSession {
            id: row.id,
            tenant_id: TenantId(row.tenant_id),
            employee_id: EmployeeId(row.employee_id),
            work_date: row.work_date,
            check_in: row.check_in,
            check_out: row.check_out,
            status: row.status,
            latitude: row.latitude,
            longitude: row.longitude,
            distance_m: row.distance_m,
            flagged: row.flagged,
        }
    }
}

#[derive(FromRow)]
struct LeaveRow {
    id: String,
    tenant_id: String,
    employee_id: String,
    leave_date: NaiveDate,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = StoreError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        Ok(LeaveRequest {
            status: parse_column::<LeaveStatus>("status", &row.status)?,
            id: row.id,
            tenant_id: TenantId(row.tenant_id),
            employee_id: EmployeeId(row.employee_id),
            leave_date: row.leave_date,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
        })
    }
}

fn parse_column<T: FromStr>(column: &str, value: &str) -> StoreResult<T> {
    value
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("{column} = {value:?}")))
}

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(DUPLICATE_KEY))
}

#[async_trait]
impl PresenceStore for MySqlStore {
    async fn find_employee(
        &self,
        tenant: &TenantId,
        employee: &EmployeeId,
    ) -> StoreResult<Option<Employee>> {
        let sql =
            format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE tenant_id = ? AND id = ?");
        sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(tenant.as_str())
            .bind(employee.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Employee::try_from)
            .transpose()
    }

    async fn find_employee_by_phone(
        &self,
        tenant: &TenantId,
        phone: &str,
    ) -> StoreResult<Option<Employee>> {
        let sql =
            format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE tenant_id = ? AND phone = ?");
        sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(tenant.as_str())
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?
            .map(Employee::try_from)
            .transpose()
    }

    async fn find_manager(&self, tenant: &TenantId) -> StoreResult<Option<Employee>> {
        let sql = format!(
            r#"
            SELECT {EMPLOYEE_COLUMNS}
            FROM employees
            WHERE tenant_id = ? AND role = 'MANAGER' AND status = 'ACTIVE'
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#
        );
        sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(tenant.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Employee::try_from)
            .transpose()
    }

    async fn find_site(&self, tenant: &TenantId, site: &SiteId) -> StoreResult<Option<Site>> {
        let row = sqlx::query_as::<_, SiteRow>(
            r#"
            SELECT id, tenant_id, name, latitude, longitude, radius_m
            FROM sites
            WHERE tenant_id = ? AND id = ?
            "#,
        )
        .bind(tenant.as_str())
        .bind(site.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Site::from))
    }

    async fn open_session(&self, session: NewSession) -> StoreResult<OpenOutcome> {
        let work_date = session.work_date();
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_sessions
                (id, tenant_id, employee_id, work_date, check_in, status,
                 latitude, longitude, distance_m, flagged)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(session.tenant_id.as_str())
        .bind(session.employee_id.as_str())
        .bind(work_date)
        .bind(session.check_in)
        .bind(STATUS_PRESENT)
        .bind(session.latitude)
        .bind(session.longitude)
        .bind(session.distance_m)
        .bind(session.flagged)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(OpenOutcome::Opened(session.into_session())),
            // unique (tenant_id, employee_id, work_date) lost the race or the day is taken
            Err(e) if is_duplicate_key(&e) => {
                let sql = format!(
                    r#"
                    SELECT {SESSION_COLUMNS}
                    FROM attendance_sessions
                    WHERE tenant_id = ? AND employee_id = ? AND work_date = ?
                    "#
                );
                let existing = sqlx::query_as::<_, SessionRow>(&sql)
                    .bind(session.tenant_id.as_str())
                    .bind(session.employee_id.as_str())
                    .bind(work_date)
                    .fetch_one(&self.pool)
                    .await?;
                Ok(OpenOutcome::AlreadyExists(existing.into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn close_latest_open_session(
        &self,
        tenant: &TenantId,
        employee: &EmployeeId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<AttendanceSession>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM attendance_sessions
            WHERE tenant_id = ? AND employee_id = ? AND check_out IS NULL
            ORDER BY check_in DESC
            LIMIT 1
            FOR UPDATE
            "#
        );
        let open = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(tenant.as_str())
            .bind(employee.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = open else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE attendance_sessions
            SET check_out = ?
            WHERE id = ? AND check_out IS NULL
            "#,
        )
        .bind(now)
        .bind(&row.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut session = AttendanceSession::from(row);
        session.check_out = Some(now);
        Ok(Some(session))
    }

    async fn sessions_between(
        &self,
        tenant: &TenantId,
        employee: &EmployeeId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<AttendanceSession>> {
        let sql = format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM attendance_sessions
            WHERE tenant_id = ? AND employee_id = ? AND check_in BETWEEN ? AND ?
            ORDER BY check_in DESC
            "#
        );
        let rows = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(tenant.as_str())
            .bind(employee.as_str())
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(AttendanceSession::from).collect())
    }

    async fn insert_leave_request(&self, request: &LeaveRequest) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO leave_requests
                (id, tenant_id, employee_id, leave_date, starts_at, ends_at, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(request.tenant_id.as_str())
        .bind(request.employee_id.as_str())
        .bind(request.leave_date)
        .bind(request.starts_at)
        .bind(request.ends_at)
        .bind(request.status.as_ref())
        .bind(request.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn decide_pending_leave(
        &self,
        tenant: &TenantId,
        id_prefix: &str,
        decision: LeaveStatus,
    ) -> StoreResult<Option<LeaveRequest>> {
        let mut tx = self.pool.begin().await?;

        // prefix is alphanumeric, so it carries no LIKE wildcards
        let sql = format!(
            r#"
            SELECT {LEAVE_COLUMNS}
            FROM leave_requests
            WHERE tenant_id = ? AND status = 'PENDING' AND id LIKE CONCAT(?, '%')
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            FOR UPDATE
            "#
        );
        let pending = sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(tenant.as_str())
            .bind(id_prefix)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = pending else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?
            WHERE id = ? AND tenant_id = ? AND status = 'PENDING'
            "#,
        )
        .bind(decision.as_ref())
        .bind(&row.id)
        .bind(tenant.as_str())
        .execute(&mut *tx)
        .await?;

        if decision == LeaveStatus::Approved {
            sqlx::query(
                r#"
                UPDATE employees
                SET leave_balance = leave_balance - 1
                WHERE id = ? AND tenant_id = ?
                "#,
            )
            .bind(&row.employee_id)
            .bind(tenant.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let mut request = LeaveRequest::try_from(row)?;
        request.status = decision;
        Ok(Some(request))
    }

    async fn latest_leave_request(
        &self,
        tenant: &TenantId,
        employee: &EmployeeId,
    ) -> StoreResult<Option<LeaveRequest>> {
        let sql = format!(
            r#"
            SELECT {LEAVE_COLUMNS}
            FROM leave_requests
            WHERE tenant_id = ? AND employee_id = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#
        );
        sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(tenant.as_str())
            .bind(employee.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn recent_senders(
        &self,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<(TenantId, String, EmployeeId)>> {
        let mut stream = sqlx::query_as::<_, (String, String, String)>(
            r#"
            SELECT DISTINCT e.tenant_id, e.phone, e.id
            FROM employees e
            JOIN attendance_sessions s
              ON s.tenant_id = e.tenant_id AND s.employee_id = e.id
            WHERE e.status = 'ACTIVE' AND s.check_in >= ?
            "#,
        )
        .bind(since)
        .fetch(&self.pool);

        let mut senders = Vec::new();
        while let Some(row) = stream.next().await {
            let (tenant, phone, employee) = row?;
            senders.push((TenantId(tenant), phone, EmployeeId(employee)));
        }
        Ok(senders)
    }
}
