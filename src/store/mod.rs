//! Persistence seam for the workflow services.
//!
//! Every method is scoped by tenant. Mutating methods are single atomic
//! writes: implementations must never let two callers both pass an
//! existence check.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::model::attendance::{AttendanceSession, NewSession, OpenOutcome};
use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::site::Site;
use crate::model::tenant::{EmployeeId, SiteId, TenantId};

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[async_trait]
pub trait PresenceStore: Send + Sync {
    async fn find_employee(
        &self,
        tenant: &TenantId,
        employee: &EmployeeId,
    ) -> StoreResult<Option<Employee>>;

    /// `phone` must already be normalized.
    async fn find_employee_by_phone(
        &self,
        tenant: &TenantId,
        phone: &str,
    ) -> StoreResult<Option<Employee>>;

    /// Earliest-created active manager of the tenant.
    async fn find_manager(&self, tenant: &TenantId) -> StoreResult<Option<Employee>>;

    async fn find_site(&self, tenant: &TenantId, site: &SiteId) -> StoreResult<Option<Site>>;

    /// Inserts the session unless one already exists for the same employee and UTC day.
    async fn open_session(&self, session: NewSession) -> StoreResult<OpenOutcome>;

    /// Sets `check_out` on the most recently opened session still open, if any.
    async fn close_latest_open_session(
        &self,
        tenant: &TenantId,
        employee: &EmployeeId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<AttendanceSession>>;

    /// Sessions whose `check_in` falls in `[from, to]`, newest first.
    async fn sessions_between(
        &self,
        tenant: &TenantId,
        employee: &EmployeeId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<AttendanceSession>>;

    async fn insert_leave_request(&self, request: &LeaveRequest) -> StoreResult<()>;

    /// Moves the oldest PENDING request of `tenant` whose id starts with `id_prefix`
    /// to `decision`. Approval also takes one day off the employee's balance.
    async fn decide_pending_leave(
        &self,
        tenant: &TenantId,
        id_prefix: &str,
        decision: LeaveStatus,
    ) -> StoreResult<Option<LeaveRequest>>;

    async fn latest_leave_request(
        &self,
        tenant: &TenantId,
        employee: &EmployeeId,
    ) -> StoreResult<Option<LeaveRequest>>;

    /// `(tenant, phone, employee)` for active employees who checked in since `since`.
    async fn recent_senders(
        &self,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<(TenantId, String, EmployeeId)>>;
}
