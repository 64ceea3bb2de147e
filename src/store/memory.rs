use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::PresenceStore;
use crate::error::StoreResult;
use crate::model::attendance::{AttendanceSession, NewSession, OpenOutcome};
use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::site::Site;
use crate::model::tenant::{EmployeeId, SiteId, TenantId};

#[derive(Default)]
struct Inner {
    employees: Vec<Employee>,
    sites: Vec<Site>,
    sessions: Vec<AttendanceSession>,
    leave_requests: Vec<LeaveRequest>,
}

/// In-process store. Each trait method runs under one lock acquisition,
/// which gives the same atomicity the SQL store gets from constraints
/// and row locks.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

/// JSON fixture accepted by [`MemoryStore::from_seed_file`].
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub sites: Vec<Site>,
    #[serde(default)]
    pub employees: Vec<Employee>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: Seed) -> Self {
        let store = Self::new();
        for site in seed.sites {
            store.add_site(site);
        }
        for employee in seed.employees {
            store.add_employee(employee);
        }
        store
    }

    pub fn from_seed_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed file {}", path.display()))?;
        let seed: Seed = serde_json::from_str(&raw)
            .with_context(|| format!("parsing seed file {}", path.display()))?;
        tracing::info!(
            sites = seed.sites.len(),
            employees = seed.employees.len(),
            "Memory store seeded"
        );
        Ok(Self::from_seed(seed))
    }

    pub fn add_employee(&self, employee: Employee) {
        self.lock().employees.push(employee);
    }

    pub fn add_site(&self, site: Site) {
        self.lock().sites.push(site);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("presence store poisoned")
    }

    #[cfg(test)]
    pub fn sessions(&self) -> Vec<AttendanceSession> {
        self.lock().sessions.clone()
    }

    #[cfg(test)]
    pub fn leave_requests(&self) -> Vec<LeaveRequest> {
        self.lock().leave_requests.clone()
    }
}

#[async_trait]
impl PresenceStore for MemoryStore {
    async fn find_employee(
        &self,
        tenant: &TenantId,
        employee: &EmployeeId,
    ) -> StoreResult<Option<Employee>> {
        Ok(self
            .lock()
            .employees
            .iter()
            .find(|e| &e.tenant_id == tenant && &e.id == employee)
            .cloned())
    }

    async fn find_employee_by_phone(
        &self,
        tenant: &TenantId,
        phone: &str,
    ) -> StoreResult<Option<Employee>> {
        Ok(self
            .lock()
            .employees
            .iter()
            .find(|e| &e.tenant_id == tenant && e.phone == phone)
            .cloned())
    }

    async fn find_manager(&self, tenant: &TenantId) -> StoreResult<Option<Employee>> {
        Ok(self
            .lock()
            .employees
            .iter()
            .filter(|e| &e.tenant_id == tenant && e.is_manager())
            .min_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.id.as_str().cmp(b.id.as_str()))
            })
            .cloned())
    }

    async fn find_site(&self, tenant: &TenantId, site: &SiteId) -> StoreResult<Option<Site>> {
        Ok(self
            .lock()
            .sites
            .iter()
            .find(|s| &s.tenant_id == tenant && &s.id == site)
            .cloned())
    }

    async fn open_session(&self, session: NewSession) -> StoreResult<OpenOutcome> {
        let mut inner = self.lock();
        let day = session.work_date();
        if let Some(existing) = inner.sessions.iter().find(|s| {
            s.tenant_id == session.tenant_id
                && s.employee_id == session.employee_id
                && s.work_date == day
        }) {
            return Ok(OpenOutcome::AlreadyExists(existing.clone()));
        }
        let opened = session.into_session();
        inner.sessions.push(opened.clone());
        Ok(OpenOutcome::Opened(opened))
    }

    async fn close_latest_open_session(
        &self,
        tenant: &TenantId,
        employee: &EmployeeId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<AttendanceSession>> {
        let mut inner = self.lock();
        let latest = inner
            .sessions
            .iter_mut()
            .filter(|s| &s.tenant_id == tenant && &s.employee_id == employee && s.is_open())
            .max_by_key(|s| s.check_in);

        Ok(latest.map(|s| {
            s.check_out = Some(now);
            s.clone()
        }))
    }

    async fn sessions_between(
        &self,
        tenant: &TenantId,
        employee: &EmployeeId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<AttendanceSession>> {
        let mut found: Vec<_> = self
            .lock()
            .sessions
            .iter()
            .filter(|s| {
                &s.tenant_id == tenant
                    && &s.employee_id == employee
                    && s.check_in >= from
                    && s.check_in <= to
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.check_in.cmp(&a.check_in));
        Ok(found)
    }

    async fn insert_leave_request(&self, request: &LeaveRequest) -> StoreResult<()> {
        self.lock().leave_requests.push(request.clone());
        Ok(())
    }

    async fn decide_pending_leave(
        &self,
        tenant: &TenantId,
        id_prefix: &str,
        decision: LeaveStatus,
    ) -> StoreResult<Option<LeaveRequest>> {
        let mut inner = self.lock();
        let Inner {
            employees,
            leave_requests,
            ..
        } = &mut *inner;

        let target = leave_requests
            .iter_mut()
            .filter(|r| {
                &r.tenant_id == tenant
                    && !r.status.is_terminal()
                    && r.id.starts_with(id_prefix)
            })
            .min_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            });

        let Some(request) = target else {
            return Ok(None);
        };
        request.status = decision;

        if decision == LeaveStatus::Approved {
            if let Some(employee) = employees
                .iter_mut()
                .find(|e| &e.tenant_id == tenant && e.id == request.employee_id)
            {
                employee.leave_balance -= 1.0;
            }
        }
        Ok(Some(request.clone()))
    }

    async fn latest_leave_request(
        &self,
        tenant: &TenantId,
        employee: &EmployeeId,
    ) -> StoreResult<Option<LeaveRequest>> {
        Ok(self
            .lock()
            .leave_requests
            .iter()
            .filter(|r| &r.tenant_id == tenant && &r.employee_id == employee)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn recent_senders(
        &self,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<(TenantId, String, EmployeeId)>> {
        let inner = self.lock();
        let mut senders: Vec<_> = inner
            .employees
            .iter()
            .filter(|e| e.is_active())
            .filter(|e| {
                inner.sessions.iter().any(|s| {
                    s.tenant_id == e.tenant_id && s.employee_id == e.id && s.check_in >= since
                })
            })
            .map(|e| (e.tenant_id.clone(), e.phone.clone(), e.id.clone()))
            .collect();
        senders.dedup();
        Ok(senders)
    }
}
