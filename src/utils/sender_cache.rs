use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use moka::future::Cache;

use crate::error::{WorkflowError, WorkflowResult};
use crate::model::employee::Employee;
use crate::model::tenant::{EmployeeId, TenantId};
use crate::store::PresenceStore;
use crate::utils::phone;

type SenderKey = (TenantId, String);

/// (tenant, normalized phone) => employee id.
///
/// Only the mapping is cached; the employee row is reloaded on every
/// message so role, status and site changes apply immediately.
pub struct SenderCache {
    cache: Cache<SenderKey, EmployeeId>,
}

impl SenderCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(500_000) // tune based on memory
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Resolves an inbound sender to an active employee of `tenant`.
    pub async fn resolve(
        &self,
        store: &dyn PresenceStore,
        tenant: &TenantId,
        raw_phone: &str,
    ) -> WorkflowResult<Employee> {
        let phone = phone::normalize(raw_phone);
        if phone.is_empty() {
            return Err(WorkflowError::UnknownSender);
        }
        let key = (tenant.clone(), phone.clone());

        // 1️⃣ cached id, reloaded from the store
        if let Some(employee_id) = self.cache.get(&key).await {
            match store.find_employee(tenant, &employee_id).await? {
                Some(e) if e.is_active() && e.phone == phone => return Ok(e),
                _ => self.cache.invalidate(&key).await,
            }
        }

        // 2️⃣ store lookup by phone
        match store.find_employee_by_phone(tenant, &phone).await? {
            Some(e) if e.is_active() => {
                self.cache.insert(key, e.id.clone()).await;
                Ok(e)
            }
            _ => Err(WorkflowError::UnknownSender),
        }
    }

    async fn batch_insert(&self, senders: Vec<(TenantId, String, EmployeeId)>) {
        let futures: Vec<_> = senders
            .into_iter()
            .map(|(tenant, phone, id)| self.cache.insert((tenant, phone), id))
            .collect();

        // Await all insertions concurrently
        futures::future::join_all(futures).await;
    }

    /// Preloads senders who checked in during the last `days` days.
    pub async fn warmup(
        &self,
        store: &dyn PresenceStore,
        days: u32,
        batch_size: usize,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let since = now - chrono::Duration::days(days as i64);
        let mut senders = store.recent_senders(since).await?;
        let total = senders.len();

        while !senders.is_empty() {
            let rest = senders.split_off(senders.len().min(batch_size.max(1)));
            self.batch_insert(senders).await;
            senders = rest;
        }

        log::info!(
            "Sender cache warmup complete: {} recent senders (last {} days)",
            total,
            days
        );
        Ok(total)
    }

    #[cfg(test)]
    pub async fn contains(&self, tenant: &TenantId, phone: &str) -> bool {
        self.cache
            .get(&(tenant.clone(), phone.to_string()))
            .await
            .is_some()
    }
}
