use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::WorkflowReply;
use super::leave_parser::{self, Decision};
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::store::PresenceStore;

/// Leave request creation and manager decisions, always inside one tenant.
pub struct LeaveWorkflow<'a> {
    store: &'a dyn PresenceStore,
}

#[derive(Debug, Clone)]
pub struct LeaveCreated {
    pub request: LeaveRequest,
    pub manager: Employee,
}

impl LeaveCreated {
    /// Confirmation for the employee plus the notification routed to the manager.
    pub fn reply(&self, employee: &Employee) -> WorkflowReply {
        let date = self.request.leave_date.format("%d/%m/%Y");
        let short_id = self.request.short_id();
        WorkflowReply::ok(format!(
            "Leave request #{short_id} for {date} sent to {}.",
            self.manager.name
        ))
        .notify(
            &self.manager.phone,
            format!(
                "{} requests leave on {date}. Reply OK #{short_id} to approve or NON #{short_id} to reject.",
                employee.name
            ),
        )
    }
}

#[derive(Debug, Clone)]
pub struct LeaveDecided {
    pub request: LeaveRequest,
    /// `None` if the requester has since been removed from the store.
    pub employee: Option<Employee>,
}

impl LeaveDecided {
    pub fn decision_text(&self) -> &'static str {
        match self.request.status {
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
            LeaveStatus::Pending => "pending",
        }
    }

    pub fn reply(&self) -> WorkflowReply {
        let date = self.request.leave_date.format("%d/%m/%Y");
        let decision = self.decision_text();
        let reply = WorkflowReply::ok(format!(
            "Leave request #{} {decision}.",
            self.request.short_id()
        ));
        match &self.employee {
            Some(employee) => reply.notify(
                &employee.phone,
                format!("Your leave request for {date} was {decision}."),
            ),
            None => reply,
        }
    }
}

impl<'a> LeaveWorkflow<'a> {
    pub fn new(store: &'a dyn PresenceStore) -> Self {
        Self { store }
    }

    /// Persists a PENDING request, then routes it to the tenant's manager.
    /// Without a manager the request stays stored and a configuration error is returned.
    pub async fn create_request(
        &self,
        employee: &Employee,
        date_text: &str,
        now: DateTime<Utc>,
    ) -> WorkflowResult<LeaveCreated> {
        let window = leave_parser::parse_leave_date(date_text, now.date_naive()).map_err(|e| {
            debug!(employee_id = %employee.id, "Leave date not understood");
            WorkflowError::Validation(e.to_string())
        })?;

        let request = LeaveRequest {
            id: Uuid::new_v4().to_string(),
            tenant_id: employee.tenant_id.clone(),
            employee_id: employee.id.clone(),
            leave_date: window.date,
            starts_at: window.starts_at,
            ends_at: window.ends_at,
            status: LeaveStatus::Pending,
            created_at: now,
        };
        self.store.insert_leave_request(&request).await?;

        info!(
            tenant_id = %employee.tenant_id,
            employee_id = %employee.id,
            request_id = %request.id,
            leave_date = %request.leave_date,
            "Leave request created"
        );

        let Some(manager) = self.store.find_manager(&employee.tenant_id).await? else {
            warn!(
                tenant_id = %employee.tenant_id,
                request_id = %request.id,
                "No manager configured, leave request left pending"
            );
            return Err(WorkflowError::Configuration(format!(
                "Leave request #{} recorded, but no manager is configured for your organisation. Please contact your administrator.",
                request.short_id()
            )));
        };

        Ok(LeaveCreated { request, manager })
    }

    /// Applies `OK #id` / `NON #id` to the oldest matching PENDING request of the manager's tenant.
    pub async fn apply_manager_decision(
        &self,
        manager: &Employee,
        message_text: &str,
    ) -> WorkflowResult<LeaveDecided> {
        if !manager.is_manager() {
            return Err(WorkflowError::Forbidden(
                "Only a manager can approve or reject leave.",
            ));
        }

        let command = leave_parser::parse_decision(message_text)
            .map_err(|e| WorkflowError::Validation(e.to_string()))?;
        let prefix = command.request_ref.as_deref().unwrap_or_default();

        let decided = self
            .store
            .decide_pending_leave(&manager.tenant_id, prefix, command.decision.status())
            .await?
            .ok_or_else(|| {
                WorkflowError::Conflict(format!(
                    "Leave request{} not found or already processed.",
                    command
                        .request_ref
                        .as_ref()
                        .map(|r| format!(" #{r}"))
                        .unwrap_or_default()
                ))
            })?;

        info!(
            tenant_id = %manager.tenant_id,
            manager_id = %manager.id,
            request_id = %decided.id,
            approved = command.decision == Decision::Approve,
            "Leave request decided"
        );

        let employee = self
            .store
            .find_employee(&decided.tenant_id, &decided.employee_id)
            .await?;

        Ok(LeaveDecided {
            request: decided,
            employee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{at, employee, manager};
    use chrono::{Duration, NaiveDate};

    #[actix_web::test]
    async fn request_is_routed_to_the_manager() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let boss = manager("acme", "m1", "+900");
        store.add_employee(emp.clone());
        store.add_employee(boss.clone());

        let created = LeaveWorkflow::new(&store)
            .create_request(&emp, "LEAVE 05/09/2026", at(2026, 8, 1, 9, 0))
            .await
            .unwrap();

        assert_eq!(created.manager.id, boss.id);
        assert_eq!(created.request.status, LeaveStatus::Pending);
        assert_eq!(created.request.short_id().len(), 8);

        let reply = created.reply(&emp);
        assert!(reply.text.contains(created.request.short_id()));
        let note = reply.notification.unwrap();
        assert_eq!(note.to, "+900");
        assert!(note.text.contains("05/09/2026"));
    }

    #[actix_web::test]
    async fn bad_date_is_a_validation_error_and_stores_nothing() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let err = LeaveWorkflow::new(&store)
            .create_request(&emp, "31/02", at(2026, 8, 1, 9, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert!(store.leave_requests().is_empty());
    }

    #[actix_web::test]
    async fn missing_manager_keeps_the_request() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        store.add_employee(emp.clone());
        // a manager elsewhere must not be picked up
        store.add_employee(manager("globex", "m1", "+900"));

        let err = LeaveWorkflow::new(&store)
            .create_request(&emp, "05/09", at(2026, 8, 1, 9, 0))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Configuration(_)));
        let stored = store.leave_requests();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, LeaveStatus::Pending);
    }

    #[actix_web::test]
    async fn earliest_active_manager_is_chosen() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let mut late = manager("acme", "m2", "+902");
        late.created_at = at(2026, 5, 1, 0, 0);
        let mut early = manager("acme", "m1", "+901");
        early.created_at = at(2026, 1, 1, 0, 0);
        let mut archived = manager("acme", "m0", "+900");
        archived.created_at = at(2025, 1, 1, 0, 0);
        archived.status = crate::model::role::EmployeeStatus::Archived;
        for e in [emp.clone(), late, early, archived] {
            store.add_employee(e);
        }

        let created = LeaveWorkflow::new(&store)
            .create_request(&emp, "05/09", at(2026, 8, 1, 9, 0))
            .await
            .unwrap();
        assert_eq!(created.manager.id.as_str(), "m1");
    }

    #[actix_web::test]
    async fn approval_is_terminal_and_not_repeatable() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let boss = manager("acme", "m1", "+900");
        store.add_employee(emp.clone());
        store.add_employee(boss.clone());
        let workflow = LeaveWorkflow::new(&store);

        let created = workflow
            .create_request(&emp, "05/09", at(2026, 8, 1, 9, 0))
            .await
            .unwrap();
        let reply = format!("OK #{}", created.request.short_id());

        let decided = workflow.apply_manager_decision(&boss, &reply).await.unwrap();
        assert_eq!(decided.request.status, LeaveStatus::Approved);
        let out = decided.reply();
        assert_eq!(out.notification.unwrap().to, "+100");

        let again = workflow.apply_manager_decision(&boss, &reply).await.unwrap_err();
        match again {
            WorkflowError::Conflict(msg) => assert!(msg.contains("already processed")),
            other => panic!("unexpected {other:?}"),
        }

        // balance moved exactly once
        let reloaded = store
            .find_employee(&emp.tenant_id, &emp.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.leave_balance, emp.leave_balance - 1.0);
    }

    #[actix_web::test]
    async fn rejection_leaves_balance_untouched() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let boss = manager("acme", "m1", "+900");
        store.add_employee(emp.clone());
        store.add_employee(boss.clone());
        let workflow = LeaveWorkflow::new(&store);

        let created = workflow
            .create_request(&emp, "05/09", at(2026, 8, 1, 9, 0))
            .await
            .unwrap();
        let decided = workflow
            .apply_manager_decision(&boss, &format!("non #{}", created.request.short_id()))
            .await
            .unwrap();
        assert_eq!(decided.request.status, LeaveStatus::Rejected);
        assert_eq!(decided.decision_text(), "rejected");

        let reloaded = store
            .find_employee(&emp.tenant_id, &emp.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.leave_balance, emp.leave_balance);
    }

    #[actix_web::test]
    async fn identical_prefixes_never_cross_tenants() {
        let store = MemoryStore::new();
        let acme_emp = employee("acme", "e1", "+100");
        let acme_boss = manager("acme", "m1", "+900");
        let globex_emp = employee("globex", "e1", "+100");
        let globex_boss = manager("globex", "m1", "+900");
        for e in [&acme_emp, &acme_boss, &globex_emp, &globex_boss] {
            store.add_employee(e.clone());
        }

        let date = NaiveDate::from_ymd_opt(2026, 9, 5).unwrap();
        let window = leave_parser::LeaveWindow::for_date(date);
        let pending = |id: &str, owner: &Employee, created_at| LeaveRequest {
            id: id.to_string(),
            tenant_id: owner.tenant_id.clone(),
            employee_id: owner.id.clone(),
            leave_date: date,
            starts_at: window.starts_at,
            ends_at: window.ends_at,
            status: LeaveStatus::Pending,
            created_at,
        };
        // globex's request is older, so a tenant-blind oldest-first match would pick it
        let globex_id = "deadbeef-0000-4000-8000-00000000000a";
        let acme_id = "deadbeef-0000-4000-8000-00000000000b";
        store
            .insert_leave_request(&pending(globex_id, &globex_emp, at(2026, 8, 1, 8, 0)))
            .await
            .unwrap();
        store
            .insert_leave_request(&pending(acme_id, &acme_emp, at(2026, 8, 1, 9, 0)))
            .await
            .unwrap();

        let status_of = |id: &str| {
            store
                .leave_requests()
                .into_iter()
                .find(|r| r.id == id)
                .map(|r| r.status)
        };

        let approved = LeaveWorkflow::new(&store)
            .apply_manager_decision(&acme_boss, "OK #deadbeef")
            .await
            .unwrap();
        assert_eq!(approved.request.id, acme_id);
        assert_eq!(approved.request.tenant_id, acme_boss.tenant_id);
        assert_eq!(approved.employee.unwrap().tenant_id, acme_boss.tenant_id);
        assert_eq!(status_of(acme_id), Some(LeaveStatus::Approved));
        assert_eq!(status_of(globex_id), Some(LeaveStatus::Pending));

        let globex_balance = store
            .find_employee(&globex_emp.tenant_id, &globex_emp.id)
            .await
            .unwrap()
            .unwrap()
            .leave_balance;
        assert_eq!(globex_balance, globex_emp.leave_balance);

        let rejected = LeaveWorkflow::new(&store)
            .apply_manager_decision(&globex_boss, "NON #deadbeef")
            .await
            .unwrap();
        assert_eq!(rejected.request.id, globex_id);
        assert_eq!(status_of(globex_id), Some(LeaveStatus::Rejected));
        assert_eq!(status_of(acme_id), Some(LeaveStatus::Approved));

        // both resolved: neither manager can reach anything else
        for boss in [&acme_boss, &globex_boss] {
            let err = LeaveWorkflow::new(&store)
                .apply_manager_decision(boss, "OK #deadbeef")
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::Conflict(_)));
        }
    }

    #[actix_web::test]
    async fn foreign_tenant_request_is_invisible() {
        let store = MemoryStore::new();
        let acme_emp = employee("acme", "e1", "+100");
        let globex_boss = manager("globex", "m1", "+900");
        store.add_employee(acme_emp.clone());
        store.add_employee(globex_boss.clone());

        LeaveWorkflow::new(&store)
            .create_request(&acme_emp, "05/09", at(2026, 8, 1, 9, 0))
            .await
            .unwrap_err(); // acme has no manager, the request stays pending
        let short_id = store.leave_requests()[0].short_id().to_string();

        let err = LeaveWorkflow::new(&store)
            .apply_manager_decision(&globex_boss, &format!("OK #{short_id}"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));
        assert_eq!(store.leave_requests()[0].status, LeaveStatus::Pending);
    }

    #[actix_web::test]
    async fn missing_reference_targets_oldest_pending() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let boss = manager("acme", "m1", "+900");
        store.add_employee(emp.clone());
        store.add_employee(boss.clone());
        let workflow = LeaveWorkflow::new(&store);
        let t0 = at(2026, 8, 1, 9, 0);

        let first = workflow.create_request(&emp, "05/09", t0).await.unwrap();
        workflow
            .create_request(&emp, "06/09", t0 + Duration::minutes(5))
            .await
            .unwrap();

        let decided = workflow.apply_manager_decision(&boss, "Oui").await.unwrap();
        assert_eq!(decided.request.id, first.request.id);
    }

    #[actix_web::test]
    async fn non_managers_cannot_decide() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let err = LeaveWorkflow::new(&store)
            .apply_manager_decision(&emp, "OK #1234")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));
    }

    #[actix_web::test]
    async fn unparsable_reply_returns_guidance() {
        let store = MemoryStore::new();
        let boss = manager("acme", "m1", "+900");
        let err = LeaveWorkflow::new(&store)
            .apply_manager_decision(&boss, "maybe later")
            .await
            .unwrap_err();
        match err {
            WorkflowError::Validation(msg) => assert!(msg.contains("OK #id")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
