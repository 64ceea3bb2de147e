pub mod attendance;
pub mod inbound;
pub mod leave_request;
pub mod report;

use crate::auth::auth::GatewayCaller;
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::employee::Employee;
use crate::model::tenant::{EmployeeId, TenantId};
use crate::store::PresenceStore;

/// Loads an active employee the caller is allowed to act for.
pub(crate) async fn load_employee(
    store: &dyn PresenceStore,
    caller: &GatewayCaller,
    tenant_id: &TenantId,
    employee_id: &EmployeeId,
) -> WorkflowResult<Employee> {
    caller.require_tenant(tenant_id)?;
    match store.find_employee(tenant_id, employee_id).await? {
        Some(employee) if employee.is_active() => Ok(employee),
        _ => Err(WorkflowError::UnknownSender),
    }
}
