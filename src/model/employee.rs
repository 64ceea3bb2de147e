use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::role::{EmployeeStatus, Role, WorkProfile};
use super::tenant::{EmployeeId, SiteId, TenantId};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": "emp-001",
        "tenant_id": "acme",
        "name": "Awa Diallo",
        "phone": "+221770000001",
        "work_profile": "SEDENTARY",
        "site_id": "site-hq",
        "role": "EMPLOYEE",
        "status": "ACTIVE",
        "leave_balance": 12.5,
        "created_at": "2026-01-05T08:00:00Z"
    })
)]
pub struct Employee {
    pub id: EmployeeId,
    pub tenant_id: TenantId,
    pub name: String,
    /// Normalized phone number, unique within the tenant.
    pub phone: String,
    pub work_profile: WorkProfile,
    pub site_id: Option<SiteId>,
    pub role: Role,
    pub status: EmployeeStatus,
    /// Days.
    pub leave_balance: f64,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl Employee {
    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }

    pub fn is_manager(&self) -> bool {
        self.is_active() && self.role == Role::Manager
    }
}
