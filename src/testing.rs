//! Fixtures shared by the unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::model::employee::Employee;
use crate::model::role::{EmployeeStatus, Role, WorkProfile};
use crate::model::tenant::{EmployeeId, TenantId};

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid test timestamp")
}

pub fn employee(tenant: &str, id: &str, phone: &str) -> Employee {
    Employee {
        id: EmployeeId::from(id),
        tenant_id: TenantId::from(tenant),
        name: format!("Employee {id}"),
        phone: phone.to_string(),
        work_profile: WorkProfile::Mobile,
        site_id: None,
        role: Role::Employee,
        status: EmployeeStatus::Active,
        leave_balance: 10.0,
        created_at: at(2026, 1, 1, 0, 0),
    }
}

pub fn manager(tenant: &str, id: &str, phone: &str) -> Employee {
    Employee {
        role: Role::Manager,
        name: format!("Manager {id}"),
        ..employee(tenant, id, phone)
    }
}
