use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::tenant::{EmployeeId, TenantId};

/// Length of the ID prefix handed to managers.
pub const SHORT_ID_LEN: usize = 8;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    /// Approved and rejected requests never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequest {
    /// Lowercase hyphenated UUID.
    pub id: String,
    pub tenant_id: TenantId,
    pub employee_id: EmployeeId,
    #[schema(value_type = String, format = "date")]
    pub leave_date: NaiveDate,
    /// 00:00:00 of `leave_date`, inclusive.
    #[schema(value_type = String, format = "date-time")]
    pub starts_at: DateTime<Utc>,
    /// 23:59:59 of `leave_date`, inclusive.
    #[schema(value_type = String, format = "date-time")]
    pub ends_at: DateTime<Utc>,
    pub status: LeaveStatus,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn short_id(&self) -> &str {
        let end = self.id.len().min(SHORT_ID_LEN);
        &self.id[..end]
    }
}
