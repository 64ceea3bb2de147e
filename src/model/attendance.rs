use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::tenant::{EmployeeId, TenantId};

pub const STATUS_PRESENT: &str = "PRESENT";

/// One continuous work interval. `check_out == None` means the session is still open.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSession {
    pub id: String,
    pub tenant_id: TenantId,
    pub employee_id: EmployeeId,
    /// UTC calendar day of `check_in`; unique per employee.
    #[schema(value_type = String, format = "date")]
    pub work_date: NaiveDate,
    #[schema(value_type = String, format = "date-time")]
    pub check_in: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub check_out: Option<DateTime<Utc>>,
    pub status: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance_m: Option<u32>,
    /// Check-in location could not be confirmed or was outside the site radius.
    pub flagged: bool,
}

impl AttendanceSession {
    pub fn is_open(&self) -> bool {
        self.check_out.is_none()
    }

    /// Whole minutes worked, measuring open sessions up to `now`. Never negative.
    pub fn worked_minutes(&self, now: DateTime<Utc>) -> i64 {
        let end = self.check_out.unwrap_or(now);
        (end - self.check_in).num_minutes().max(0)
    }
}

/// Everything needed to open a session; the store assigns nothing but enforces uniqueness.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: String,
    pub tenant_id: TenantId,
    pub employee_id: EmployeeId,
    pub check_in: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance_m: Option<u32>,
    pub flagged: bool,
}

impl NewSession {
    pub fn work_date(&self) -> NaiveDate {
        self.check_in.date_naive()
    }

    pub fn into_session(self) -> AttendanceSession {
        AttendanceSession {
            work_date: self.work_date(),
            id: self.id,
            tenant_id: self.tenant_id,
            employee_id: self.employee_id,
            check_in: self.check_in,
            check_out: None,
            status: STATUS_PRESENT.to_string(),
            latitude: self.latitude,
            longitude: self.longitude,
            distance_m: self.distance_m,
            flagged: self.flagged,
        }
    }
}

/// Result of the atomic check-in write.
#[derive(Debug, Clone)]
pub enum OpenOutcome {
    Opened(AttendanceSession),
    /// A session already exists for that UTC day (open or closed).
    AlreadyExists(AttendanceSession),
}
