//! Read-only projections over sessions and leave history.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{format_clock, format_minutes};
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::attendance::AttendanceSession;
use crate::model::leave_request::LeaveRequest;
use crate::model::tenant::{EmployeeId, TenantId};
use crate::store::PresenceStore;

pub const DEFAULT_HISTORY_DAYS: u32 = 7;
pub const MAX_HISTORY_DAYS: u32 = 90;

pub struct WeeklyAggregator<'a> {
    store: &'a dyn PresenceStore,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WeeklySummary {
    #[schema(value_type = String, format = "date-time")]
    pub window_start: DateTime<Utc>,
    pub total_minutes: i64,
    pub days_worked: usize,
    pub ongoing_session: bool,
    pub last_leave: Option<LeaveRequest>,
    pub leave_balance: f64,
}

impl WeeklySummary {
    pub fn render(&self) -> String {
        let mut lines = vec![
            format!("Week of {}", self.window_start.format("%d/%m/%Y")),
            format!(
                "Worked: {} over {} day(s)",
                format_minutes(self.total_minutes),
                self.days_worked
            ),
        ];
        if self.ongoing_session {
            lines.push("A session is in progress.".to_string());
        }
        match &self.last_leave {
            Some(leave) => lines.push(format!(
                "Last leave request: {} ({})",
                leave.leave_date.format("%d/%m/%Y"),
                leave.status.as_ref().to_lowercase()
            )),
            None => lines.push("No leave requests.".to_string()),
        }
        lines.push(format!("Leave balance: {} day(s)", self.leave_balance));
        lines.join("\n")
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryEntry {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = String, format = "date-time")]
    pub check_in: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub check_out: Option<DateTime<Utc>>,
    /// `None` while the session is open.
    pub minutes: Option<i64>,
    pub flagged: bool,
}

impl HistoryEntry {
    fn from_session(session: &AttendanceSession) -> Self {
        Self {
            date: session.work_date,
            check_in: session.check_in,
            check_out: session.check_out,
            minutes: session
                .check_out
                .map(|out| (out - session.check_in).num_minutes().max(0)),
            flagged: session.flagged,
        }
    }

    pub fn render(&self) -> String {
        let mut line = format!(
            "{} {} → ",
            self.date.format("%Y-%m-%d"),
            format_clock(self.check_in)
        );
        match (self.check_out, self.minutes) {
            (Some(out), Some(minutes)) => {
                line.push_str(&format!("{} ({})", format_clock(out), format_minutes(minutes)))
            }
            _ => line.push_str("in progress"),
        }
        if self.flagged {
            line.push_str(" [location flagged]");
        }
        line
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct History {
    pub days: u32,
    pub entries: Vec<HistoryEntry>,
}

impl History {
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return format!("No attendance recorded in the last {} days.", self.days);
        }
        let mut lines = vec![format!("Last {} days:", self.days)];
        lines.extend(self.entries.iter().map(HistoryEntry::render));
        lines.join("\n")
    }
}

/// Monday 00:00 UTC of the week containing `now`.
pub fn week_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    monday.and_time(NaiveTime::MIN).and_utc()
}

impl<'a> WeeklyAggregator<'a> {
    pub fn new(store: &'a dyn PresenceStore) -> Self {
        Self { store }
    }

    pub async fn summarize(
        &self,
        employee_id: &EmployeeId,
        tenant_id: &TenantId,
        now: DateTime<Utc>,
    ) -> WorkflowResult<WeeklySummary> {
        let employee = self
            .store
            .find_employee(tenant_id, employee_id)
            .await?
            .ok_or(WorkflowError::NotFound("employee"))?;

        let window_start = week_start(now);
        let sessions = self
            .store
            .sessions_between(tenant_id, employee_id, window_start, now)
            .await?;

        let mut total_minutes = 0;
        let mut ongoing_session = false;
        let mut days = BTreeSet::new();
        for session in &sessions {
            total_minutes += session.worked_minutes(now);
            ongoing_session |= session.is_open();
            days.insert(session.check_in.date_naive());
        }

        let last_leave = self
            .store
            .latest_leave_request(tenant_id, employee_id)
            .await?;

        Ok(WeeklySummary {
            window_start,
            total_minutes,
            days_worked: days.len(),
            ongoing_session,
            last_leave,
            leave_balance: employee.leave_balance,
        })
    }

    /// Sessions over the trailing `days`, newest first. `days` is clamped to 1..=90.
    pub async fn history(
        &self,
        employee_id: &EmployeeId,
        tenant_id: &TenantId,
        days: u32,
        now: DateTime<Utc>,
    ) -> WorkflowResult<History> {
        let days = days.clamp(1, MAX_HISTORY_DAYS);
        let from = now - Duration::days(days as i64);
        let sessions = self
            .store
            .sessions_between(tenant_id, employee_id, from, now)
            .await?;

        Ok(History {
            days,
            entries: sessions.iter().map(HistoryEntry::from_session).collect(),
        })
    }
}
