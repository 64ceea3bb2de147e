use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::geofence::{self, Coordinate, GeofenceVerdict};
use super::{WorkflowReply, format_clock, format_minutes};
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::attendance::{AttendanceSession, NewSession, OpenOutcome};
use crate::model::employee::Employee;
use crate::store::PresenceStore;

/// Per (employee, UTC day): NoSession -> Open -> Closed.
pub struct SessionTracker<'a> {
    store: &'a dyn PresenceStore,
}

#[derive(Debug, Clone)]
pub struct CheckedIn {
    pub session: AttendanceSession,
    pub verdict: GeofenceVerdict,
}

impl CheckedIn {
    pub fn reply(&self) -> WorkflowReply {
        let mut text = format!("Checked in at {}.", format_clock(self.session.check_in));
        if let Some(warning) = self.verdict.warning_text() {
            text.push(' ');
            text.push_str(&warning);
        }
        WorkflowReply::ok(text)
    }
}

#[derive(Debug, Clone)]
pub struct CheckedOut {
    pub session: AttendanceSession,
    pub worked_minutes: i64,
}

impl CheckedOut {
    pub fn duration(&self) -> String {
        format_minutes(self.worked_minutes)
    }

    pub fn reply(&self) -> WorkflowReply {
        WorkflowReply::ok(format!("Checked out. Time worked: {}.", self.duration()))
    }
}

impl<'a> SessionTracker<'a> {
    pub fn new(store: &'a dyn PresenceStore) -> Self {
        Self { store }
    }

    /// Geofence verdict for `employee` at `coord`, without touching sessions.
    pub async fn evaluate_location(
        &self,
        employee: &Employee,
        coord: Option<Coordinate>,
    ) -> WorkflowResult<GeofenceVerdict> {
        let site = match &employee.site_id {
            Some(site_id) => self.store.find_site(&employee.tenant_id, site_id).await?,
            None => None,
        };
        Ok(geofence::evaluate(employee.work_profile, coord, site.as_ref()))
    }

    pub async fn check_in(
        &self,
        employee: &Employee,
        now: DateTime<Utc>,
        coord: Option<Coordinate>,
    ) -> WorkflowResult<CheckedIn> {
        let verdict = self.evaluate_location(employee, coord).await?;

        let outcome = self
            .store
            .open_session(NewSession {
                id: Uuid::new_v4().to_string(),
                tenant_id: employee.tenant_id.clone(),
                employee_id: employee.id.clone(),
                check_in: now,
                latitude: coord.map(|c| c.latitude),
                longitude: coord.map(|c| c.longitude),
                distance_m: verdict.distance_m,
                flagged: verdict.warn,
            })
            .await?;

        match outcome {
            OpenOutcome::Opened(session) => {
                info!(
                    tenant_id = %employee.tenant_id,
                    employee_id = %employee.id,
                    flagged = session.flagged,
                    distance_m = ?session.distance_m,
                    "Checked in"
                );
                Ok(CheckedIn { session, verdict })
            }
            OpenOutcome::AlreadyExists(existing) => {
                debug!(employee_id = %employee.id, "Duplicate check-in rejected");
                Err(WorkflowError::Conflict(format!(
                    "You already checked in today at {}.",
                    format_clock(existing.check_in)
                )))
            }
        }
    }

    pub async fn check_out(
        &self,
        employee: &Employee,
        now: DateTime<Utc>,
    ) -> WorkflowResult<CheckedOut> {
        let closed = self
            .store
            .close_latest_open_session(&employee.tenant_id, &employee.id, now)
            .await?
            .ok_or_else(|| {
                WorkflowError::Conflict(
                    "No open session found: please check in first.".to_string(),
                )
            })?;

        let worked_minutes = closed.worked_minutes(now);
        info!(
            tenant_id = %employee.tenant_id,
            employee_id = %employee.id,
            worked_minutes,
            "Checked out"
        );
        Ok(CheckedOut {
            session: closed,
            worked_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::WorkProfile;
    use crate::model::site::Site;
    use crate::model::tenant::{SiteId, TenantId};
    use crate::store::MemoryStore;
    use crate::testing::{at, employee};
    use chrono::Duration;

    fn store_with_site() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_site(Site {
            id: SiteId::from("hq"),
            tenant_id: TenantId::from("acme"),
            name: "HQ".into(),
            latitude: Some(48.8584),
            longitude: Some(2.2945),
            radius_m: Some(200),
        });
        store
    }

    #[actix_web::test]
    async fn check_in_then_out_reports_duration() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let tracker = SessionTracker::new(&store);

        let start = at(2026, 10, 12, 8, 0);
        let checked_in = tracker.check_in(&emp, start, None).await.unwrap();
        assert_eq!(checked_in.reply().text, "Checked in at 08:00.");

        let out = tracker
            .check_out(&emp, start + Duration::minutes(545) + Duration::seconds(59))
            .await
            .unwrap();
        assert_eq!(out.duration(), "9h05");
        assert!(out.session.check_out.is_some());
    }

    #[actix_web::test]
    async fn second_check_in_same_day_is_rejected_even_after_checkout() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let tracker = SessionTracker::new(&store);

        tracker.check_in(&emp, at(2026, 10, 12, 8, 0), None).await.unwrap();
        tracker.check_out(&emp, at(2026, 10, 12, 12, 0)).await.unwrap();

        let err = tracker
            .check_in(&emp, at(2026, 10, 12, 13, 0), None)
            .await
            .unwrap_err();
        match err {
            WorkflowError::Conflict(msg) => assert!(msg.contains("08:00"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(store.sessions().len(), 1);
    }

    #[actix_web::test]
    async fn new_day_restarts_the_state_machine() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let tracker = SessionTracker::new(&store);

        tracker.check_in(&emp, at(2026, 10, 12, 8, 0), None).await.unwrap();
        tracker.check_out(&emp, at(2026, 10, 12, 17, 0)).await.unwrap();
        tracker.check_in(&emp, at(2026, 10, 13, 8, 0), None).await.unwrap();
        assert_eq!(store.sessions().len(), 2);
    }

    #[actix_web::test]
    async fn check_out_without_session_is_a_conflict() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let err = SessionTracker::new(&store)
            .check_out(&emp, at(2026, 10, 12, 17, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));
    }

    #[actix_web::test]
    async fn check_out_closes_the_most_recent_open_session() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let tracker = SessionTracker::new(&store);

        // yesterday's session was never closed
        tracker.check_in(&emp, at(2026, 10, 12, 8, 0), None).await.unwrap();
        tracker.check_in(&emp, at(2026, 10, 13, 9, 0), None).await.unwrap();

        let out = tracker.check_out(&emp, at(2026, 10, 13, 10, 30)).await.unwrap();
        assert_eq!(out.session.check_in, at(2026, 10, 13, 9, 0));
        assert_eq!(out.duration(), "1h30");
    }

    #[actix_web::test]
    async fn concurrent_check_ins_open_exactly_one_session() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let tracker = SessionTracker::new(&store);
        let now = at(2026, 10, 12, 8, 0);

        let (a, b) = futures::future::join(
            tracker.check_in(&emp, now, None),
            tracker.check_in(&emp, now + Duration::seconds(1), None),
        )
        .await;

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let open = store.sessions().iter().filter(|s| s.is_open()).count();
        assert_eq!(open, 1);
    }

    #[actix_web::test]
    async fn sessions_are_isolated_per_tenant() {
        let store = MemoryStore::new();
        let a = employee("acme", "e1", "+100");
        let b = employee("globex", "e1", "+100");
        let tracker = SessionTracker::new(&store);
        let now = at(2026, 10, 12, 8, 0);

        tracker.check_in(&a, now, None).await.unwrap();
        tracker.check_in(&b, now, None).await.unwrap();
        tracker.check_out(&a, now + Duration::hours(1)).await.unwrap();

        let err = tracker.check_out(&a, now + Duration::hours(2)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));
        tracker.check_out(&b, now + Duration::hours(2)).await.unwrap();
    }

    #[actix_web::test]
    async fn sedentary_check_in_records_flagged_location() {
        let store = store_with_site();
        let mut emp = employee("acme", "e1", "+100");
        emp.work_profile = WorkProfile::Sedentary;
        emp.site_id = Some(SiteId::from("hq"));
        let tracker = SessionTracker::new(&store);

        let checked_in = tracker
            .check_in(&emp, at(2026, 10, 12, 8, 0), Some(Coordinate::new(48.8700, 2.2945)))
            .await
            .unwrap();

        assert!(checked_in.session.flagged);
        assert!(checked_in.session.distance_m.unwrap() > 1000);
        assert!(checked_in.reply().text.contains("flagged"));
        assert!(checked_in.reply().ok);
    }

    #[actix_web::test]
    async fn evaluate_location_does_not_open_a_session() {
        let store = store_with_site();
        let mut emp = employee("acme", "e1", "+100");
        emp.work_profile = WorkProfile::Sedentary;
        emp.site_id = Some(SiteId::from("hq"));

        let verdict = SessionTracker::new(&store)
            .evaluate_location(&emp, Some(Coordinate::new(48.8600, 2.2945)))
            .await
            .unwrap();
        assert!(!verdict.warn);
        assert!(store.sessions().is_empty());
    }
}
