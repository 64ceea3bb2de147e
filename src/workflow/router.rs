//! Turns one inbound chat message into a call on the services above.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::WorkflowReply;
use super::geofence::Coordinate;
use super::leave_parser;
use super::leave_workflow::LeaveWorkflow;
use super::session_tracker::SessionTracker;
use super::weekly_report::{DEFAULT_HISTORY_DAYS, WeeklyAggregator};
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::employee::Employee;
use crate::store::PresenceStore;

pub const HELP_TEXT: &str = "Commands: IN (check in, or share your location), OUT (check out), \
LEAVE DD/MM (request a day off), WEEK (weekly summary), HISTORY [days].";

#[derive(Debug, Clone, PartialEq)]
pub enum InboundCommand {
    CheckIn(Option<Coordinate>),
    CheckOut,
    RequestLeave(String),
    WeeklySummary,
    History(u32),
    ManagerDecision(String),
    Help,
}

/// Uppercases and strips French accents so `Arrivée` and `ARRIVEE` compare equal.
fn fold(word: &str) -> String {
    word.chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'à' | 'â' | 'À' | 'Â' => 'A',
            'ç' | 'Ç' => 'C',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Pure classification. `is_manager` enables the decision fallback.
pub fn classify(text: &str, location: Option<Coordinate>, is_manager: bool) -> InboundCommand {
    if location.is_some() {
        return InboundCommand::CheckIn(location);
    }

    let trimmed = text.trim();
    let mut words = trimmed.split_whitespace();
    let first = words.next().map(fold).unwrap_or_default();
    let rest = trimmed[trimmed.find(char::is_whitespace).unwrap_or(trimmed.len())..].trim();

    match first.as_str() {
        "ARRIVEE" | "ARRIVE" | "IN" | "CHECKIN" | "BONJOUR" => InboundCommand::CheckIn(None),
        "DEPART" | "OUT" | "CHECKOUT" | "BYE" => InboundCommand::CheckOut,
        "CONGE" | "LEAVE" => InboundCommand::RequestLeave(rest.to_string()),
        "BILAN" | "SEMAINE" | "WEEK" | "SUMMARY" => InboundCommand::WeeklySummary,
        "HISTORIQUE" | "HISTORY" => InboundCommand::History(
            words
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(DEFAULT_HISTORY_DAYS),
        ),
        _ if is_manager && leave_parser::parse_decision(trimmed).is_ok() => {
            InboundCommand::ManagerDecision(trimmed.to_string())
        }
        _ => InboundCommand::Help,
    }
}

pub struct InboundRouter<'a> {
    store: &'a dyn PresenceStore,
}

impl<'a> InboundRouter<'a> {
    pub fn new(store: &'a dyn PresenceStore) -> Self {
        Self { store }
    }

    /// Runs the command for an already-resolved sender.
    /// Validation and conflict errors come back as failed replies; storage errors propagate.
    pub async fn handle(
        &self,
        sender: &Employee,
        text: &str,
        location: Option<Coordinate>,
        now: DateTime<Utc>,
    ) -> WorkflowResult<WorkflowReply> {
        let command = classify(text, location, sender.is_manager());
        debug!(employee_id = %sender.id, ?command, "Inbound command");

        let result = match command {
            InboundCommand::CheckIn(coord) => SessionTracker::new(self.store)
                .check_in(sender, now, coord)
                .await
                .map(|c| c.reply()),
            InboundCommand::CheckOut => SessionTracker::new(self.store)
                .check_out(sender, now)
                .await
                .map(|c| c.reply()),
            InboundCommand::RequestLeave(date_text) => LeaveWorkflow::new(self.store)
                .create_request(sender, &date_text, now)
                .await
                .map(|c| c.reply(sender)),
            InboundCommand::ManagerDecision(reply) => LeaveWorkflow::new(self.store)
                .apply_manager_decision(sender, &reply)
                .await
                .map(|d| d.reply()),
            InboundCommand::WeeklySummary => WeeklyAggregator::new(self.store)
                .summarize(&sender.id, &sender.tenant_id, now)
                .await
                .map(|s| WorkflowReply::ok(s.render())),
            InboundCommand::History(days) => WeeklyAggregator::new(self.store)
                .history(&sender.id, &sender.tenant_id, days, now)
                .await
                .map(|h| WorkflowReply::ok(h.render())),
            InboundCommand::Help => Ok(WorkflowReply::failed(HELP_TEXT)),
        };

        match result {
            Ok(reply) => Ok(reply),
            Err(e @ WorkflowError::Storage(_)) => Err(e),
            Err(e) => Ok(WorkflowReply::failed(e.user_message())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{at, employee, manager};

    #[test]
    fn location_always_means_check_in() {
        let here = Coordinate::new(1.0, 2.0);
        assert_eq!(
            classify("OUT", Some(here), false),
            InboundCommand::CheckIn(Some(here))
        );
    }

    #[test]
    fn keywords_ignore_case_and_accents() {
        assert_eq!(classify("Arrivée", None, false), InboundCommand::CheckIn(None));
        assert_eq!(classify("  départ ", None, false), InboundCommand::CheckOut);
        assert_eq!(
            classify("Congé 05/09", None, false),
            InboundCommand::RequestLeave("05/09".into())
        );
        assert_eq!(classify("bilan", None, false), InboundCommand::WeeklySummary);
    }

    #[test]
    fn history_takes_an_optional_day_count() {
        assert_eq!(classify("history 14", None, false), InboundCommand::History(14));
        assert_eq!(
            classify("HISTORIQUE", None, false),
            InboundCommand::History(DEFAULT_HISTORY_DAYS)
        );
    }

    #[test]
    fn decisions_only_from_managers() {
        assert_eq!(
            classify("OK #abc", None, true),
            InboundCommand::ManagerDecision("OK #abc".into())
        );
        assert_eq!(classify("OK #abc", None, false), InboundCommand::Help);
    }

    #[actix_web::test]
    async fn conflicts_become_failed_replies() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let router = InboundRouter::new(&store);

        let reply = router.handle(&emp, "OUT", None, at(2026, 10, 12, 17, 0)).await.unwrap();
        assert!(!reply.ok);
        assert!(reply.text.contains("check in first"));
    }

    #[actix_web::test]
    async fn full_leave_round_trip_through_text() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let boss = manager("acme", "m1", "+900");
        store.add_employee(emp.clone());
        store.add_employee(boss.clone());
        let router = InboundRouter::new(&store);
        let now = at(2026, 10, 12, 9, 0);

        let asked = router.handle(&emp, "LEAVE 20/10", None, now).await.unwrap();
        assert!(asked.ok);
        let to_manager = asked.notification.unwrap();
        assert_eq!(to_manager.to, "+900");

        let short_id = store.leave_requests()[0].id[..8].to_string();
        let decided = router
            .handle(&boss, &format!("ok #{short_id}"), None, now)
            .await
            .unwrap();
        assert!(decided.ok, "{}", decided.text);
        assert_eq!(decided.notification.unwrap().to, "+100");
    }

    #[actix_web::test]
    async fn unknown_text_gets_help() {
        let store = MemoryStore::new();
        let emp = employee("acme", "e1", "+100");
        let reply = InboundRouter::new(&store)
            .handle(&emp, "what?", None, at(2026, 10, 12, 9, 0))
            .await
            .unwrap();
        assert_eq!(reply.text, HELP_TEXT);
    }
}
