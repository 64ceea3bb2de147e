//! The attendance and leave workflow engine.
//!
//! Services borrow a [`PresenceStore`](crate::store::PresenceStore), take
//! `now` from the caller and return addressed payloads; nothing in here
//! delivers messages.

pub mod geofence;
pub mod leave_parser;
pub mod leave_workflow;
pub mod router;
pub mod session_tracker;
pub mod weekly_report;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Side-channel message the caller must deliver, e.g. to a manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    #[schema(example = "+221770000009")]
    pub to: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "ok": true,
    "text": "Checked in at 08:02.",
    "notification": null
}))]
pub struct WorkflowReply {
    pub ok: bool,
    /// Text for the sender.
    pub text: String,
    #[schema(nullable = true)]
    pub notification: Option<Notification>,
}

impl WorkflowReply {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            ok: true,
            text: text.into(),
            notification: None,
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            ok: false,
            text: text.into(),
            notification: None,
        }
    }

    pub fn notify(mut self, to: impl Into<String>, text: impl Into<String>) -> Self {
        self.notification = Some(Notification {
            to: to.into(),
            text: text.into(),
        });
        self
    }
}

/// `HhMM`, e.g. `8h05`.
pub fn format_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{}h{:02}", minutes / 60, minutes % 60)
}

pub fn format_clock(at: DateTime<Utc>) -> String {
    at.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_render_as_hours_and_padded_minutes() {
        assert_eq!(format_minutes(0), "0h00");
        assert_eq!(format_minutes(485), "8h05");
        assert_eq!(format_minutes(600), "10h00");
        assert_eq!(format_minutes(-3), "0h00");
    }
}
