//! Free-text parsing for leave requests and manager replies.
//!
//! Pure functions: no store, no clock beyond the `today` argument.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::model::leave_request::LeaveStatus;

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})[/-](\d{1,2})(?:[/-](\d+))?\b").expect("date regex")
});

static APPROVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(OK|OUI|APPROVE|VALIDE|ACCEPTE)\b").expect("approve regex"));

static REJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(NON|REFUSE|REJECT|REJETTE)\b").expect("reject regex"));

static REQUEST_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#([A-Za-z0-9]+)").expect("request ref regex"));

pub const DATE_FORMAT_HINT: &str =
    "Please give the date as DD/MM or DD/MM/YYYY, for example: LEAVE 05/09/2026";

pub const DECISION_FORMAT_HINT: &str =
    "Reply OK #id to approve or NON #id to reject, for example: OK #1a2b3c4d";

/// Why a piece of text could not be understood. The message is user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("Could not find a date. {hint}", hint = DATE_FORMAT_HINT)]
    NoDate,

    #[error("{0} is not a valid calendar date. {hint}", hint = DATE_FORMAT_HINT)]
    InvalidDate(String),

    #[error("Reply not understood. {hint}", hint = DECISION_FORMAT_HINT)]
    NoDecision,
}

/// A single leave day, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveWindow {
    pub date: NaiveDate,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl LeaveWindow {
    pub fn for_date(date: NaiveDate) -> Self {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        Self {
            date,
            starts_at: date.and_time(NaiveTime::MIN).and_utc(),
            ends_at: date.and_time(end_of_day).and_utc(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn status(self) -> LeaveStatus {
        match self {
            Decision::Approve => LeaveStatus::Approved,
            Decision::Reject => LeaveStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerCommand {
    pub decision: Decision,
    /// Lowercased request-ID fragment, if one was typed after `#`.
    pub request_ref: Option<String>,
}

/// Finds the first `DD/MM[/YY[YY]]` (or `-` separated) date in `text`.
/// A missing year means `today`'s year; two-digit years are `2000 + YY`.
/// Any other year length is rejected.
pub fn parse_leave_date(text: &str, today: NaiveDate) -> Result<LeaveWindow, ParseFailure> {
    let caps = DATE_RE.captures(text).ok_or(ParseFailure::NoDate)?;
    let raw = caps[0].to_string();

    let day: u32 = caps[1].parse().map_err(|_| ParseFailure::InvalidDate(raw.clone()))?;
    let month: u32 = caps[2].parse().map_err(|_| ParseFailure::InvalidDate(raw.clone()))?;
    let year: i32 = match caps.get(3).map(|y| y.as_str()) {
        None => today.year(),
        Some(y) if y.len() == 2 || y.len() == 4 => {
            let parsed: i32 = y.parse().map_err(|_| ParseFailure::InvalidDate(raw.clone()))?;
            if y.len() == 2 { 2000 + parsed } else { parsed }
        }
        // a typo'd year must not silently become this year
        Some(_) => return Err(ParseFailure::InvalidDate(raw)),
    };

    // from_ymd_opt refuses overflowing days instead of rolling into the next month
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .filter(|d| d.day() == day)
        .ok_or(ParseFailure::InvalidDate(raw))?;

    Ok(LeaveWindow::for_date(date))
}

/// Approval tokens are tried before rejection tokens; the first class that matches wins.
pub fn parse_decision(text: &str) -> Result<ManagerCommand, ParseFailure> {
    let decision = if APPROVE_RE.is_match(text) {
        Decision::Approve
    } else if REJECT_RE.is_match(text) {
        Decision::Reject
    } else {
        return Err(ParseFailure::NoDecision);
    };

    let request_ref = REQUEST_REF_RE
        .captures(text)
        .map(|caps| caps[1].to_ascii_lowercase());

    Ok(ManagerCommand {
        decision,
        request_ref,
    })
}
