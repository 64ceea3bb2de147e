//! Error types for the presence workflow.
//!
//! Errors are classified by who can fix them:
//! - Validation / Conflict: the sender, by resending a corrected message
//! - Configuration: a tenant administrator
//! - Storage: nobody in particular, the sender should retry unless a row is corrupt

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Persistence failures. Transient unless the stored data itself is unreadable.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage timed out")]
    Timeout,

    #[error("stored record is malformed: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(e.to_string())
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Malformed date or command text; the message is the corrective guidance.
    #[error("{0}")]
    Validation(String),

    /// Duplicate check-in, check-out without a session, decision on a resolved request.
    #[error("{0}")]
    Conflict(String),

    /// Tenant set-up problem, e.g. no manager to route a leave request to.
    #[error("{0}")]
    Configuration(String),

    #[error("unknown sender")]
    UnknownSender,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl WorkflowError {
    /// Unreachable or slow storage is worth resending unchanged; a corrupt row is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WorkflowError::Storage(StoreError::Unavailable(_) | StoreError::Timeout)
        )
    }

    /// Text suitable for sending back over the chat channel.
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::Storage(StoreError::Corrupt(_)) => {
                "Your request could not be processed. Please contact your administrator."
                    .to_string()
            }
            WorkflowError::Storage(_) => {
                "The service is temporarily unavailable, please try again.".to_string()
            }
            WorkflowError::UnknownSender => {
                "This number is not registered with any organisation.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl ResponseError for WorkflowError {
    fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
            WorkflowError::Conflict(_) => StatusCode::CONFLICT,
            WorkflowError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::UnknownSender | WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
            WorkflowError::Storage(StoreError::Corrupt(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            WorkflowError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let WorkflowError::Storage(e) = self {
            tracing::error!(error = %e, "Storage failure surfaced to caller");
        }
        HttpResponse::build(self.status_code()).json(json!({
            "ok": false,
            "text": self.user_message(),
            "retry": self.is_transient(),
        }))
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
