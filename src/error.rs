//! Error types for the circulation desk

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::CirculationAction;

/// Stable error codes reported to the desk UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NoSuchPatron = 4,
    NoSuchItem = 5,
    ItemNotAvailable = 7,
    Duplicate = 8,
    NoActionPossible = 12,
    ActionNotAllowed = 13,
    NoMatchingRequest = 20,
    Superseded = 30,
    ApplyInProgress = 31,
    BatchFailed = 32,
    BackendFailure = 33,
    NoSuchSession = 34,
    Stranded = 35,
    BadValue = 18,
}

/// How the UI should surface an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One item of a batch that the backend refused
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub item_pid: String,
    pub barcode: String,
    pub action: CirculationAction,
    pub message: String,
}

/// Main desk error type
#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Patron not found: {0}")]
    PatronNotFound(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Item {0} is unavailable for this patron")]
    ItemUnavailable(String),

    #[error("No action possible on item {0}")]
    NoActionPossible(String),

    #[error("Action {action} is not allowed on item {item_pid}")]
    ActionNotAllowed {
        item_pid: String,
        action: CirculationAction,
    },

    #[error("Item {0} is not in the list")]
    NotInList(String),

    #[error("Barcode {0} is already in the list")]
    AlreadyInList(String),

    #[error("No patron identified")]
    NoPatron,

    #[error("No request matches barcode {0}")]
    NoMatchingRequest(String),

    #[error("Result discarded: the desk session changed while it was pending")]
    Superseded,

    #[error("The desk session changed after {} actions were applied; rescan the items to see them", applied.len())]
    Stranded {
        /// Items the backend acted on
        applied: Vec<String>,
    },

    #[error("A batch is already being applied")]
    ApplyInProgress,

    #[error("{} of {} actions failed", failures.len(), failures.len() + applied.len())]
    BatchFailed {
        failures: Vec<BatchFailure>,
        /// Items the backend did apply before the batch was declared failed
        applied: Vec<String>,
    },

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl DeskError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DeskError::PatronNotFound(_) => ErrorCode::NoSuchPatron,
            DeskError::ItemNotFound(_) | DeskError::NotInList(_) => ErrorCode::NoSuchItem,
            DeskError::ItemUnavailable(_) => ErrorCode::ItemNotAvailable,
            DeskError::NoActionPossible(_) => ErrorCode::NoActionPossible,
            DeskError::ActionNotAllowed { .. } => ErrorCode::ActionNotAllowed,
            DeskError::AlreadyInList(_) => ErrorCode::Duplicate,
            DeskError::NoPatron => ErrorCode::NoSuchPatron,
            DeskError::NoMatchingRequest(_) => ErrorCode::NoMatchingRequest,
            DeskError::Superseded => ErrorCode::Superseded,
            DeskError::ApplyInProgress => ErrorCode::ApplyInProgress,
            DeskError::Stranded { .. } => ErrorCode::Stranded,
            DeskError::BatchFailed { .. } => ErrorCode::BatchFailed,
            DeskError::Backend { .. } | DeskError::Http(_) | DeskError::Serialization(_) => {
                ErrorCode::BackendFailure
            }
            DeskError::SessionNotFound(_) => ErrorCode::NoSuchSession,
            DeskError::BadRequest(_) => ErrorCode::BadValue,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DeskError::PatronNotFound(_)
            | DeskError::ItemNotFound(_)
            | DeskError::NoMatchingRequest(_)
            | DeskError::Superseded
            | DeskError::SessionNotFound(_) => Severity::Info,
            DeskError::ItemUnavailable(_)
            | DeskError::NoActionPossible(_)
            | DeskError::ActionNotAllowed { .. }
            | DeskError::NotInList(_)
            | DeskError::AlreadyInList(_)
            | DeskError::NoPatron
            | DeskError::ApplyInProgress
            | DeskError::Stranded { .. }
            | DeskError::BadRequest(_) => Severity::Warning,
            DeskError::BatchFailed { .. }
            | DeskError::Backend { .. }
            | DeskError::Http(_)
            | DeskError::Serialization(_) => Severity::Error,
        }
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<Vec<BatchFailure>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<Vec<String>>,
}

impl IntoResponse for DeskError {
    fn into_response(self) -> Response {
        let status = match &self {
            DeskError::PatronNotFound(_)
            | DeskError::ItemNotFound(_)
            | DeskError::NotInList(_)
            | DeskError::NoMatchingRequest(_)
            | DeskError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            DeskError::ItemUnavailable(_)
            | DeskError::NoActionPossible(_)
            | DeskError::ActionNotAllowed { .. }
            | DeskError::NoPatron => StatusCode::UNPROCESSABLE_ENTITY,
            DeskError::AlreadyInList(_)
            | DeskError::Superseded
            | DeskError::ApplyInProgress
            | DeskError::Stranded { .. } => StatusCode::CONFLICT,
            DeskError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DeskError::BatchFailed { .. }
            | DeskError::Backend { .. }
            | DeskError::Http(_)
            | DeskError::Serialization(_) => {
                tracing::error!("Backend failure: {}", self);
                StatusCode::BAD_GATEWAY
            }
        };

        let code = self.code();
        let severity = self.severity();
        let message = self.to_string();
        let (failures, applied) = match self {
            DeskError::BatchFailed { failures, applied } => (Some(failures), Some(applied)),
            DeskError::Stranded { applied } => (None, Some(applied)),
            _ => (None, None),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            severity,
            failures,
            applied,
        });

        (status, body).into_response()
    }
}

/// Result type alias for desk operations
pub type DeskResult<T> = Result<T, DeskError>;
