//! Request validation endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::DeskResult,
    models::{Item, Operator},
    services::validation::ValidationReport,
    AppState,
};

#[derive(Deserialize)]
pub struct OpenValidationRequest {
    pub operator: Operator,
    /// Library whose pending requests are validated; defaults to the operator's
    pub library_pid: Option<String>,
}

#[derive(Serialize)]
pub struct ValidationView {
    pub id: Uuid,
    pub library_pid: String,
    pub pending_requests: Vec<Item>,
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub barcode: String,
}

/// Load the pending requests of a library
pub async fn open_session(
    State(state): State<AppState>,
    Json(request): Json<OpenValidationRequest>,
) -> DeskResult<(StatusCode, Json<ValidationView>)> {
    let library_pid = request
        .library_pid
        .unwrap_or_else(|| request.operator.library_pid.clone());
    let (id, session) = state
        .services
        .open_validation(request.operator, library_pid)
        .await?;

    let session = session.lock().await;
    Ok((
        StatusCode::CREATED,
        Json(ValidationView {
            id,
            library_pid: session.library_pid().to_string(),
            pending_requests: session.pending_requests().to_vec(),
        }),
    ))
}

pub async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> DeskResult<Json<ValidationView>> {
    let session = state.services.validation(id).await?;
    let session = session.lock().await;
    Ok(Json(ValidationView {
        id,
        library_pid: session.library_pid().to_string(),
        pending_requests: session.pending_requests().to_vec(),
    }))
}

/// Leave the validation screen
pub async fn close_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> DeskResult<StatusCode> {
    state.services.close_validation(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Validate the request of the scanned item
pub async fn validate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ValidateRequest>,
) -> DeskResult<Json<ValidationReport>> {
    let session = state.services.validation(id).await?;
    let report = session.lock().await.validate(&request.barcode).await?;
    Ok(Json(report))
}
