//! Circulation desk endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::DeskResult,
    models::{CirculationAction, Operator, Session},
    services::{
        applier::ApplyReport,
        desk::DeskController,
        guard::{ExitDecision, ExitReason, PresetAnswer},
        resolver::ScanOutcome,
    },
    AppState,
};

#[derive(Deserialize)]
pub struct OpenDeskRequest {
    /// Librarian operating the desk
    pub operator: Operator,
}

/// Read-only view of a desk session
#[derive(Serialize)]
pub struct DeskView {
    pub id: Uuid,
    pub has_pending_actions: bool,
    pub session: Session,
}

impl DeskView {
    fn of(id: Uuid, desk: &DeskController) -> Self {
        let session = desk.snapshot();
        Self {
            id,
            has_pending_actions: session.has_pending_actions(),
            session,
        }
    }
}

#[derive(Deserialize)]
pub struct ScanRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct ScanResponse {
    pub outcome: ScanOutcome,
    pub desk: DeskView,
}

#[derive(Deserialize)]
pub struct SetActionRequest {
    pub action: CirculationAction,
}

#[derive(Serialize)]
pub struct ApplyResponse {
    pub report: ApplyReport,
    pub desk: DeskView,
}

#[derive(Deserialize)]
pub struct ExitRequest {
    pub reason: ExitReason,
    /// Operator's answer to the discard prompt
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Serialize)]
pub struct ExitResponse {
    pub decision: ExitDecision,
    /// Absent once the session is closed
    pub desk: Option<DeskView>,
}

/// Open a desk session for an operator
pub async fn open_session(
    State(state): State<AppState>,
    Json(request): Json<OpenDeskRequest>,
) -> (StatusCode, Json<DeskView>) {
    let (id, desk) = state.services.open_desk(request.operator).await;
    (StatusCode::CREATED, Json(DeskView::of(id, &desk)))
}

pub async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> DeskResult<Json<DeskView>> {
    let desk = state.services.desk(id).await?;
    Ok(Json(DeskView::of(id, &desk)))
}

/// Handle a scanned patron or item barcode
pub async fn scan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ScanRequest>,
) -> DeskResult<Json<ScanResponse>> {
    let desk = state.services.desk(id).await?;
    let outcome = desk.scan(&request.code).await?;
    Ok(Json(ScanResponse {
        outcome,
        desk: DeskView::of(id, &desk),
    }))
}

/// Override the action chosen for an item
pub async fn set_action(
    State(state): State<AppState>,
    Path((id, item_pid)): Path<(Uuid, String)>,
    Json(request): Json<SetActionRequest>,
) -> DeskResult<Json<DeskView>> {
    let desk = state.services.desk(id).await?;
    desk.set_action(&item_pid, request.action)?;
    Ok(Json(DeskView::of(id, &desk)))
}

/// Apply every pending action of the identified patron
pub async fn apply(State(state): State<AppState>, Path(id): Path<Uuid>) -> DeskResult<Json<ApplyResponse>> {
    let desk = state.services.desk(id).await?;
    let report = desk.apply().await?;
    Ok(Json(ApplyResponse {
        report,
        desk: DeskView::of(id, &desk),
    }))
}

/// Clear the patron or leave the desk screen
pub async fn exit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ExitRequest>,
) -> DeskResult<Json<ExitResponse>> {
    let desk = state.services.desk(id).await?;
    let decision = desk.exit(request.reason, &PresetAnswer(request.confirm)).await;

    if decision == ExitDecision::Proceed && request.reason == ExitReason::NavigateAway {
        state.services.close_desk(id).await;
        return Ok(Json(ExitResponse { decision, desk: None }));
    }

    Ok(Json(ExitResponse {
        decision,
        desk: Some(DeskView::of(id, &desk)),
    }))
}
