use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::extract::JsonBody;
use crate::api::guards::{parse_assignment_id, CurrentProfessor};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::schemas::assignment::{
    AssignmentEnvelope, AssignmentPayload, CreatedAssignmentResponse, SubmissionListResponse,
};
use crate::services::assignments;

pub(super) async fn create_assignment(
    CurrentProfessor(identity): CurrentProfessor,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<AssignmentPayload>,
) -> Result<(StatusCode, Json<CreatedAssignmentResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::bad_request("invalid_field", e.to_string()))?;

    let assignment_id = assignments::create_assignment(
        state.store(),
        state.notifier(),
        &payload,
        &identity.subject_id,
        primitive_now_utc(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(CreatedAssignmentResponse { assignment_id })))
}

pub(super) async fn update_assignment(
    Path(assignment_id): Path<String>,
    CurrentProfessor(_identity): CurrentProfessor,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<AssignmentPayload>,
) -> Result<Json<AssignmentEnvelope>, ApiError> {
    let assignment_id = parse_assignment_id(&assignment_id)?;
    payload.validate().map_err(|e| ApiError::bad_request("invalid_field", e.to_string()))?;

    let tree = assignments::update_assignment(
        state.store(),
        state.notifier(),
        assignment_id,
        &payload,
        primitive_now_utc(),
    )
    .await?;

    Ok(Json(AssignmentEnvelope { assignment: tree.into() }))
}

pub(super) async fn get_assignment(
    Path(assignment_id): Path<String>,
    CurrentProfessor(_identity): CurrentProfessor,
    State(state): State<AppState>,
) -> Result<Json<AssignmentEnvelope>, ApiError> {
    let assignment_id = parse_assignment_id(&assignment_id)?;
    let tree = assignments::get_assignment(state.store(), assignment_id).await?;

    Ok(Json(AssignmentEnvelope { assignment: tree.into() }))
}

pub(super) async fn list_submissions(
    Path(assignment_id): Path<String>,
    CurrentProfessor(_identity): CurrentProfessor,
    State(state): State<AppState>,
) -> Result<Json<SubmissionListResponse>, ApiError> {
    let assignment_id = parse_assignment_id(&assignment_id)?;
    let rows = assignments::list_submissions(state.store(), assignment_id).await?;

    Ok(Json(SubmissionListResponse { submissions: rows.into_iter().map(Into::into).collect() }))
}
