use axum::extract::{Path, State};
use axum::Json;

use crate::api::errors::ApiError;
use crate::api::extract::OptionalJsonBody;
use crate::api::guards::{parse_assignment_id, CurrentStudent};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::schemas::attempt::{
    AttemptPayload, AutosaveResponse, StudentAssignmentDetailResponse,
    StudentAssignmentListResponse, SubmitResponse,
};
use crate::services::assignments;

pub(super) async fn list_assignments(
    CurrentStudent(student_id): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<StudentAssignmentListResponse>, ApiError> {
    let assignments =
        assignments::list_for_student(state.store(), student_id, primitive_now_utc()).await?;

    Ok(Json(StudentAssignmentListResponse { assignments }))
}

pub(super) async fn get_assignment(
    Path(assignment_id): Path<String>,
    CurrentStudent(student_id): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<StudentAssignmentDetailResponse>, ApiError> {
    let assignment_id = parse_assignment_id(&assignment_id)?;
    let detail = assignments::detail_for_student(
        state.store(),
        assignment_id,
        student_id,
        primitive_now_utc(),
    )
    .await?;

    Ok(Json(detail))
}

pub(super) async fn autosave(
    Path(assignment_id): Path<String>,
    CurrentStudent(student_id): CurrentStudent,
    State(state): State<AppState>,
    OptionalJsonBody(payload): OptionalJsonBody<AttemptPayload>,
) -> Result<Json<AutosaveResponse>, ApiError> {
    let assignment_id = parse_assignment_id(&assignment_id)?;
    let receipt = assignments::autosave(
        state.store(),
        assignment_id,
        student_id,
        payload.answers.as_ref(),
        primitive_now_utc(),
    )
    .await?;

    Ok(Json(receipt.into()))
}

pub(super) async fn submit(
    Path(assignment_id): Path<String>,
    CurrentStudent(student_id): CurrentStudent,
    State(state): State<AppState>,
    OptionalJsonBody(payload): OptionalJsonBody<AttemptPayload>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let assignment_id = parse_assignment_id(&assignment_id)?;
    let receipt = assignments::submit(
        state.store(),
        state.notifier(),
        assignment_id,
        student_id,
        payload.answers.as_ref(),
        primitive_now_utc(),
    )
    .await?;

    Ok(Json(receipt.into()))
}
