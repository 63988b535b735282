use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::identity::{self, Identity};
use crate::core::state::AppState;

const STUDENT_ID_HEADER: &str = "x-student-id";

pub(crate) struct CurrentIdentity(pub(crate) Identity);
pub(crate) struct CurrentProfessor(pub(crate) Identity);

/// Student on whose behalf an attempt endpoint acts.
pub(crate) struct CurrentStudent(pub(crate) i64);

#[async_trait]
impl FromRequestParts<AppState> for CurrentIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;
        let identity = identity::decode_token(token, state.settings()).map_err(|err| {
            tracing::debug!(error = %err, "Rejected bearer token");
            ApiError::Unauthorized("Invalid authentication credentials")
        })?;

        Ok(CurrentIdentity(identity))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentProfessor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentIdentity(identity) = CurrentIdentity::from_request_parts(parts, state).await?;

        if identity.can_author_assignments() {
            Ok(CurrentProfessor(identity))
        } else {
            Err(ApiError::Forbidden("Professor access required"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(raw) = explicit_student_id(parts).await? {
            return parse_student_id(&raw).map(CurrentStudent);
        }

        if bearer_token(parts)?.is_none() {
            return Err(student_id_required());
        }

        let CurrentIdentity(identity) = CurrentIdentity::from_request_parts(parts, state).await?;
        identity
            .student_id()
            .map(CurrentStudent)
            .ok_or(ApiError::Forbidden("Student access required"))
    }
}

/// Header first, then the `student_id` query parameter. Blank values count as absent.
async fn explicit_student_id(parts: &mut Parts) -> Result<Option<String>, ApiError> {
    if let Some(value) = parts.headers.get(STUDENT_ID_HEADER) {
        let value = value.to_str().map_err(|_| student_id_required())?.trim();
        if !value.is_empty() {
            return Ok(Some(value.to_string()));
        }
    }

    let Query(query) = Query::<HashMap<String, String>>::from_request_parts(parts, &())
        .await
        .map_err(|_| student_id_required())?;

    Ok(query
        .get("student_id")
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| Some(token.trim()))
        .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))
}

fn parse_student_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().ok().filter(|id| *id > 0).ok_or_else(student_id_required)
}

fn student_id_required() -> ApiError {
    ApiError::bad_request("student_id_required", "A positive numeric student_id is required")
}

/// Positive numeric id from a path segment.
pub(crate) fn parse_assignment_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0).ok_or_else(|| {
        ApiError::bad_request("assignment_id_required", "A positive numeric assignment id is required")
    })
}
