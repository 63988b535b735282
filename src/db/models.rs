use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::SubmissionStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Assignment {
    pub(crate) id: i64,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) deadline: PrimitiveDateTime,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: i64,
    pub(crate) assignment_id: i64,
    pub(crate) position: i32,
    pub(crate) question_text: String,
    pub(crate) marks: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AssignmentOption {
    pub(crate) id: i64,
    pub(crate) question_id: i64,
    pub(crate) label: String,
    pub(crate) option_text: String,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: i64,
    pub(crate) assignment_id: i64,
    pub(crate) student_id: i64,
    pub(crate) status: SubmissionStatus,
    pub(crate) last_saved_at: Option<PrimitiveDateTime>,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) score: Option<f64>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Answer {
    pub(crate) submission_id: i64,
    pub(crate) question_id: i64,
    pub(crate) selected_label: Option<String>,
    pub(crate) correct: Option<bool>,
    pub(crate) updated_at: PrimitiveDateTime,
}
