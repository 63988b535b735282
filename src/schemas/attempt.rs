use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::Submission;
use crate::services::assignments::types::{AssignmentStatus, SaveReceipt, SubmitReceipt};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AttemptPayload {
    #[serde(default)]
    pub(crate) answers: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AutosaveResponse {
    pub(crate) last_saved_at: String,
    pub(crate) saved: usize,
    pub(crate) skipped: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) score: f64,
    pub(crate) correct_count: i64,
    pub(crate) total_q: i64,
    pub(crate) marks_awarded: f64,
    pub(crate) marks_total: f64,
    pub(crate) submitted_at: String,
    pub(crate) skipped: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentAssignmentListResponse {
    pub(crate) assignments: Vec<StudentAssignmentSummary>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentAssignmentSummary {
    pub(crate) assignment_id: i64,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) deadline: String,
    pub(crate) status: AssignmentStatus,
    pub(crate) score: Option<f64>,
    pub(crate) submitted_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentAssignmentDetailResponse {
    pub(crate) assignment: StudentAssignmentInfo,
    pub(crate) questions: Vec<StudentQuestion>,
    pub(crate) submission: Option<StudentSubmission>,
    pub(crate) answers: BTreeMap<i64, Option<String>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentAssignmentInfo {
    pub(crate) assignment_id: i64,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) deadline: String,
    pub(crate) status: AssignmentStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentQuestion {
    pub(crate) question_id: i64,
    pub(crate) position: i32,
    pub(crate) question_text: String,
    pub(crate) marks: f64,
    pub(crate) options: Vec<StudentOption>,
    pub(crate) selected: Option<String>,
}

/// Options as shown to students: the correct flag is never part of this shape.
#[derive(Debug, Serialize)]
pub(crate) struct StudentOption {
    pub(crate) label: String,
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentSubmission {
    pub(crate) submission_id: i64,
    pub(crate) status: String,
    pub(crate) score: Option<f64>,
    pub(crate) last_saved_at: Option<String>,
    pub(crate) submitted_at: Option<String>,
}

impl From<SaveReceipt> for AutosaveResponse {
    fn from(receipt: SaveReceipt) -> Self {
        Self {
            last_saved_at: format_primitive(receipt.last_saved_at),
            saved: receipt.saved,
            skipped: receipt.skipped,
        }
    }
}

impl From<SubmitReceipt> for SubmitResponse {
    fn from(receipt: SubmitReceipt) -> Self {
        Self {
            score: receipt.grade.score,
            correct_count: receipt.grade.correct_count,
            total_q: receipt.grade.total_q,
            marks_awarded: receipt.grade.marks_awarded,
            marks_total: receipt.grade.marks_total,
            submitted_at: format_primitive(receipt.submitted_at),
            skipped: receipt.skipped,
        }
    }
}

impl From<&Submission> for StudentSubmission {
    fn from(submission: &Submission) -> Self {
        Self {
            submission_id: submission.id,
            status: submission.status.as_str().to_string(),
            score: submission.score,
            last_saved_at: submission.last_saved_at.map(format_primitive),
            submitted_at: submission.submitted_at.map(format_primitive),
        }
    }
}
