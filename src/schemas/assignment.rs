use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::services::assignments::types::{AssignmentTree, SubmissionSummary};

/// Create/update body. Shape checks beyond simple limits live in the
/// assignment validator so every rejection carries a machine code.
#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct AssignmentPayload {
    #[serde(default)]
    pub(crate) course_id: Option<serde_json::Value>,
    #[serde(default)]
    #[validate(length(max = 255, message = "title must be at most 255 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10000, message = "description must be at most 10000 characters"))]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) deadline: Option<String>,
    #[serde(default)]
    pub(crate) questions: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreatedAssignmentResponse {
    pub(crate) assignment_id: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentEnvelope {
    pub(crate) assignment: AssignmentResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentResponse {
    pub(crate) assignment_id: i64,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) deadline: String,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) questions: Vec<QuestionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) question_id: i64,
    pub(crate) position: i32,
    pub(crate) question_text: String,
    pub(crate) marks: f64,
    pub(crate) options: Vec<OptionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OptionResponse {
    pub(crate) option_id: i64,
    pub(crate) label: String,
    pub(crate) text: String,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionListResponse {
    pub(crate) submissions: Vec<SubmissionSummaryResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionSummaryResponse {
    pub(crate) submission_id: i64,
    pub(crate) student_id: i64,
    pub(crate) status: String,
    pub(crate) score: Option<f64>,
    pub(crate) submitted_at: Option<String>,
    pub(crate) last_saved_at: Option<String>,
}

impl From<AssignmentTree> for AssignmentResponse {
    fn from(tree: AssignmentTree) -> Self {
        let AssignmentTree { assignment, questions } = tree;
        Self {
            assignment_id: assignment.id,
            course_id: assignment.course_id,
            title: assignment.title,
            description: assignment.description,
            deadline: format_primitive(assignment.deadline),
            created_by: assignment.created_by,
            created_at: format_primitive(assignment.created_at),
            updated_at: format_primitive(assignment.updated_at),
            questions: questions
                .into_iter()
                .map(|entry| QuestionResponse {
                    question_id: entry.question.id,
                    position: entry.question.position,
                    question_text: entry.question.question_text,
                    marks: entry.question.marks,
                    options: entry
                        .options
                        .into_iter()
                        .map(|option| OptionResponse {
                            option_id: option.id,
                            label: option.label,
                            text: option.option_text,
                            is_correct: option.is_correct,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl From<SubmissionSummary> for SubmissionSummaryResponse {
    fn from(row: SubmissionSummary) -> Self {
        Self {
            submission_id: row.submission_id,
            student_id: row.student_id,
            status: row.status.as_str().to_string(),
            score: row.score,
            submitted_at: row.submitted_at.map(format_primitive),
            last_saved_at: row.last_saved_at.map(format_primitive),
        }
    }
}
