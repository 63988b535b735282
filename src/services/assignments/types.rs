use std::fmt;

use serde::Serialize;
use time::PrimitiveDateTime;

use crate::db::models::{Answer, Assignment, AssignmentOption, Question, Submission};
use crate::db::types::SubmissionStatus;

use super::grading::Grade;

/// Every assignment carries exactly this many questions.
pub(crate) const QUESTION_COUNT: usize = 5;
pub(crate) const DEFAULT_MARKS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub(crate) enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub(crate) const ALL: [OptionLabel; 4] = [Self::A, Self::B, Self::C, Self::D];

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            _ => None,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully validated create/update payload.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AssignmentDraft {
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) deadline: PrimitiveDateTime,
    pub(crate) questions: Vec<QuestionDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuestionDraft {
    pub(crate) position: i32,
    pub(crate) question_text: String,
    pub(crate) marks: f64,
    pub(crate) options: Vec<OptionDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OptionDraft {
    pub(crate) label: OptionLabel,
    pub(crate) text: String,
    pub(crate) is_correct: bool,
}

/// One well-formed answer entry; `None` clears the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AnswerEntry {
    pub(crate) question_id: i64,
    pub(crate) selected: Option<OptionLabel>,
}

#[derive(Debug, Clone)]
pub(crate) struct AssignmentTree {
    pub(crate) assignment: Assignment,
    pub(crate) questions: Vec<QuestionTree>,
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionTree {
    pub(crate) question: Question,
    pub(crate) options: Vec<AssignmentOption>,
}

#[derive(Debug, Clone)]
pub(crate) struct SubmissionWithAnswers {
    pub(crate) submission: Submission,
    pub(crate) answers: Vec<Answer>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct StudentAssignmentRow {
    pub(crate) assignment_id: i64,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) deadline: PrimitiveDateTime,
    pub(crate) submission_status: Option<SubmissionStatus>,
    pub(crate) score: Option<f64>,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SubmissionSummary {
    pub(crate) submission_id: i64,
    pub(crate) student_id: i64,
    pub(crate) status: SubmissionStatus,
    pub(crate) score: Option<f64>,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) last_saved_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SaveReceipt {
    pub(crate) submission_id: i64,
    pub(crate) last_saved_at: PrimitiveDateTime,
    pub(crate) saved: usize,
    pub(crate) skipped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SubmitReceipt {
    pub(crate) submission_id: i64,
    pub(crate) grade: Grade,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) skipped: usize,
}

/// Status shown to a student for one assignment in their listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum AssignmentStatus {
    Open,
    InProgress,
    Submitted,
    Closed,
}

impl AssignmentStatus {
    /// Only a finalized submission counts as `Submitted`; an autosaved draft is
    /// `InProgress` until the deadline closes it.
    pub(crate) fn derive(
        submission: Option<SubmissionStatus>,
        deadline: PrimitiveDateTime,
        now: PrimitiveDateTime,
    ) -> Self {
        match submission {
            Some(SubmissionStatus::Submitted) => Self::Submitted,
            _ if now > deadline => Self::Closed,
            Some(SubmissionStatus::InProgress) => Self::InProgress,
            None => Self::Open,
        }
    }
}
