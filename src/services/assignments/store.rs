use async_trait::async_trait;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::db::models::Assignment;

use super::types::{
    AnswerEntry, AssignmentDraft, AssignmentTree, SaveReceipt, StudentAssignmentRow,
    SubmissionSummary, SubmissionWithAnswers, SubmitReceipt,
};

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage did not answer in time")]
    Timeout,
    #[error("assignment not found")]
    AssignmentNotFound,
    #[error("assignment deadline has passed")]
    DeadlinePassed,
    #[error("submission is already finalised")]
    AlreadySubmitted,
}

/// Persistence seam for the assignment subsystem. Each write method is atomic:
/// either every row it touches is committed or none is.
#[async_trait]
pub(crate) trait AssignmentStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn create_assignment(
        &self,
        draft: &AssignmentDraft,
        created_by: &str,
        now: PrimitiveDateTime,
    ) -> Result<i64, StoreError>;

    /// Reconciles questions by position and options by label so their ids
    /// survive the edit. `None` when the assignment does not exist.
    async fn update_assignment(
        &self,
        assignment_id: i64,
        draft: &AssignmentDraft,
        now: PrimitiveDateTime,
    ) -> Result<Option<AssignmentTree>, StoreError>;

    async fn find_assignment(&self, assignment_id: i64) -> Result<Option<Assignment>, StoreError>;

    async fn load_assignment_tree(
        &self,
        assignment_id: i64,
    ) -> Result<Option<AssignmentTree>, StoreError>;

    async fn list_submissions(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<SubmissionSummary>, StoreError>;

    /// Upserts the draft submission and its answers. `skipped` in the receipt
    /// counts entries for questions outside the assignment.
    async fn save_answers(
        &self,
        assignment_id: i64,
        student_id: i64,
        entries: &[AnswerEntry],
        now: PrimitiveDateTime,
    ) -> Result<SaveReceipt, StoreError>;

    /// Last-chance save, grading and the `in_progress -> submitted` transition
    /// in one unit.
    async fn submit_answers(
        &self,
        assignment_id: i64,
        student_id: i64,
        entries: &[AnswerEntry],
        now: PrimitiveDateTime,
    ) -> Result<SubmitReceipt, StoreError>;

    async fn list_for_student(&self, student_id: i64)
        -> Result<Vec<StudentAssignmentRow>, StoreError>;

    async fn find_submission(
        &self,
        assignment_id: i64,
        student_id: i64,
    ) -> Result<Option<SubmissionWithAnswers>, StoreError>;
}

/// Writes are accepted up to and including the deadline instant.
pub(crate) fn ensure_accepting(
    assignment: &Assignment,
    now: PrimitiveDateTime,
) -> Result<(), StoreError> {
    if now > assignment.deadline {
        return Err(StoreError::DeadlinePassed);
    }
    Ok(())
}
