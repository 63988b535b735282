pub(crate) mod grading;
#[cfg(test)]
pub(crate) mod memory;
pub(crate) mod postgres;
pub(crate) mod store;
pub(crate) mod types;
pub(crate) mod validation;

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::core::metrics::{ASSIGNMENT_AUTOSAVES_TOTAL, ASSIGNMENT_SUBMISSIONS_TOTAL};
use crate::core::time::format_primitive;
use crate::schemas::assignment::AssignmentPayload;
use crate::schemas::attempt::{
    StudentAssignmentDetailResponse, StudentAssignmentInfo, StudentAssignmentSummary,
    StudentOption, StudentQuestion, StudentSubmission,
};
use crate::services::notifications::{AssignmentEvent, Notifier};

use store::{AssignmentStore, StoreError};
use types::{AssignmentStatus, AssignmentTree, SaveReceipt, SubmissionSummary, SubmitReceipt};
use validation::{parse_answer_entries, parse_assignment, ValidationError};

#[derive(Debug, Error)]
pub(crate) enum AssignmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("assignment not found")]
    NotFound,
    #[error("assignment deadline has passed")]
    DeadlinePassed,
    #[error("submission has already been submitted")]
    AlreadySubmitted,
    #[error("storage is unavailable")]
    Unavailable,
    #[error("storage failure: {0}")]
    Storage(#[source] sqlx::Error),
}

impl From<StoreError> for AssignmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(err) => Self::Storage(err),
            StoreError::Timeout => Self::Unavailable,
            StoreError::AssignmentNotFound => Self::NotFound,
            StoreError::DeadlinePassed => Self::DeadlinePassed,
            StoreError::AlreadySubmitted => Self::AlreadySubmitted,
        }
    }
}

pub(crate) async fn create_assignment(
    store: &dyn AssignmentStore,
    notifier: &Notifier,
    payload: &AssignmentPayload,
    created_by: &str,
    now: PrimitiveDateTime,
) -> Result<i64, AssignmentError> {
    let draft = parse_assignment(payload)?;
    let assignment_id = store.create_assignment(&draft, created_by, now).await?;

    tracing::info!(
        action = "assignment_created",
        assignment_id,
        course_id = %draft.course_id,
        created_by,
        "Assignment created"
    );
    notifier.emit(AssignmentEvent::AssignmentCreated {
        assignment_id,
        course_id: draft.course_id,
    });

    Ok(assignment_id)
}

pub(crate) async fn update_assignment(
    store: &dyn AssignmentStore,
    notifier: &Notifier,
    assignment_id: i64,
    payload: &AssignmentPayload,
    now: PrimitiveDateTime,
) -> Result<AssignmentTree, AssignmentError> {
    let draft = parse_assignment(payload)?;
    let tree = store
        .update_assignment(assignment_id, &draft, now)
        .await?
        .ok_or(AssignmentError::NotFound)?;

    tracing::info!(
        action = "assignment_updated",
        assignment_id,
        course_id = %tree.assignment.course_id,
        "Assignment updated"
    );
    notifier.emit(AssignmentEvent::AssignmentUpdated {
        assignment_id,
        course_id: tree.assignment.course_id.clone(),
    });

    Ok(tree)
}

pub(crate) async fn get_assignment(
    store: &dyn AssignmentStore,
    assignment_id: i64,
) -> Result<AssignmentTree, AssignmentError> {
    store.load_assignment_tree(assignment_id).await?.ok_or(AssignmentError::NotFound)
}

pub(crate) async fn list_submissions(
    store: &dyn AssignmentStore,
    assignment_id: i64,
) -> Result<Vec<SubmissionSummary>, AssignmentError> {
    if store.find_assignment(assignment_id).await?.is_none() {
        return Err(AssignmentError::NotFound);
    }
    Ok(store.list_submissions(assignment_id).await?)
}

pub(crate) async fn autosave(
    store: &dyn AssignmentStore,
    assignment_id: i64,
    student_id: i64,
    answers: Option<&Value>,
    now: PrimitiveDateTime,
) -> Result<SaveReceipt, AssignmentError> {
    let (entries, malformed) = parse_answer_entries(answers);
    let mut receipt = store.save_answers(assignment_id, student_id, &entries, now).await?;
    receipt.skipped += malformed;

    metrics::counter!(ASSIGNMENT_AUTOSAVES_TOTAL).increment(1);
    tracing::debug!(
        assignment_id,
        student_id,
        saved = receipt.saved,
        skipped = receipt.skipped,
        "Answers autosaved"
    );

    Ok(receipt)
}

pub(crate) async fn submit(
    store: &dyn AssignmentStore,
    notifier: &Notifier,
    assignment_id: i64,
    student_id: i64,
    answers: Option<&Value>,
    now: PrimitiveDateTime,
) -> Result<SubmitReceipt, AssignmentError> {
    let (entries, malformed) = parse_answer_entries(answers);
    let mut receipt = store.submit_answers(assignment_id, student_id, &entries, now).await?;
    receipt.skipped += malformed;

    metrics::counter!(ASSIGNMENT_SUBMISSIONS_TOTAL).increment(1);
    tracing::info!(
        action = "assignment_submitted",
        assignment_id,
        student_id,
        score = receipt.grade.score,
        correct_count = receipt.grade.correct_count,
        total_q = receipt.grade.total_q,
        "Assignment submitted"
    );
    notifier.emit(AssignmentEvent::SubmissionReceived {
        assignment_id,
        student_id,
        score: receipt.grade.score,
        submitted_at: format_primitive(receipt.submitted_at),
    });

    Ok(receipt)
}

pub(crate) async fn list_for_student(
    store: &dyn AssignmentStore,
    student_id: i64,
    now: PrimitiveDateTime,
) -> Result<Vec<StudentAssignmentSummary>, AssignmentError> {
    let rows = store.list_for_student(student_id).await?;
    Ok(rows
        .into_iter()
        .map(|row| StudentAssignmentSummary {
            assignment_id: row.assignment_id,
            status: AssignmentStatus::derive(row.submission_status, row.deadline, now),
            title: row.title,
            description: row.description,
            deadline: format_primitive(row.deadline),
            score: row.score,
            submitted_at: row.submitted_at.map(format_primitive),
        })
        .collect())
}

/// Student view of one assignment. Correct flags never leave this function.
pub(crate) async fn detail_for_student(
    store: &dyn AssignmentStore,
    assignment_id: i64,
    student_id: i64,
    now: PrimitiveDateTime,
) -> Result<StudentAssignmentDetailResponse, AssignmentError> {
    let tree = store.load_assignment_tree(assignment_id).await?.ok_or(AssignmentError::NotFound)?;
    let submission = store.find_submission(assignment_id, student_id).await?;

    let selections: HashMap<i64, Option<String>> = submission
        .as_ref()
        .map(|found| {
            found
                .answers
                .iter()
                .map(|answer| (answer.question_id, answer.selected_label.clone()))
                .collect()
        })
        .unwrap_or_default();

    let status = AssignmentStatus::derive(
        submission.as_ref().map(|found| found.submission.status),
        tree.assignment.deadline,
        now,
    );

    let questions: Vec<StudentQuestion> = tree
        .questions
        .into_iter()
        .map(|entry| StudentQuestion {
            question_id: entry.question.id,
            position: entry.question.position,
            selected: selections.get(&entry.question.id).cloned().flatten(),
            question_text: entry.question.question_text,
            marks: entry.question.marks,
            options: entry
                .options
                .into_iter()
                .map(|option| StudentOption { label: option.label, text: option.option_text })
                .collect(),
        })
        .collect();

    let answers: BTreeMap<i64, Option<String>> = selections.into_iter().collect();
    let assignment = tree.assignment;

    Ok(StudentAssignmentDetailResponse {
        assignment: StudentAssignmentInfo {
            assignment_id: assignment.id,
            course_id: assignment.course_id,
            title: assignment.title,
            description: assignment.description,
            deadline: format_primitive(assignment.deadline),
            status,
        },
        questions,
        submission: submission.as_ref().map(|found| StudentSubmission::from(&found.submission)),
        answers,
    })
}
