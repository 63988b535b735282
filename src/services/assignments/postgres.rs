use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use time::PrimitiveDateTime;

use crate::db::models::Assignment;
use crate::repositories;

use super::grading::{self, Grade};
use super::store::{ensure_accepting, AssignmentStore, StoreError};
use super::types::{
    AnswerEntry, AssignmentDraft, AssignmentTree, QuestionTree, SaveReceipt,
    StudentAssignmentRow, SubmissionSummary, SubmissionWithAnswers, SubmitReceipt,
};
use super::validation::retain_known_questions;

/// Production store. Every call is bounded by `timeout`; an expired call drops
/// its transaction, which rolls it back.
#[derive(Clone)]
pub(crate) struct PgAssignmentStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgAssignmentStore {
    pub(crate) fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        match tokio::time::timeout(self.timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout),
        }
    }
}

fn classify(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout,
        other => StoreError::Database(other),
    }
}

async fn write_draft(
    tx: &mut Transaction<'_, Postgres>,
    assignment_id: i64,
    draft: &AssignmentDraft,
) -> Result<(), sqlx::Error> {
    for question in &draft.questions {
        let question_id = repositories::questions::upsert(&mut **tx, assignment_id, question).await?;
        for option in &question.options {
            repositories::questions::upsert_option(&mut **tx, question_id, option).await?;
        }
    }
    Ok(())
}

async fn load_tree(
    tx: &mut Transaction<'_, Postgres>,
    assignment: Assignment,
) -> Result<AssignmentTree, sqlx::Error> {
    let questions = repositories::questions::list_by_assignment(&mut **tx, assignment.id).await?;
    let options =
        repositories::questions::list_options_by_assignment(&mut **tx, assignment.id).await?;
    Ok(assemble_tree(assignment, questions, options))
}

fn assemble_tree(
    assignment: Assignment,
    questions: Vec<crate::db::models::Question>,
    options: Vec<crate::db::models::AssignmentOption>,
) -> AssignmentTree {
    let mut by_question: HashMap<i64, Vec<_>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }

    let questions = questions
        .into_iter()
        .map(|question| {
            let options = by_question.remove(&question.id).unwrap_or_default();
            QuestionTree { question, options }
        })
        .collect();

    AssignmentTree { assignment, questions }
}

/// Shared first half of autosave and submit: locks in the draft submission and
/// writes the answers that point at this assignment's questions.
async fn stage_answers(
    tx: &mut Transaction<'_, Postgres>,
    assignment_id: i64,
    student_id: i64,
    entries: &[AnswerEntry],
    now: PrimitiveDateTime,
) -> Result<(i64, usize, usize), StoreError> {
    let assignment = repositories::assignments::find_by_id(&mut **tx, assignment_id)
        .await?
        .ok_or(StoreError::AssignmentNotFound)?;
    ensure_accepting(&assignment, now)?;

    let submission_id =
        repositories::submissions::touch_draft(&mut **tx, assignment_id, student_id, now)
            .await?
            .ok_or(StoreError::AlreadySubmitted)?;

    let known: HashSet<i64> =
        repositories::questions::ids_for_assignment(&mut **tx, assignment_id)
            .await?
            .into_iter()
            .collect();
    let (entries, skipped) = retain_known_questions(entries, &known);

    for entry in &entries {
        repositories::answers::upsert(&mut **tx, submission_id, entry, now).await?;
    }

    Ok((submission_id, entries.len(), skipped))
}

#[async_trait]
impl AssignmentStore for PgAssignmentStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.bounded(async {
            repositories::health::ping(&self.pool).await.map_err(classify)
        })
        .await
    }

    async fn create_assignment(
        &self,
        draft: &AssignmentDraft,
        created_by: &str,
        now: PrimitiveDateTime,
    ) -> Result<i64, StoreError> {
        self.bounded(async {
            let mut tx = self.pool.begin().await.map_err(classify)?;
            let assignment_id =
                repositories::assignments::create(&mut *tx, draft, created_by, now).await?;
            write_draft(&mut tx, assignment_id, draft).await?;
            tx.commit().await?;
            Ok::<_, StoreError>(assignment_id)
        })
        .await
    }

    async fn update_assignment(
        &self,
        assignment_id: i64,
        draft: &AssignmentDraft,
        now: PrimitiveDateTime,
    ) -> Result<Option<AssignmentTree>, StoreError> {
        self.bounded(async {
            let mut tx = self.pool.begin().await.map_err(classify)?;
            if !repositories::assignments::update_metadata(&mut *tx, assignment_id, draft, now)
                .await?
            {
                return Ok(None);
            }

            write_draft(&mut tx, assignment_id, draft).await?;
            let positions: Vec<i32> =
                draft.questions.iter().map(|question| question.position).collect();
            repositories::questions::delete_outside_positions(&mut *tx, assignment_id, &positions)
                .await?;

            let assignment = repositories::assignments::find_by_id(&mut *tx, assignment_id)
                .await?
                .ok_or(StoreError::AssignmentNotFound)?;
            let tree = load_tree(&mut tx, assignment).await?;
            tx.commit().await?;
            Ok::<_, StoreError>(Some(tree))
        })
        .await
    }

    async fn find_assignment(&self, assignment_id: i64) -> Result<Option<Assignment>, StoreError> {
        self.bounded(async {
            repositories::assignments::find_by_id(&self.pool, assignment_id)
                .await
                .map_err(classify)
        })
        .await
    }

    async fn load_assignment_tree(
        &self,
        assignment_id: i64,
    ) -> Result<Option<AssignmentTree>, StoreError> {
        self.bounded(async {
            let mut tx = self.pool.begin().await.map_err(classify)?;
            let Some(assignment) =
                repositories::assignments::find_by_id(&mut *tx, assignment_id).await?
            else {
                return Ok(None);
            };
            let tree = load_tree(&mut tx, assignment).await?;
            tx.commit().await?;
            Ok::<_, StoreError>(Some(tree))
        })
        .await
    }

    async fn list_submissions(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<SubmissionSummary>, StoreError> {
        self.bounded(async {
            repositories::submissions::list_by_assignment(&self.pool, assignment_id)
                .await
                .map_err(classify)
        })
        .await
    }

    async fn save_answers(
        &self,
        assignment_id: i64,
        student_id: i64,
        entries: &[AnswerEntry],
        now: PrimitiveDateTime,
    ) -> Result<SaveReceipt, StoreError> {
        self.bounded(async {
            let mut tx = self.pool.begin().await.map_err(classify)?;
            let (submission_id, saved, skipped) =
                stage_answers(&mut tx, assignment_id, student_id, entries, now).await?;
            tx.commit().await?;

            Ok::<_, StoreError>(SaveReceipt { submission_id, last_saved_at: now, saved, skipped })
        })
        .await
    }

    async fn submit_answers(
        &self,
        assignment_id: i64,
        student_id: i64,
        entries: &[AnswerEntry],
        now: PrimitiveDateTime,
    ) -> Result<SubmitReceipt, StoreError> {
        self.bounded(async {
            let mut tx = self.pool.begin().await.map_err(classify)?;
            let (submission_id, _, skipped) =
                stage_answers(&mut tx, assignment_id, student_id, entries, now).await?;

            let key = repositories::questions::answer_key(&mut *tx, assignment_id).await?;
            let selections: HashMap<i64, Option<String>> =
                repositories::answers::list_by_submission(&mut *tx, submission_id)
                    .await?
                    .into_iter()
                    .map(|answer| (answer.question_id, answer.selected_label))
                    .collect();
            let grade: Grade = grading::grade(&key, &selections);

            let correct: Vec<i64> = grade.correct_question_ids.iter().copied().collect();
            repositories::answers::mark_correctness(&mut *tx, submission_id, &correct).await?;
            repositories::submissions::finalize(&mut *tx, submission_id, grade.score, now).await?;
            tx.commit().await?;

            Ok::<_, StoreError>(SubmitReceipt { submission_id, grade, submitted_at: now, skipped })
        })
        .await
    }

    async fn list_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<StudentAssignmentRow>, StoreError> {
        self.bounded(async {
            repositories::enrollments::list_assignments_for_student(&self.pool, student_id)
                .await
                .map_err(classify)
        })
        .await
    }

    async fn find_submission(
        &self,
        assignment_id: i64,
        student_id: i64,
    ) -> Result<Option<SubmissionWithAnswers>, StoreError> {
        self.bounded(async {
            let mut conn = self.pool.acquire().await.map_err(classify)?;
            let Some(submission) = repositories::submissions::find_by_assignment_and_student(
                &mut *conn,
                assignment_id,
                student_id,
            )
            .await?
            else {
                return Ok(None);
            };
            let answers =
                repositories::answers::list_by_submission(&mut *conn, submission.id).await?;
            Ok::<_, StoreError>(Some(SubmissionWithAnswers { submission, answers }))
        })
        .await
    }
}
