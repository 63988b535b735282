use time::PrimitiveDateTime;

use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;
use crate::services::assignments::types::SubmissionSummary;

pub(crate) const COLUMNS: &str = "\
    id, assignment_id, student_id, status, last_saved_at, submitted_at, score, \
    created_at, updated_at";

/// Creates the draft submission or refreshes `last_saved_at`. Returns `None` when
/// the existing row is already submitted, leaving it untouched.
pub(crate) async fn touch_draft(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: i64,
    student_id: i64,
    now: PrimitiveDateTime,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO assignment_submissions (
            assignment_id, student_id, status, last_saved_at, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6)
        ON CONFLICT (assignment_id, student_id)
        DO UPDATE SET last_saved_at = EXCLUDED.last_saved_at, updated_at = EXCLUDED.updated_at
        WHERE assignment_submissions.status = $3
        RETURNING id",
    )
    .bind(assignment_id)
    .bind(student_id)
    .bind(SubmissionStatus::InProgress)
    .bind(now)
    .bind(now)
    .bind(now)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn finalize(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: i64,
    score: f64,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE assignment_submissions
         SET status = $1, score = $2, submitted_at = $3, updated_at = $4
         WHERE id = $5",
    )
    .bind(SubmissionStatus::Submitted)
    .bind(score)
    .bind(now)
    .bind(now)
    .bind(submission_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn find_by_assignment_and_student(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: i64,
    student_id: i64,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM assignment_submissions WHERE assignment_id = $1 AND student_id = $2"
    ))
    .bind(assignment_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_by_assignment(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: i64,
) -> Result<Vec<SubmissionSummary>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionSummary>(
        "SELECT id AS submission_id, student_id, status, score, submitted_at, last_saved_at
         FROM assignment_submissions
         WHERE assignment_id = $1
         ORDER BY submitted_at DESC NULLS LAST, last_saved_at DESC NULLS LAST, id DESC",
    )
    .bind(assignment_id)
    .fetch_all(executor)
    .await
}
