use time::PrimitiveDateTime;

use crate::db::models::Answer;
use crate::services::assignments::types::AnswerEntry;

pub(crate) const COLUMNS: &str = "submission_id, question_id, selected_label, correct, updated_at";

/// Overwrites the selection for one question and clears any earlier verdict.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: i64,
    entry: &AnswerEntry,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO assignment_answers (submission_id, question_id, selected_label, updated_at)
         VALUES ($1,$2,$3,$4)
         ON CONFLICT (submission_id, question_id)
         DO UPDATE SET selected_label = EXCLUDED.selected_label,
                       correct = NULL,
                       updated_at = EXCLUDED.updated_at",
    )
    .bind(submission_id)
    .bind(entry.question_id)
    .bind(entry.selected.map(|label| label.as_str()))
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list_by_submission(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: i64,
) -> Result<Vec<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "SELECT {COLUMNS} FROM assignment_answers WHERE submission_id = $1 ORDER BY question_id"
    ))
    .bind(submission_id)
    .fetch_all(executor)
    .await
}

/// Marks the listed questions correct and every other answer of the submission
/// wrong.
pub(crate) async fn mark_correctness(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: i64,
    correct_question_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE assignment_answers SET correct = (question_id = ANY($2)) WHERE submission_id = $1",
    )
    .bind(submission_id)
    .bind(correct_question_ids)
    .execute(executor)
    .await?;
    Ok(())
}
