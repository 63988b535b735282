use crate::db::models::{AssignmentOption, Question};
use crate::services::assignments::grading::AnswerKey;
use crate::services::assignments::types::{OptionDraft, QuestionDraft};

pub(crate) const COLUMNS: &str = "id, assignment_id, position, question_text, marks";
pub(crate) const OPTION_COLUMNS: &str = "id, question_id, label, option_text, is_correct";

/// Inserts or refreshes the question at `(assignment_id, position)`, keeping its id.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: i64,
    question: &QuestionDraft,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO assignment_questions (assignment_id, position, question_text, marks)
         VALUES ($1,$2,$3,$4)
         ON CONFLICT (assignment_id, position)
         DO UPDATE SET question_text = EXCLUDED.question_text, marks = EXCLUDED.marks
         RETURNING id",
    )
    .bind(assignment_id)
    .bind(question.position)
    .bind(&question.question_text)
    .bind(question.marks)
    .fetch_one(executor)
    .await
}

pub(crate) async fn upsert_option(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: i64,
    option: &OptionDraft,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO assignment_options (question_id, label, option_text, is_correct)
         VALUES ($1,$2,$3,$4)
         ON CONFLICT (question_id, label)
         DO UPDATE SET option_text = EXCLUDED.option_text, is_correct = EXCLUDED.is_correct",
    )
    .bind(question_id)
    .bind(option.label.as_str())
    .bind(&option.text)
    .bind(option.is_correct)
    .execute(executor)
    .await?;
    Ok(())
}

/// Removes questions whose position is no longer part of the assignment.
pub(crate) async fn delete_outside_positions(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: i64,
    positions: &[i32],
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM assignment_questions WHERE assignment_id = $1 AND NOT (position = ANY($2))",
    )
    .bind(assignment_id)
    .bind(positions)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn list_by_assignment(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM assignment_questions WHERE assignment_id = $1 ORDER BY position"
    ))
    .bind(assignment_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_options_by_assignment(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: i64,
) -> Result<Vec<AssignmentOption>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentOption>(
        "SELECT o.id, o.question_id, o.label, o.option_text, o.is_correct
         FROM assignment_options o
         JOIN assignment_questions q ON q.id = o.question_id
         WHERE q.assignment_id = $1
         ORDER BY q.position, o.label",
    )
    .bind(assignment_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn ids_for_assignment(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM assignment_questions WHERE assignment_id = $1")
        .bind(assignment_id)
        .fetch_all(executor)
        .await
}

#[derive(Debug, sqlx::FromRow)]
struct AnswerKeyRow {
    question_id: i64,
    correct_label: Option<String>,
    marks: f64,
}

/// One row per question; `correct_label` is `None` only for legacy rows
/// without a correct option.
pub(crate) async fn answer_key(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: i64,
) -> Result<Vec<AnswerKey>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AnswerKeyRow>(
        "SELECT q.id AS question_id, o.label AS correct_label, q.marks
         FROM assignment_questions q
         LEFT JOIN assignment_options o ON o.question_id = q.id AND o.is_correct
         WHERE q.assignment_id = $1
         ORDER BY q.position",
    )
    .bind(assignment_id)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| AnswerKey {
            question_id: row.question_id,
            correct_label: row.correct_label,
            marks: row.marks,
        })
        .collect())
}
