use time::PrimitiveDateTime;

use crate::db::models::Assignment;
use crate::services::assignments::types::AssignmentDraft;

pub(crate) const COLUMNS: &str =
    "id, course_id, title, description, deadline, created_by, created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: i64,
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!("SELECT {COLUMNS} FROM assignments WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    draft: &AssignmentDraft,
    created_by: &str,
    now: PrimitiveDateTime,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO assignments (
            course_id, title, description, deadline, created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        RETURNING id",
    )
    .bind(&draft.course_id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.deadline)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
}

/// Updates metadata in place; `false` when no row matched.
pub(crate) async fn update_metadata(
    executor: impl sqlx::PgExecutor<'_>,
    id: i64,
    draft: &AssignmentDraft,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE assignments
         SET course_id = $1, title = $2, description = $3, deadline = $4, updated_at = $5
         WHERE id = $6",
    )
    .bind(&draft.course_id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.deadline)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
