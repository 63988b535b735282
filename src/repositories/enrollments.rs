use crate::services::assignments::types::StudentAssignmentRow;

/// Enrollment responses that count as a confirmed course selection.
pub(crate) const CONFIRMED_RESPONSE: &str = "selected";

/// Assignments of every course the student confirmed, with their own submission
/// if one exists. Course codes match case-insensitively; an assignment is listed
/// once even when several confirmed courses share its code.
pub(crate) async fn list_assignments_for_student(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: i64,
) -> Result<Vec<StudentAssignmentRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentAssignmentRow>(
        "SELECT a.id AS assignment_id, a.title, a.description, a.deadline,
                s.status AS submission_status, s.score, s.submitted_at
         FROM assignments a
         LEFT JOIN assignment_submissions s
           ON s.assignment_id = a.id AND s.student_id = $1
         WHERE EXISTS (
             SELECT 1
             FROM courses c
             JOIN course_responses cr ON cr.course_id = c.id
             WHERE LOWER(c.code) = LOWER(a.course_id)
               AND cr.student_id = $1
               AND cr.response_status = $2
         )
         ORDER BY a.deadline DESC, a.id DESC",
    )
    .bind(student_id)
    .bind(CONFIRMED_RESPONSE)
    .fetch_all(executor)
    .await
}
