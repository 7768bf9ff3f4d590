use sqlx::PgPool;

use crate::db::models::AssignmentSubmission;

const COLUMNS: &str = "id, assignment_id, student_id, content, attachment_key, attachment_name, \
    submitted_at, is_late, points, feedback, graded_by, graded_at";

pub(crate) struct UpsertSubmission<'a> {
    pub(crate) id: &'a str,
    pub(crate) assignment_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) content: Option<&'a str>,
    pub(crate) attachment_key: Option<&'a str>,
    pub(crate) attachment_name: Option<&'a str>,
    pub(crate) submitted_at: time::PrimitiveDateTime,
    pub(crate) is_late: bool,
}

/// Inserts the student's submission or replaces the existing one. A resubmission
/// clears any grade; the old attachment is kept when no new file was sent.
pub(crate) async fn upsert(
    pool: &PgPool,
    params: UpsertSubmission<'_>,
) -> Result<AssignmentSubmission, sqlx::Error> {
    sqlx::query_as::<_, AssignmentSubmission>(&format!(
        "INSERT INTO assignment_submissions (
            id, assignment_id, student_id, content, attachment_key, attachment_name,
            submitted_at, is_late
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
         ON CONFLICT (assignment_id, student_id) DO UPDATE SET
            content = EXCLUDED.content,
            attachment_key = COALESCE(EXCLUDED.attachment_key, assignment_submissions.attachment_key),
            attachment_name = COALESCE(EXCLUDED.attachment_name, assignment_submissions.attachment_name),
            submitted_at = EXCLUDED.submitted_at,
            is_late = EXCLUDED.is_late,
            points = NULL,
            feedback = NULL,
            graded_by = NULL,
            graded_at = NULL
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.assignment_id)
    .bind(params.student_id)
    .bind(params.content)
    .bind(params.attachment_key)
    .bind(params.attachment_name)
    .bind(params.submitted_at)
    .bind(params.is_late)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_student(
    pool: &PgPool,
    assignment_id: &str,
    student_id: &str,
) -> Result<Option<AssignmentSubmission>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentSubmission>(&format!(
        "SELECT {COLUMNS} FROM assignment_submissions WHERE assignment_id = $1 AND student_id = $2"
    ))
    .bind(assignment_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_in_assignment(
    pool: &PgPool,
    assignment_id: &str,
    id: &str,
) -> Result<Option<AssignmentSubmission>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentSubmission>(&format!(
        "SELECT {COLUMNS} FROM assignment_submissions WHERE id = $1 AND assignment_id = $2"
    ))
    .bind(id)
    .bind(assignment_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_assignment(
    pool: &PgPool,
    assignment_id: &str,
) -> Result<Vec<AssignmentSubmission>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentSubmission>(&format!(
        "SELECT {COLUMNS} FROM assignment_submissions WHERE assignment_id = $1
         ORDER BY submitted_at ASC"
    ))
    .bind(assignment_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn attachment_keys_by_assignment(
    pool: &PgPool,
    assignment_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT attachment_key FROM assignment_submissions
         WHERE assignment_id = $1 AND attachment_key IS NOT NULL",
    )
    .bind(assignment_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn attachment_keys_by_course(
    pool: &PgPool,
    course_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT s.attachment_key FROM assignment_submissions s
         JOIN assignments a ON a.id = s.assignment_id
         WHERE a.course_id = $1 AND s.attachment_key IS NOT NULL",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct GradeSubmission<'a> {
    pub(crate) points: f64,
    pub(crate) feedback: Option<&'a str>,
    pub(crate) graded_by: &'a str,
    pub(crate) graded_at: time::PrimitiveDateTime,
}

pub(crate) async fn grade(
    pool: &PgPool,
    id: &str,
    params: GradeSubmission<'_>,
) -> Result<Option<AssignmentSubmission>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentSubmission>(&format!(
        "UPDATE assignment_submissions SET
            points = $1, feedback = $2, graded_by = $3, graded_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}",
    ))
    .bind(params.points)
    .bind(params.feedback)
    .bind(params.graded_by)
    .bind(params.graded_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}
