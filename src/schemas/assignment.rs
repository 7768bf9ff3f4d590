use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::schemas::datetime::deserialize_option_datetime;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssignmentCreate {
    #[validate(length(min = 1, max = 255, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "dueAt", deserialize_with = "deserialize_option_datetime")]
    pub(crate) due_at: Option<PrimitiveDateTime>,
    #[serde(default = "default_max_points", alias = "maxPoints")]
    #[validate(range(exclusive_min = 0.0, message = "max_points must be positive"))]
    pub(crate) max_points: f64,
    #[serde(default, alias = "allowLate")]
    pub(crate) allow_late: bool,
    #[serde(default, alias = "isPublished")]
    pub(crate) is_published: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssignmentUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "dueAt", deserialize_with = "deserialize_option_datetime")]
    pub(crate) due_at: Option<PrimitiveDateTime>,
    #[serde(default, alias = "maxPoints")]
    #[validate(range(exclusive_min = 0.0, message = "max_points must be positive"))]
    pub(crate) max_points: Option<f64>,
    #[serde(default, alias = "allowLate")]
    pub(crate) allow_late: Option<bool>,
    #[serde(default, alias = "isPublished")]
    pub(crate) is_published: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) due_at: Option<String>,
    pub(crate) max_points: f64,
    pub(crate) allow_late: bool,
    pub(crate) is_published: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl AssignmentResponse {
    pub(crate) fn from_db(assignment: crate::db::models::Assignment) -> Self {
        Self {
            id: assignment.id,
            course_id: assignment.course_id,
            title: assignment.title,
            description: assignment.description,
            due_at: assignment.due_at.map(format_primitive),
            max_points: assignment.max_points,
            allow_late: assignment.allow_late,
            is_published: assignment.is_published,
            created_by: assignment.created_by,
            created_at: format_primitive(assignment.created_at),
            updated_at: format_primitive(assignment.updated_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionCreate {
    #[serde(default)]
    pub(crate) content: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmissionGrade {
    #[validate(range(min = 0.0, message = "points must be non-negative"))]
    pub(crate) points: f64,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) student_id: String,
    pub(crate) content: Option<String>,
    pub(crate) attachment_name: Option<String>,
    pub(crate) has_attachment: bool,
    pub(crate) submitted_at: String,
    pub(crate) is_late: bool,
    pub(crate) points: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) graded_by: Option<String>,
    pub(crate) graded_at: Option<String>,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: crate::db::models::AssignmentSubmission) -> Self {
        Self {
            id: submission.id,
            assignment_id: submission.assignment_id,
            student_id: submission.student_id,
            content: submission.content,
            attachment_name: submission.attachment_name,
            has_attachment: submission.attachment_key.is_some(),
            submitted_at: format_primitive(submission.submitted_at),
            is_late: submission.is_late,
            points: submission.points,
            feedback: submission.feedback,
            graded_by: submission.graded_by,
            graded_at: submission.graded_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct FileUrlResponse {
    pub(crate) url: String,
    pub(crate) expires_in_seconds: u64,
}

fn default_max_points() -> f64 {
    100.0
}
