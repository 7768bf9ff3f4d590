use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ClassroomCreate {
    #[validate(length(min = 1, max = 255, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ClassroomUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "name must not be empty"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JoinClassroomRequest {
    #[serde(alias = "joinCode", alias = "code")]
    pub(crate) join_code: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddStudentRequest {
    #[serde(alias = "studentId")]
    pub(crate) student_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassroomResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) teacher_id: String,
    /// Hidden from students.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) join_code: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ClassroomResponse {
    pub(crate) fn from_db(classroom: crate::db::models::Classroom, show_join_code: bool) -> Self {
        Self {
            id: classroom.id,
            name: classroom.name,
            description: classroom.description,
            teacher_id: classroom.teacher_id,
            join_code: show_join_code.then_some(classroom.join_code),
            created_at: format_primitive(classroom.created_at),
            updated_at: format_primitive(classroom.updated_at),
        }
    }
}
