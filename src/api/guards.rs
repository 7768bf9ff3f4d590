use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::{Course, User};
use crate::db::types::UserRole;
use crate::repositories;

pub(crate) struct CurrentUser(pub(crate) User);
pub(crate) struct CurrentAdmin(pub(crate) User);
/// Teacher or admin.
pub(crate) struct CurrentStaff(pub(crate) User);

/// A course the caller may read, and whether they may also manage it.
#[derive(Debug, Clone)]
pub(crate) struct CourseAccess {
    pub(crate) course: Course,
    pub(crate) is_manager: bool,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let user = repositories::users::find_by_id(app_state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

        let Some(user) = user else {
            return Err(ApiError::Unauthorized("User not found"));
        };

        if !user.is_active {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if user.is_admin() {
            Ok(CurrentAdmin(user))
        } else {
            Err(ApiError::Forbidden("Admin access required"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStaff {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if user.role.is_staff() {
            Ok(CurrentStaff(user))
        } else {
            Err(ApiError::Forbidden("Teacher access required"))
        }
    }
}

pub(crate) fn require_student(user: &User) -> Result<(), ApiError> {
    if user.role == UserRole::Student {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Only students can perform this action"))
    }
}

pub(crate) async fn load_course(state: &AppState, course_id: &str) -> Result<Course, ApiError> {
    repositories::courses::find_by_id(state.db(), course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))
}

pub(crate) fn can_manage_course(user: &User, course: &Course) -> bool {
    user.is_admin() || (user.role == UserRole::Teacher && course.teacher_id == user.id)
}

/// Owning teacher or admin.
pub(crate) async fn require_course_manager(
    state: &AppState,
    user: &User,
    course_id: &str,
) -> Result<Course, ApiError> {
    let course = load_course(state, course_id).await?;
    if can_manage_course(user, &course) {
        Ok(course)
    } else {
        Err(ApiError::Forbidden("Not enough permissions for this course"))
    }
}

/// Managers always read; students read published courses they are enrolled in
/// or whose classroom they belong to.
pub(crate) async fn require_course_reader(
    state: &AppState,
    user: &User,
    course_id: &str,
) -> Result<CourseAccess, ApiError> {
    let course = load_course(state, course_id).await?;
    if can_manage_course(user, &course) {
        return Ok(CourseAccess { course, is_manager: true });
    }

    if user.role != UserRole::Student || !course.is_published {
        return Err(ApiError::Forbidden("Access to this course is not allowed"));
    }

    let has_access = repositories::courses::student_has_access(state.db(), &course, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check course access"))?;

    if has_access {
        Ok(CourseAccess { course, is_manager: false })
    } else {
        Err(ApiError::Forbidden("Access to this course is not allowed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn user(id: &str, role: UserRole) -> User {
        let at = datetime!(2025-01-01 00:00:00);
        User {
            id: id.into(),
            email: format!("{id}@classhub.test"),
            hashed_password: String::new(),
            full_name: id.into(),
            role,
            is_active: true,
            created_at: at,
            updated_at: at,
        }
    }

    fn course(teacher_id: &str) -> Course {
        let at = datetime!(2025-01-01 00:00:00);
        Course {
            id: "course".into(),
            title: "Algebra".into(),
            description: None,
            teacher_id: teacher_id.into(),
            classroom_id: None,
            is_published: true,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn owner_and_admin_manage_course() {
        let course = course("teacher-1");
        assert!(can_manage_course(&user("teacher-1", UserRole::Teacher), &course));
        assert!(can_manage_course(&user("root", UserRole::Admin), &course));
        assert!(!can_manage_course(&user("teacher-2", UserRole::Teacher), &course));
    }

    #[test]
    fn student_with_owner_id_does_not_manage() {
        let course = course("same-id");
        assert!(!can_manage_course(&user("same-id", UserRole::Student), &course));
    }

    #[test]
    fn only_students_pass_student_check() {
        assert!(require_student(&user("s", UserRole::Student)).is_ok());
        assert!(require_student(&user("t", UserRole::Teacher)).is_err());
    }
}
