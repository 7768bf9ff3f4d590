pub(crate) mod assignments;
pub(crate) mod auth;
pub(crate) mod classrooms;
pub(crate) mod courses;
pub(crate) mod downloads;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod live_sessions;
pub(crate) mod pagination;
pub(crate) mod quizzes;
pub(crate) mod router;
pub(crate) mod uploads;
pub(crate) mod users;
pub(crate) mod validation;
