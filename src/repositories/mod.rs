pub(crate) mod assignment_submissions;
pub(crate) mod assignments;
pub(crate) mod classrooms;
pub(crate) mod courses;
pub(crate) mod downloads;
pub(crate) mod health;
pub(crate) mod live_sessions;
pub(crate) mod quiz_attempts;
pub(crate) mod quizzes;
pub(crate) mod users;
