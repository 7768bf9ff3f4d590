use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use validator::Validate;

use crate::core::time::{format_primitive, seconds_until};
use crate::db::documents::{GradedAnswer, Question, QuestionType};
use crate::db::types::AttemptStatus;
use crate::services::quiz_grading::ManualGrade;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizCreate {
    #[validate(length(min = 1, max = 255, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    /// Raw author input; normalized before storage.
    pub(crate) questions: serde_json::Value,
    #[serde(default, alias = "passingScore")]
    #[validate(range(min = 0.0, max = 100.0, message = "passing_score must be between 0 and 100"))]
    pub(crate) passing_score: Option<f64>,
    #[serde(default, alias = "maxAttempts")]
    #[validate(range(min = 1, message = "max_attempts must be positive"))]
    pub(crate) max_attempts: Option<i32>,
    #[serde(default, alias = "timeLimitMinutes")]
    #[validate(range(min = 1, message = "time_limit_minutes must be positive"))]
    pub(crate) time_limit_minutes: Option<i32>,
    #[serde(default, alias = "isPublished")]
    pub(crate) is_published: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) questions: Option<serde_json::Value>,
    #[serde(default, alias = "passingScore")]
    #[validate(range(min = 0.0, max = 100.0, message = "passing_score must be between 0 and 100"))]
    pub(crate) passing_score: Option<f64>,
    #[serde(default, alias = "maxAttempts")]
    #[validate(range(min = 1, message = "max_attempts must be positive"))]
    pub(crate) max_attempts: Option<i32>,
    #[serde(default, alias = "timeLimitMinutes")]
    #[validate(range(min = 1, message = "time_limit_minutes must be positive"))]
    pub(crate) time_limit_minutes: Option<i32>,
}

/// Question as shown to students: no answers, tolerance, samples or explanation.
#[derive(Debug, Serialize)]
pub(crate) struct PublicQuestion {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) points: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) options: Vec<String>,
}

impl PublicQuestion {
    fn from_question(question: Question) -> Self {
        let question_type = question.kind.question_type();
        let options = question.kind.options().to_vec();
        Self { id: question.id, question_type, prompt: question.prompt, points: question.points, options }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum QuestionView {
    Full(Question),
    Public(PublicQuestion),
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) question_count: usize,
    pub(crate) questions: Vec<QuestionView>,
    pub(crate) total_points: f64,
    pub(crate) passing_score: f64,
    pub(crate) max_attempts: i32,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) is_published: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl QuizResponse {
    pub(crate) fn from_db(quiz: crate::db::models::Quiz, reveal_answers: bool) -> Self {
        let questions = quiz.questions.0;
        let question_count = questions.len();
        let questions = questions
            .into_iter()
            .map(|question| {
                if reveal_answers {
                    QuestionView::Full(question)
                } else {
                    QuestionView::Public(PublicQuestion::from_question(question))
                }
            })
            .collect();

        Self {
            id: quiz.id,
            course_id: quiz.course_id,
            title: quiz.title,
            description: quiz.description,
            question_count,
            questions,
            total_points: quiz.total_points,
            passing_score: quiz.passing_score,
            max_attempts: quiz.max_attempts,
            time_limit_minutes: quiz.time_limit_minutes,
            is_published: quiz.is_published,
            created_by: quiz.created_by,
            created_at: format_primitive(quiz.created_at),
            updated_at: format_primitive(quiz.updated_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptSubmit {
    #[serde(default)]
    pub(crate) answers: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptGradeRequest {
    pub(crate) grades: Vec<ManualGrade>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptListQuery {
    #[serde(default, alias = "studentId")]
    pub(crate) student_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) course_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) status: AttemptStatus,
    pub(crate) answers: Vec<GradedAnswer>,
    pub(crate) score: f64,
    pub(crate) total_points: f64,
    pub(crate) percentage: f64,
    pub(crate) passed: bool,
    pub(crate) needs_manual_grading: bool,
    pub(crate) started_at: String,
    pub(crate) expires_at: Option<String>,
    pub(crate) submitted_at: Option<String>,
    pub(crate) updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) time_remaining_seconds: Option<i64>,
}

impl AttemptResponse {
    /// Graded answers are only shown to students once the attempt is completed.
    pub(crate) fn from_db(
        attempt: crate::db::models::QuizAttempt,
        is_manager: bool,
        now: PrimitiveDateTime,
    ) -> Self {
        let show_answers = is_manager || attempt.status == AttemptStatus::Completed;
        let time_remaining_seconds = match (attempt.status, attempt.expires_at) {
            (AttemptStatus::InProgress, Some(expires_at)) => Some(seconds_until(expires_at, now)),
            _ => None,
        };

        Self {
            id: attempt.id,
            quiz_id: attempt.quiz_id,
            course_id: attempt.course_id,
            student_id: attempt.student_id,
            attempt_number: attempt.attempt_number,
            status: attempt.status,
            answers: if show_answers { attempt.answers.0 } else { Vec::new() },
            score: attempt.score,
            total_points: attempt.total_points,
            percentage: attempt.percentage,
            passed: attempt.passed,
            needs_manual_grading: attempt.needs_manual_grading,
            started_at: format_primitive(attempt.started_at),
            expires_at: attempt.expires_at.map(format_primitive),
            submitted_at: attempt.submitted_at.map(format_primitive),
            updated_at: format_primitive(attempt.updated_at),
            time_remaining_seconds,
        }
    }
}
