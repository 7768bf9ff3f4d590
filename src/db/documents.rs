//! JSONB documents stored inside `quizzes.questions` and `quiz_attempts.answers`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum QuestionType {
    Mcq,
    MultipleChoice,
    Numerical,
    LongAnswer,
}

/// Canonical question shape. Every stored question went through
/// `services::quiz_normalize`, so option texts are trimmed and unique and the
/// correct answers always refer to option texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) prompt: String,
    pub(crate) points: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) explanation: Option<String>,
    #[serde(flatten)]
    pub(crate) kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum QuestionKind {
    Mcq {
        options: Vec<String>,
        correct_option: String,
    },
    MultipleChoice {
        options: Vec<String>,
        correct_options: Vec<String>,
    },
    Numerical {
        correct_value: f64,
        #[serde(default)]
        tolerance: f64,
    },
    LongAnswer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sample_answer: Option<String>,
    },
}

impl QuestionKind {
    pub(crate) fn question_type(&self) -> QuestionType {
        match self {
            Self::Mcq { .. } => QuestionType::Mcq,
            Self::MultipleChoice { .. } => QuestionType::MultipleChoice,
            Self::Numerical { .. } => QuestionType::Numerical,
            Self::LongAnswer { .. } => QuestionType::LongAnswer,
        }
    }

    pub(crate) fn options(&self) -> &[String] {
        match self {
            Self::Mcq { options, .. } | Self::MultipleChoice { options, .. } => options,
            Self::Numerical { .. } | Self::LongAnswer { .. } => &[],
        }
    }
}

/// One graded answer inside an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct GradedAnswer {
    pub(crate) question_id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) answer: serde_json::Value,
    /// `None` while a long answer waits for a teacher.
    pub(crate) is_correct: Option<bool>,
    pub(crate) points_earned: f64,
    pub(crate) max_points: f64,
    #[serde(default)]
    pub(crate) pending_review: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) feedback: Option<String>,
}
