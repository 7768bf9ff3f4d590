use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::db::documents::{GradedAnswer, Question, QuestionKind, QuestionType};
use crate::services::quiz_normalize::{number_from, resolve_option_ref};

/// Absorbs float representation error in numerical answers and manual points.
const FLOAT_SLACK: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum SubmissionError {
    #[error("answers must be an array of {{question_id, answer}} objects or an object keyed by question id")]
    Malformed,
    #[error("answer for unknown question '{0}'")]
    UnknownQuestion(String),
    #[error("question '{0}' was answered more than once")]
    DuplicateAnswer(String),
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum ManualGradeError {
    #[error("question '{0}' is not part of this attempt")]
    UnknownQuestion(String),
    #[error("question '{0}' is graded automatically")]
    NotLongAnswer(String),
    #[error("points for question '{question_id}' must be between 0 and {max_points}")]
    PointsOutOfRange { question_id: String, max_points: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoreSummary {
    pub(crate) score: f64,
    pub(crate) total_points: f64,
    pub(crate) percentage: f64,
    pub(crate) passed: bool,
    pub(crate) needs_manual_grading: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ManualGrade {
    pub(crate) question_id: String,
    pub(crate) points: f64,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

/// Accepts `[{question_id, answer}]` or `{question_id: answer}` and checks every id
/// against the quiz.
pub(crate) fn collect_answers(
    questions: &[Question],
    raw: &Value,
) -> Result<HashMap<String, Value>, SubmissionError> {
    let known: HashSet<&str> = questions.iter().map(|question| question.id.as_str()).collect();
    let mut answers = HashMap::new();

    let mut insert = |question_id: &str, answer: Value| {
        if !known.contains(question_id) {
            return Err(SubmissionError::UnknownQuestion(question_id.to_string()));
        }
        if answers.insert(question_id.to_string(), answer).is_some() {
            return Err(SubmissionError::DuplicateAnswer(question_id.to_string()));
        }
        Ok(())
    };

    match raw {
        Value::Array(items) => {
            for item in items {
                // Numeric ids were stored as strings when the quiz was normalized.
                let question_id = match item.get("question_id") {
                    Some(Value::String(id)) => id.clone(),
                    Some(Value::Number(id)) => id.to_string(),
                    _ => return Err(SubmissionError::Malformed),
                };
                let answer = item.get("answer").cloned().unwrap_or(Value::Null);
                insert(&question_id, answer)?;
            }
        }
        Value::Object(entries) => {
            for (question_id, answer) in entries {
                insert(question_id, answer.clone())?;
            }
        }
        Value::Null => {}
        _ => return Err(SubmissionError::Malformed),
    }

    Ok(answers)
}

/// Grades every question of the quiz, in quiz order. Questions without an entry in
/// `answers` are graded as unanswered.
pub(crate) fn grade_submission(
    questions: &[Question],
    answers: &HashMap<String, Value>,
) -> Vec<GradedAnswer> {
    questions
        .iter()
        .map(|question| grade_answer(question, answers.get(&question.id)))
        .collect()
}

pub(crate) fn grade_answer(question: &Question, answer: Option<&Value>) -> GradedAnswer {
    let question_type = question.kind.question_type();
    let answer = answer.filter(|value| !is_blank(value)).cloned();

    let mut graded = GradedAnswer {
        question_id: question.id.clone(),
        question_type,
        answer: answer.clone().unwrap_or(Value::Null),
        is_correct: Some(false),
        points_earned: 0.0,
        max_points: question.points,
        pending_review: false,
        feedback: None,
    };

    let Some(answer) = answer else {
        return graded;
    };

    let correct = match &question.kind {
        QuestionKind::Mcq { options, correct_option } => resolve_option_ref(&answer, options)
            .is_some_and(|index| &options[index] == correct_option),
        QuestionKind::MultipleChoice { options, correct_options } => {
            multiple_choice_matches(&answer, options, correct_options)
        }
        QuestionKind::Numerical { correct_value, tolerance } => number_from(&answer)
            .is_some_and(|value| (value - correct_value).abs() <= tolerance + FLOAT_SLACK),
        QuestionKind::LongAnswer { .. } => {
            graded.is_correct = None;
            graded.pending_review = true;
            return graded;
        }
    };

    graded.is_correct = Some(correct);
    if correct {
        graded.points_earned = question.points;
    }
    graded
}

fn multiple_choice_matches(answer: &Value, options: &[String], correct_options: &[String]) -> bool {
    let Some(references) = answer.as_array() else {
        return false;
    };

    let mut selected = HashSet::with_capacity(references.len());
    for reference in references {
        match resolve_option_ref(reference, options) {
            Some(index) => {
                selected.insert(options[index].as_str());
            }
            None => return false,
        }
    }

    let expected: HashSet<&str> = correct_options.iter().map(String::as_str).collect();
    selected == expected
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

pub(crate) fn summarize(answers: &[GradedAnswer], total_points: f64, passing_score: f64) -> ScoreSummary {
    let score: f64 = answers.iter().map(|answer| answer.points_earned).sum();
    let percentage = if total_points > 0.0 { round2(score / total_points * 100.0) } else { 0.0 };

    ScoreSummary {
        score: round2(score),
        total_points,
        percentage,
        passed: percentage >= passing_score,
        needs_manual_grading: answers.iter().any(|answer| answer.pending_review),
    }
}

/// Applies teacher scores to long answers. Full marks count as correct.
pub(crate) fn apply_manual_grades(
    answers: &mut [GradedAnswer],
    grades: &[ManualGrade],
) -> Result<(), ManualGradeError> {
    for grade in grades {
        let answer = answers
            .iter_mut()
            .find(|answer| answer.question_id == grade.question_id)
            .ok_or_else(|| ManualGradeError::UnknownQuestion(grade.question_id.clone()))?;

        if answer.question_type != QuestionType::LongAnswer {
            return Err(ManualGradeError::NotLongAnswer(grade.question_id.clone()));
        }
        if !grade.points.is_finite()
            || grade.points < 0.0
            || grade.points > answer.max_points + FLOAT_SLACK
        {
            return Err(ManualGradeError::PointsOutOfRange {
                question_id: grade.question_id.clone(),
                max_points: answer.max_points,
            });
        }

        answer.points_earned = grade.points.min(answer.max_points);
        answer.is_correct = Some(answer.max_points - answer.points_earned <= FLOAT_SLACK);
        answer.pending_review = false;
        answer.feedback = grade
            .feedback
            .as_deref()
            .map(str::trim)
            .filter(|feedback| !feedback.is_empty())
            .map(str::to_string);
    }
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mcq() -> Question {
        Question {
            id: "capital".into(),
            prompt: "Capital of France?".into(),
            points: 2.0,
            explanation: None,
            kind: QuestionKind::Mcq {
                options: vec!["Berlin".into(), "Paris".into(), "Rome".into()],
                correct_option: "Paris".into(),
            },
        }
    }

    fn multiple() -> Question {
        Question {
            id: "primes".into(),
            prompt: "Primes".into(),
            points: 3.0,
            explanation: None,
            kind: QuestionKind::MultipleChoice {
                options: vec!["2".into(), "4".into(), "5".into()],
                correct_options: vec!["2".into(), "5".into()],
            },
        }
    }

    fn numerical() -> Question {
        Question {
            id: "pi".into(),
            prompt: "pi to two places".into(),
            points: 1.0,
            explanation: None,
            kind: QuestionKind::Numerical { correct_value: 3.14, tolerance: 0.01 },
        }
    }

    fn essay() -> Question {
        Question {
            id: "essay".into(),
            prompt: "Discuss".into(),
            points: 4.0,
            explanation: None,
            kind: QuestionKind::LongAnswer { sample_answer: None },
        }
    }

    #[test]
    fn mcq_accepts_index_or_text() {
        let question = mcq();
        assert_eq!(grade_answer(&question, Some(&json!(1))).points_earned, 2.0);
        assert_eq!(grade_answer(&question, Some(&json!(" Paris "))).is_correct, Some(true));
        assert_eq!(grade_answer(&question, Some(&json!("Rome"))).is_correct, Some(false));
        assert_eq!(grade_answer(&question, Some(&json!(9))).is_correct, Some(false));
    }

    #[test]
    fn multiple_choice_requires_exact_set() {
        let question = multiple();
        assert_eq!(grade_answer(&question, Some(&json!(["5", 0]))).is_correct, Some(true));
        assert_eq!(grade_answer(&question, Some(&json!(["2"]))).is_correct, Some(false));
        assert_eq!(grade_answer(&question, Some(&json!(["2", "5", "4"]))).is_correct, Some(false));
        assert_eq!(grade_answer(&question, Some(&json!(["2", "5", "nope"]))).is_correct, Some(false));
        assert_eq!(grade_answer(&question, Some(&json!("2"))).is_correct, Some(false));
    }

    #[test]
    fn numerical_tolerance_is_inclusive() {
        let question = numerical();
        assert_eq!(grade_answer(&question, Some(&json!(3.15))).is_correct, Some(true));
        assert_eq!(grade_answer(&question, Some(&json!("3.13"))).is_correct, Some(true));
        assert_eq!(grade_answer(&question, Some(&json!(3.16))).is_correct, Some(false));
        assert_eq!(grade_answer(&question, Some(&json!("abc"))).is_correct, Some(false));
    }

    #[test]
    fn long_answer_waits_for_review() {
        let graded = grade_answer(&essay(), Some(&json!("It depends.")));
        assert_eq!(graded.is_correct, None);
        assert!(graded.pending_review);
        assert_eq!(graded.points_earned, 0.0);
    }

    #[test]
    fn unanswered_questions_score_zero() {
        for question in [mcq(), essay()] {
            let graded = grade_answer(&question, None);
            assert_eq!(graded.is_correct, Some(false));
            assert!(!graded.pending_review);
            assert_eq!(graded.answer, Value::Null);
        }
        assert_eq!(grade_answer(&essay(), Some(&json!("   "))).is_correct, Some(false));
    }

    #[test]
    fn collect_answers_accepts_list_and_map() {
        let questions = vec![mcq(), numerical()];
        let from_list =
            collect_answers(&questions, &json!([{"question_id": "capital", "answer": 1}])).unwrap();
        assert_eq!(from_list.get("capital"), Some(&json!(1)));

        let from_map = collect_answers(&questions, &json!({"pi": 3.14})).unwrap();
        assert_eq!(from_map.get("pi"), Some(&json!(3.14)));

        assert_eq!(
            collect_answers(&questions, &json!({"ghost": 1})).unwrap_err(),
            SubmissionError::UnknownQuestion("ghost".into())
        );
        assert_eq!(
            collect_answers(
                &questions,
                &json!([{"question_id": "pi", "answer": 1}, {"question_id": "pi", "answer": 2}])
            )
            .unwrap_err(),
            SubmissionError::DuplicateAnswer("pi".into())
        );
        assert_eq!(collect_answers(&questions, &json!(7)).unwrap_err(), SubmissionError::Malformed);
    }

    #[test]
    fn list_form_accepts_numeric_question_ids() {
        let mut numbered = mcq();
        numbered.id = "7".into();
        let questions = vec![numbered];

        let answers =
            collect_answers(&questions, &json!([{"question_id": 7, "answer": "Paris"}])).unwrap();
        assert_eq!(answers.get("7"), Some(&json!("Paris")));

        assert_eq!(
            collect_answers(&questions, &json!([{"question_id": true, "answer": 1}])).unwrap_err(),
            SubmissionError::Malformed
        );
    }

    #[test]
    fn summary_rounds_percentage_and_applies_threshold() {
        let questions = vec![mcq(), multiple(), numerical(), essay()];
        let answers = collect_answers(
            &questions,
            &json!({"capital": "Paris", "primes": ["2"], "pi": 3.14, "essay": "text"}),
        )
        .unwrap();
        let graded = grade_submission(&questions, &answers);

        let summary = summarize(&graded, 10.0, 30.0);
        assert_eq!(summary.score, 3.0);
        assert_eq!(summary.percentage, 30.0);
        assert!(summary.passed);
        assert!(summary.needs_manual_grading);

        let thirds = summarize(&graded[..1], 3.0, 70.0);
        assert_eq!(thirds.percentage, 66.67);
        assert!(!thirds.passed);

        assert_eq!(summarize(&[], 0.0, 0.0).percentage, 0.0);
    }

    #[test]
    fn manual_grades_update_long_answers_only() {
        let questions = vec![mcq(), essay()];
        let answers = collect_answers(&questions, &json!({"capital": 1, "essay": "long text"})).unwrap();
        let mut graded = grade_submission(&questions, &answers);

        let err = apply_manual_grades(
            &mut graded,
            &[ManualGrade { question_id: "capital".into(), points: 1.0, feedback: None }],
        )
        .unwrap_err();
        assert_eq!(err, ManualGradeError::NotLongAnswer("capital".into()));

        let err = apply_manual_grades(
            &mut graded,
            &[ManualGrade { question_id: "essay".into(), points: 5.0, feedback: None }],
        )
        .unwrap_err();
        assert!(matches!(err, ManualGradeError::PointsOutOfRange { .. }));

        apply_manual_grades(
            &mut graded,
            &[ManualGrade {
                question_id: "essay".into(),
                points: 3.0,
                feedback: Some(" Good structure ".into()),
            }],
        )
        .unwrap();

        let essay = &graded[1];
        assert_eq!(essay.points_earned, 3.0);
        assert_eq!(essay.is_correct, Some(false));
        assert!(!essay.pending_review);
        assert_eq!(essay.feedback.as_deref(), Some("Good structure"));

        let summary = summarize(&graded, 6.0, 50.0);
        assert_eq!(summary.score, 5.0);
        assert_eq!(summary.percentage, 83.33);
        assert!(!summary.needs_manual_grading);
    }
}
