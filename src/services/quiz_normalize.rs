//! Turns author-supplied question JSON into canonical [`Question`] documents.
//!
//! Authoring tools send several dialects: legacy type names, options as plain
//! strings or as `{text, is_correct}` objects, and correct answers given either
//! as option indices or as option text. Everything stored in `quizzes.questions`
//! has passed through [`normalize_questions`].

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::db::documents::{Question, QuestionKind, QuestionType};

const DEFAULT_POINTS: f64 = 1.0;
const MIN_CHOICE_OPTIONS: usize = 2;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum NormalizeError {
    #[error("questions must be a JSON array")]
    NotAnArray,
    #[error("quiz must contain at least one question")]
    NoQuestions,
    #[error("quiz cannot contain more than {max} questions")]
    TooManyQuestions { max: usize },
    #[error("question {position}: expected a JSON object")]
    NotAnObject { position: usize },
    #[error("question {position}: missing question type")]
    MissingType { position: usize },
    #[error("question {position}: unknown question type '{value}'")]
    UnknownType { position: usize, value: String },
    #[error("question {position}: prompt is required")]
    EmptyPrompt { position: usize },
    #[error("question {position}: at least two options are required")]
    TooFewOptions { position: usize },
    #[error("question {position}: option {option} is not a string or an object with text")]
    InvalidOption { position: usize, option: usize },
    #[error("question {position}: option {option} is empty")]
    EmptyOption { position: usize, option: usize },
    #[error("question {position}: duplicate option '{text}'")]
    DuplicateOption { position: usize, text: String },
    #[error("question {position}: correct answer is missing")]
    MissingCorrectAnswer { position: usize },
    #[error("question {position}: single-choice question must have exactly one correct option")]
    AmbiguousCorrectAnswer { position: usize },
    #[error("question {position}: correct answer '{reference}' does not match any option")]
    UnresolvedAnswer { position: usize, reference: String },
    #[error("question {position}: '{field}' must be a finite number")]
    InvalidNumber { position: usize, field: &'static str },
    #[error("question {position}: tolerance cannot be negative")]
    NegativeTolerance { position: usize },
    #[error("question {position}: points must be greater than zero")]
    InvalidPoints { position: usize },
    #[error("duplicate question id '{id}'")]
    DuplicateId { id: String },
}

/// Maps a raw type string, canonical or legacy, onto a [`QuestionType`].
pub(crate) fn parse_question_type(raw: &str) -> Option<QuestionType> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "mcq" | "mcq-single" | "single_choice" | "single" => Some(QuestionType::Mcq),
        "multiple_choice" | "mcq-multiple" | "multiple" | "multi" | "multiple-choice" => {
            Some(QuestionType::MultipleChoice)
        }
        "numerical" | "numeric" | "number" => Some(QuestionType::Numerical),
        "long_answer" | "long-answer" | "essay" | "text" => Some(QuestionType::LongAnswer),
        _ => None,
    }
}

pub(crate) fn normalize_questions(
    raw: &Value,
    max_questions: usize,
) -> Result<Vec<Question>, NormalizeError> {
    let items = raw.as_array().ok_or(NormalizeError::NotAnArray)?;
    if items.is_empty() {
        return Err(NormalizeError::NoQuestions);
    }
    if items.len() > max_questions {
        return Err(NormalizeError::TooManyQuestions { max: max_questions });
    }

    let mut seen_ids = HashSet::with_capacity(items.len());
    let mut questions = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let question = normalize_question(item, index + 1)?;
        if !seen_ids.insert(question.id.clone()) {
            return Err(NormalizeError::DuplicateId { id: question.id });
        }
        questions.push(question);
    }

    Ok(questions)
}

pub(crate) fn total_points(questions: &[Question]) -> f64 {
    questions.iter().map(|question| question.points).sum()
}

fn normalize_question(raw: &Value, position: usize) -> Result<Question, NormalizeError> {
    let object = raw.as_object().ok_or(NormalizeError::NotAnObject { position })?;

    let type_raw = first_str(object, &["type", "question_type"])
        .ok_or(NormalizeError::MissingType { position })?;
    let question_type = parse_question_type(type_raw)
        .ok_or_else(|| NormalizeError::UnknownType { position, value: type_raw.to_string() })?;

    let prompt = first_str(object, &["prompt", "question", "text"])
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(NormalizeError::EmptyPrompt { position })?
        .to_string();

    let points = match object.get("points").filter(|value| !value.is_null()) {
        None => DEFAULT_POINTS,
        Some(value) => {
            let points = number_from(value)
                .ok_or(NormalizeError::InvalidNumber { position, field: "points" })?;
            if points <= 0.0 {
                return Err(NormalizeError::InvalidPoints { position });
            }
            points
        }
    };

    let id = match object.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        _ => Uuid::new_v4().to_string(),
    };

    let explanation = object
        .get("explanation")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let kind = match question_type {
        QuestionType::Mcq => normalize_mcq(object, position)?,
        QuestionType::MultipleChoice => normalize_multiple_choice(object, position)?,
        QuestionType::Numerical => normalize_numerical(object, position)?,
        QuestionType::LongAnswer => QuestionKind::LongAnswer {
            sample_answer: object
                .get("sample_answer")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        },
    };

    Ok(Question { id, prompt, points, explanation, kind })
}

fn normalize_mcq(object: &Map<String, Value>, position: usize) -> Result<QuestionKind, NormalizeError> {
    let (options, flagged) = parse_options(object, position)?;

    let resolved = match first_present(object, &["correct_option", "correct_answer", "answer"]) {
        Some(reference) => resolve_references(reference, &options, position)?,
        None => flagged,
    };

    match resolved.as_slice() {
        [] => Err(NormalizeError::MissingCorrectAnswer { position }),
        [index] => {
            let correct_option = options[*index].clone();
            Ok(QuestionKind::Mcq { options, correct_option })
        }
        _ => Err(NormalizeError::AmbiguousCorrectAnswer { position }),
    }
}

fn normalize_multiple_choice(
    object: &Map<String, Value>,
    position: usize,
) -> Result<QuestionKind, NormalizeError> {
    let (options, flagged) = parse_options(object, position)?;

    let resolved = match first_present(object, &["correct_options", "correct_answers", "answers"]) {
        Some(reference) => resolve_references(reference, &options, position)?,
        None => flagged,
    };
    if resolved.is_empty() {
        return Err(NormalizeError::MissingCorrectAnswer { position });
    }

    let correct_options = resolved.iter().map(|index| options[*index].clone()).collect();
    Ok(QuestionKind::MultipleChoice { options, correct_options })
}

fn normalize_numerical(
    object: &Map<String, Value>,
    position: usize,
) -> Result<QuestionKind, NormalizeError> {
    let correct_value = first_present(object, &["correct_value", "correct_answer", "answer"])
        .ok_or(NormalizeError::MissingCorrectAnswer { position })
        .and_then(|value| {
            number_from(value).ok_or(NormalizeError::InvalidNumber { position, field: "correct_value" })
        })?;

    let tolerance = match object.get("tolerance").filter(|value| !value.is_null()) {
        None => 0.0,
        Some(value) => {
            let tolerance = number_from(value)
                .ok_or(NormalizeError::InvalidNumber { position, field: "tolerance" })?;
            if tolerance < 0.0 {
                return Err(NormalizeError::NegativeTolerance { position });
            }
            tolerance
        }
    };

    Ok(QuestionKind::Numerical { correct_value, tolerance })
}

/// Returns the trimmed option texts plus the indices flagged `is_correct`/`correct`.
fn parse_options(
    object: &Map<String, Value>,
    position: usize,
) -> Result<(Vec<String>, Vec<usize>), NormalizeError> {
    let raw_options = object.get("options").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);

    let mut options = Vec::with_capacity(raw_options.len());
    let mut flagged = Vec::new();
    for (index, raw) in raw_options.iter().enumerate() {
        let option = index + 1;
        let text = match raw {
            Value::String(text) => text.as_str(),
            Value::Object(fields) => {
                let is_correct = ["is_correct", "correct"]
                    .iter()
                    .any(|key| fields.get(*key).and_then(Value::as_bool) == Some(true));
                if is_correct {
                    flagged.push(index);
                }
                first_str(fields, &["text", "label"])
                    .ok_or(NormalizeError::InvalidOption { position, option })?
            }
            _ => return Err(NormalizeError::InvalidOption { position, option }),
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(NormalizeError::EmptyOption { position, option });
        }
        if options.iter().any(|existing: &String| existing == text) {
            return Err(NormalizeError::DuplicateOption { position, text: text.to_string() });
        }
        options.push(text.to_string());
    }

    if options.len() < MIN_CHOICE_OPTIONS {
        return Err(NormalizeError::TooFewOptions { position });
    }

    Ok((options, flagged))
}

/// Resolves one reference or an array of references into distinct option indices,
/// keeping first-seen order.
fn resolve_references(
    reference: &Value,
    options: &[String],
    position: usize,
) -> Result<Vec<usize>, NormalizeError> {
    let references: Vec<&Value> = match reference {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };

    let mut resolved = Vec::with_capacity(references.len());
    for reference in references {
        let index = resolve_option_ref(reference, options).ok_or_else(|| {
            NormalizeError::UnresolvedAnswer { position, reference: reference_label(reference) }
        })?;
        if !resolved.contains(&index) {
            resolved.push(index);
        }
    }
    Ok(resolved)
}

/// Option text wins over index parsing, so an option literally named "2" is
/// matched as text before "2" is read as an index.
pub(crate) fn resolve_option_ref(reference: &Value, options: &[String]) -> Option<usize> {
    match reference {
        Value::Number(number) => {
            let index = number.as_u64().or_else(|| {
                number.as_f64().filter(|value| value.fract() == 0.0 && *value >= 0.0).map(|value| value as u64)
            })?;
            usize::try_from(index).ok().filter(|index| *index < options.len())
        }
        Value::String(text) => {
            let text = text.trim();
            options.iter().position(|option| option == text).or_else(|| {
                text.parse::<usize>().ok().filter(|index| *index < options.len())
            })
        }
        _ => None,
    }
}

/// Accepts JSON numbers and numeric strings; rejects anything non-finite.
pub(crate) fn number_from(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn first_str<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| object.get(*key).and_then(Value::as_str))
}

fn first_present<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| object.get(*key).filter(|value| !value.is_null()))
}

fn reference_label(reference: &Value) -> String {
    match reference {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn single(raw: Value) -> Result<Question, NormalizeError> {
        normalize_questions(&json!([raw]), 50).map(|mut questions| questions.remove(0))
    }

    #[test]
    fn legacy_aliases_map_to_canonical_types() {
        for (alias, expected) in [
            ("mcq-single", QuestionType::Mcq),
            ("Single_Choice", QuestionType::Mcq),
            ("mcq-multiple", QuestionType::MultipleChoice),
            ("multiple-choice", QuestionType::MultipleChoice),
            ("numeric", QuestionType::Numerical),
            ("number", QuestionType::Numerical),
            ("long-answer", QuestionType::LongAnswer),
            ("essay", QuestionType::LongAnswer),
        ] {
            assert_eq!(parse_question_type(alias), Some(expected), "alias {alias}");
        }
        assert_eq!(parse_question_type("matching"), None);
    }

    #[test]
    fn mcq_index_reference_resolves_to_option_text() {
        let question = single(json!({
            "question_type": "mcq-single",
            "question": "Capital of France?",
            "options": [" Berlin ", "Paris", "Rome"],
            "correct_answer": 1
        }))
        .unwrap();

        assert_eq!(question.prompt, "Capital of France?");
        assert_eq!(question.points, 1.0);
        assert_eq!(
            question.kind,
            QuestionKind::Mcq {
                options: vec!["Berlin".into(), "Paris".into(), "Rome".into()],
                correct_option: "Paris".into(),
            }
        );
    }

    #[test]
    fn integer_string_prefers_matching_option_text() {
        let question = single(json!({
            "type": "mcq",
            "prompt": "1 + 1",
            "options": ["1", "2", "3"],
            "correct_option": "2"
        }))
        .unwrap();
        assert!(matches!(question.kind, QuestionKind::Mcq { ref correct_option, .. } if correct_option == "2"));

        let question = single(json!({
            "type": "mcq",
            "prompt": "Pick the second",
            "options": ["a", "b", "c"],
            "correct_option": "1"
        }))
        .unwrap();
        assert!(matches!(question.kind, QuestionKind::Mcq { ref correct_option, .. } if correct_option == "b"));
    }

    #[test]
    fn object_options_carry_correct_flags() {
        let question = single(json!({
            "type": "mcq-multiple",
            "prompt": "Primes",
            "points": 3,
            "options": [
                {"text": "2", "is_correct": true},
                {"label": "4"},
                {"text": "5", "correct": true}
            ]
        }))
        .unwrap();

        assert_eq!(question.points, 3.0);
        assert_eq!(
            question.kind,
            QuestionKind::MultipleChoice {
                options: vec!["2".into(), "4".into(), "5".into()],
                correct_options: vec!["2".into(), "5".into()],
            }
        );
    }

    #[test]
    fn multiple_choice_references_are_deduplicated() {
        let question = single(json!({
            "type": "multiple",
            "prompt": "Vowels",
            "options": ["a", "b", "e"],
            "answers": [0, "a", "e"]
        }))
        .unwrap();

        assert!(matches!(
            question.kind,
            QuestionKind::MultipleChoice { ref correct_options, .. }
                if correct_options == &vec!["a".to_string(), "e".to_string()]
        ));
    }

    #[test]
    fn mcq_with_two_flagged_options_is_ambiguous() {
        let err = single(json!({
            "type": "mcq",
            "prompt": "?",
            "options": [{"text": "x", "is_correct": true}, {"text": "y", "is_correct": true}]
        }))
        .unwrap_err();
        assert_eq!(err, NormalizeError::AmbiguousCorrectAnswer { position: 1 });
    }

    #[test]
    fn option_errors_are_reported() {
        let duplicate = single(json!({
            "type": "mcq", "prompt": "?", "options": ["x", " x"], "correct_option": 0
        }));
        assert_eq!(
            duplicate.unwrap_err(),
            NormalizeError::DuplicateOption { position: 1, text: "x".into() }
        );

        let too_few = single(json!({
            "type": "mcq", "prompt": "?", "options": ["only"], "correct_option": 0
        }));
        assert_eq!(too_few.unwrap_err(), NormalizeError::TooFewOptions { position: 1 });

        let out_of_range = single(json!({
            "type": "mcq", "prompt": "?", "options": ["x", "y"], "correct_option": 5
        }));
        assert_eq!(
            out_of_range.unwrap_err(),
            NormalizeError::UnresolvedAnswer { position: 1, reference: "5".into() }
        );
    }

    #[test]
    fn numerical_accepts_numeric_strings() {
        let question = single(json!({
            "type": "numeric",
            "prompt": "pi",
            "answer": "3.14",
            "tolerance": 0.01
        }))
        .unwrap();
        assert_eq!(question.kind, QuestionKind::Numerical { correct_value: 3.14, tolerance: 0.01 });

        let negative = single(json!({
            "type": "numerical", "prompt": "x", "correct_value": 1, "tolerance": -1
        }));
        assert_eq!(negative.unwrap_err(), NormalizeError::NegativeTolerance { position: 1 });
    }

    #[test]
    fn points_must_be_positive() {
        let err = single(json!({"type": "essay", "prompt": "Discuss", "points": 0})).unwrap_err();
        assert_eq!(err, NormalizeError::InvalidPoints { position: 1 });
    }

    #[test]
    fn ids_are_kept_or_generated_and_must_be_unique() {
        let questions = normalize_questions(
            &json!([
                {"id": "intro", "type": "long_answer", "prompt": "Introduce yourself"},
                {"type": "text", "prompt": "Anything else?", "sample_answer": "  "}
            ]),
            10,
        )
        .unwrap();
        assert_eq!(questions[0].id, "intro");
        assert!(Uuid::parse_str(&questions[1].id).is_ok());
        assert_eq!(questions[1].kind, QuestionKind::LongAnswer { sample_answer: None });

        let err = normalize_questions(
            &json!([
                {"id": "q", "type": "essay", "prompt": "a"},
                {"id": "q", "type": "essay", "prompt": "b"}
            ]),
            10,
        )
        .unwrap_err();
        assert_eq!(err, NormalizeError::DuplicateId { id: "q".into() });
    }

    #[test]
    fn question_count_is_bounded() {
        assert_eq!(normalize_questions(&json!([]), 10).unwrap_err(), NormalizeError::NoQuestions);
        let raw = json!([
            {"type": "essay", "prompt": "a"},
            {"type": "essay", "prompt": "b"}
        ]);
        assert_eq!(
            normalize_questions(&raw, 1).unwrap_err(),
            NormalizeError::TooManyQuestions { max: 1 }
        );
    }

    #[test]
    fn total_points_sums_questions() {
        let questions = normalize_questions(
            &json!([
                {"type": "essay", "prompt": "a", "points": 2.5},
                {"type": "essay", "prompt": "b"}
            ]),
            10,
        )
        .unwrap();
        assert_eq!(total_points(&questions), 3.5);
    }
}
