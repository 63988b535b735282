use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::time::parse_deadline;
use crate::schemas::assignment::AssignmentPayload;

use super::types::{
    AnswerEntry, AssignmentDraft, OptionDraft, OptionLabel, QuestionDraft, DEFAULT_MARKS,
    QUESTION_COUNT,
};

/// Authoring rejections. Question numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ValidationError {
    #[error("course_id, title, deadline and questions are required")]
    MissingFields,
    #[error("deadline is not a valid timestamp")]
    InvalidDeadline,
    #[error("exactly 5 questions are required")]
    InvalidQuestions,
    #[error("question {0} needs text, a position in 1..5 and exactly 4 options")]
    InvalidQuestion(usize),
    #[error("question {0} has an option without a label or text")]
    InvalidOption(usize),
    #[error("question {0} has an option label outside A-D")]
    InvalidOptionLabel(usize),
    #[error("question {0} repeats an option label")]
    DuplicateOptionLabel(usize),
    #[error("question {0} must mark exactly one option as correct")]
    InvalidCorrectOption(usize),
    #[error("question {0} has marks that are not a finite number >= 0")]
    InvalidMarks(usize),
}

impl ValidationError {
    pub(crate) fn code(&self) -> &'static str {
        match self {
            Self::MissingFields => "missing_fields",
            Self::InvalidDeadline => "invalid_deadline",
            Self::InvalidQuestions => "invalid_questions",
            Self::InvalidQuestion(_) => "invalid_question",
            Self::InvalidOption(_) => "invalid_option",
            Self::InvalidOptionLabel(_) => "invalid_option_label",
            Self::DuplicateOptionLabel(_) => "duplicate_option_label",
            Self::InvalidCorrectOption(_) => "invalid_correct_option",
            Self::InvalidMarks(_) => "invalid_marks",
        }
    }
}

pub(crate) fn parse_assignment(
    payload: &AssignmentPayload,
) -> Result<AssignmentDraft, ValidationError> {
    let course_id = payload.course_id.as_ref().and_then(course_id_text);
    let title = payload.title.as_deref().map(str::trim).filter(|title| !title.is_empty());
    let deadline = payload.deadline.as_deref().map(str::trim).filter(|value| !value.is_empty());
    let questions = payload.questions.as_ref().and_then(Value::as_array);

    let (Some(course_id), Some(title), Some(deadline), Some(questions)) =
        (course_id, title, deadline, questions)
    else {
        return Err(ValidationError::MissingFields);
    };

    let deadline = parse_deadline(deadline).ok_or(ValidationError::InvalidDeadline)?;

    if questions.len() != QUESTION_COUNT {
        return Err(ValidationError::InvalidQuestions);
    }

    let mut drafts = Vec::with_capacity(QUESTION_COUNT);
    let mut positions = HashSet::new();
    for (index, raw) in questions.iter().enumerate() {
        let number = index + 1;
        let question = parse_question(raw, number)?;
        if !positions.insert(question.position) {
            return Err(ValidationError::InvalidQuestion(number));
        }
        drafts.push(question);
    }
    drafts.sort_by_key(|question| question.position);

    Ok(AssignmentDraft {
        course_id,
        title: title.to_string(),
        description: payload.description.clone().unwrap_or_default(),
        deadline,
        questions: drafts,
    })
}

fn parse_question(raw: &Value, number: usize) -> Result<QuestionDraft, ValidationError> {
    let invalid = ValidationError::InvalidQuestion(number);
    let object = raw.as_object().ok_or(invalid.clone())?;

    let question_text = object
        .get("question_text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or(invalid.clone())?;
    let raw_options = object
        .get("options")
        .and_then(Value::as_array)
        .filter(|options| options.len() == OptionLabel::ALL.len())
        .ok_or(invalid.clone())?;

    let marks = parse_marks(object).ok_or(ValidationError::InvalidMarks(number))?;

    let mut seen = HashSet::new();
    let mut options = Vec::with_capacity(raw_options.len());
    for raw_option in raw_options {
        let option = raw_option.as_object().ok_or(ValidationError::InvalidOption(number))?;
        let label = option.get("label").and_then(Value::as_str);
        let text = option.get("text").and_then(Value::as_str).map(str::trim);
        let (Some(label), Some(text)) = (label, text.filter(|text| !text.is_empty())) else {
            return Err(ValidationError::InvalidOption(number));
        };

        let label = OptionLabel::parse(label).ok_or(ValidationError::InvalidOptionLabel(number))?;
        if !seen.insert(label) {
            return Err(ValidationError::DuplicateOptionLabel(number));
        }

        options.push(OptionDraft {
            label,
            text: text.to_string(),
            is_correct: option.get("is_correct").map(truthy).unwrap_or(false),
        });
    }

    if options.iter().filter(|option| option.is_correct).count() != 1 {
        return Err(ValidationError::InvalidCorrectOption(number));
    }
    options.sort_by_key(|option| option.label);

    let position = match object.get("position") {
        None | Some(Value::Null) => number as i32,
        Some(value) => value
            .as_i64()
            .filter(|position| (1..=QUESTION_COUNT as i64).contains(position))
            .map(|position| position as i32)
            .ok_or(invalid)?,
    };

    Ok(QuestionDraft { position, question_text: question_text.to_string(), marks, options })
}

/// `marks`, falling back to the legacy `points` key, then to the default.
fn parse_marks(question: &Map<String, Value>) -> Option<f64> {
    let raw = match question.get("marks") {
        None | Some(Value::Null) => question.get("points"),
        present => present,
    };

    let value = match raw {
        None | Some(Value::Null) => return Some(DEFAULT_MARKS),
        Some(Value::Number(number)) => number.as_f64()?,
        Some(Value::String(text)) => text.trim().parse::<f64>().ok()?,
        Some(_) => return None,
    };

    (value.is_finite() && value >= 0.0).then_some(value)
}

fn course_id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()).filter(|text| !text.is_empty()),
        Value::Number(number) if number.as_f64() != Some(0.0) => Some(number.to_string()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => matches!(text.trim(), "true" | "1"),
        _ => false,
    }
}

/// Parses the `answers` array of an autosave/submit body. Malformed entries are
/// dropped and counted instead of failing the whole batch; a missing or
/// non-array value is an empty batch.
pub(crate) fn parse_answer_entries(value: Option<&Value>) -> (Vec<AnswerEntry>, usize) {
    let Some(items) = value.and_then(Value::as_array) else {
        return (Vec::new(), 0);
    };

    let mut entries = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for item in items {
        match parse_answer_entry(item) {
            Some(entry) => entries.push(entry),
            None => skipped += 1,
        }
    }

    (entries, skipped)
}

fn parse_answer_entry(item: &Value) -> Option<AnswerEntry> {
    let object = item.as_object()?;

    let question_id = match object.get("question_id")? {
        Value::Number(number) => number.as_i64()?,
        Value::String(text) => text.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    if question_id <= 0 {
        return None;
    }

    let selected = match object.get("selected") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(Value::String(text)) => Some(OptionLabel::parse(text)?),
        Some(_) => return None,
    };

    Some(AnswerEntry { question_id, selected })
}

/// Drops entries that point at questions outside the assignment and returns how
/// many were dropped.
pub(crate) fn retain_known_questions(
    entries: &[AnswerEntry],
    known: &HashSet<i64>,
) -> (Vec<AnswerEntry>, usize) {
    let kept: Vec<AnswerEntry> =
        entries.iter().copied().filter(|entry| known.contains(&entry.question_id)).collect();
    let dropped = entries.len() - kept.len();
    (kept, dropped)
}
