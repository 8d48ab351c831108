// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::{Validate, ValidationError};

/// Question type tags as stored in the `questions.type` column.
///
/// `Unknown` absorbs any tag this build does not recognize; such questions
/// still load and always grade as incorrect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType {
    Single,
    Multiple,
    Image,
    Dragdrop,
    Unknown,
}

impl QuestionType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "single" => QuestionType::Single,
            "multiple" => QuestionType::Multiple,
            "image" => QuestionType::Image,
            "dragdrop" => QuestionType::Dragdrop,
            _ => QuestionType::Unknown,
        }
    }

    pub fn is_known(tag: &str) -> bool {
        !matches!(Self::from_tag(tag), QuestionType::Unknown)
    }
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,

    /// The course this quiz belongs to. Course CRUD lives in another service.
    pub course_id: i64,

    pub lesson_id: Option<i64>,

    pub title: String,

    pub description: Option<String>,

    /// Time limit in seconds; 0 means untimed.
    pub time_limit_secs: i32,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub quiz_id: i64,

    /// Order of the question within its quiz.
    pub position: i32,

    /// Type tag: 'single', 'multiple', 'image' or 'dragdrop'.
    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    pub question_type: String,

    /// The prompt text of the question.
    pub content: String,

    /// List of options. For 'image' questions these are image URLs.
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// The correct-answer set. Exactly one element for single/image, an
    /// unordered subset of options for multiple, and an ordered list (one
    /// entry per slot) for dragdrop.
    pub answer: Json<Vec<String>>,

    /// Number of drop slots for 'dragdrop' questions; NULL otherwise.
    pub slot_count: Option<i32>,

    /// Explanation of the correct answer, shown during review.
    pub analysis: Option<String>,
}

impl Question {
    pub fn kind(&self) -> QuestionType {
        QuestionType::from_tag(&self.question_type)
    }
}

/// DTO for sending a question to a quiz taker (excludes answer and analysis).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub content: String,
    pub options: Json<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_count: Option<i32>,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        PublicQuestion {
            id: q.id,
            question_type: q.question_type,
            content: q.content,
            options: q.options,
            slot_count: q.slot_count,
        }
    }
}

/// A quiz with its ordered question list, as served to a taker.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuiz {
    pub id: i64,
    pub course_id: i64,
    pub lesson_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub time_limit_secs: i32,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    pub course_id: i64,
    pub lesson_id: Option<i64>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub time_limit_secs: Option<i32>,
}

/// DTO for updating a quiz. Fields are optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuizRequest {
    pub course_id: Option<i64>,
    pub lesson_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_limit_secs: Option<i32>,
}

/// DTO for creating a new question inside a quiz.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_question_rules))]
pub struct CreateQuestionRequest {
    #[serde(rename = "type")]
    pub question_type: String,
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    pub answer: Vec<String>,
    pub slot_count: Option<i32>,
    #[validate(length(max = 2000))]
    pub analysis: Option<String>,
    pub position: Option<i32>,
}

/// DTO for updating a question. Fields are optional; the per-type answer
/// invariants are re-checked in the handler against the merged row.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    #[serde(rename = "type")]
    pub question_type: Option<String>,
    pub content: Option<String>,
    pub options: Option<Vec<String>>,
    pub answer: Option<Vec<String>>,
    pub slot_count: Option<i32>,
    pub analysis: Option<String>,
    pub position: Option<i32>,
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.is_empty() {
        return Err(ValidationError::new("options_cannot_be_empty"));
    }
    for opt in options {
        if opt.len() > 1000 {
            return Err(ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

fn validate_question_rules(req: &CreateQuestionRequest) -> Result<(), ValidationError> {
    check_answer_invariants(&req.question_type, &req.options, &req.answer, req.slot_count)
}

/// Per-type invariants on the correct-answer set:
/// single/image carry exactly one answer, multiple a non-empty subset of the
/// options, and dragdrop an ordered list whose length equals the slot count.
pub fn check_answer_invariants(
    question_type: &str,
    options: &[String],
    answer: &[String],
    slot_count: Option<i32>,
) -> Result<(), ValidationError> {
    match QuestionType::from_tag(question_type) {
        QuestionType::Single | QuestionType::Image => {
            if answer.len() != 1 {
                return Err(ValidationError::new("single_answer_required"));
            }
            if !options.contains(&answer[0]) {
                return Err(ValidationError::new("answer_must_be_an_option"));
            }
        }
        QuestionType::Multiple => {
            if answer.is_empty() {
                return Err(ValidationError::new("answer_set_cannot_be_empty"));
            }
            if answer.iter().any(|a| !options.contains(a)) {
                return Err(ValidationError::new("answer_must_be_subset_of_options"));
            }
        }
        QuestionType::Dragdrop => {
            let slots = slot_count.ok_or(ValidationError::new("slot_count_required"))?;
            if slots <= 0 {
                return Err(ValidationError::new("slot_count_must_be_positive"));
            }
            if answer.len() != slots as usize {
                return Err(ValidationError::new("answer_length_must_match_slot_count"));
            }
        }
        QuestionType::Unknown => {
            return Err(ValidationError::new("unknown_question_type"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn single_requires_exactly_one_answer() {
        let options = opts(&["A", "B", "C", "D"]);
        assert!(check_answer_invariants("single", &options, &opts(&["B"]), None).is_ok());
        assert!(check_answer_invariants("single", &options, &[], None).is_err());
        assert!(check_answer_invariants("single", &options, &opts(&["A", "B"]), None).is_err());
        // The answer must be one of the options.
        assert!(check_answer_invariants("single", &options, &opts(&["E"]), None).is_err());
    }

    #[test]
    fn image_follows_single_rules() {
        let options = opts(&["https://img/a.png", "https://img/b.png"]);
        assert!(
            check_answer_invariants("image", &options, &opts(&["https://img/a.png"]), None)
                .is_ok()
        );
        assert!(check_answer_invariants("image", &options, &[], None).is_err());
    }

    #[test]
    fn multiple_requires_non_empty_subset() {
        let options = opts(&["A", "B", "C", "D"]);
        assert!(check_answer_invariants("multiple", &options, &opts(&["A", "C"]), None).is_ok());
        assert!(check_answer_invariants("multiple", &options, &[], None).is_err());
        assert!(check_answer_invariants("multiple", &options, &opts(&["A", "E"]), None).is_err());
    }

    #[test]
    fn dragdrop_answer_length_matches_slots() {
        let options = opts(&["X", "Y", "Z"]);
        let answer = opts(&["X", "Y", "Z"]);
        assert!(check_answer_invariants("dragdrop", &options, &answer, Some(3)).is_ok());
        assert!(check_answer_invariants("dragdrop", &options, &answer, Some(2)).is_err());
        assert!(check_answer_invariants("dragdrop", &options, &answer, None).is_err());
        assert!(check_answer_invariants("dragdrop", &options, &answer, Some(0)).is_err());
    }

    #[test]
    fn unknown_type_rejected_at_authoring_time() {
        assert!(check_answer_invariants("essay", &opts(&["x"]), &opts(&["x"]), None).is_err());
    }

    #[test]
    fn tag_parsing() {
        assert_eq!(QuestionType::from_tag("single"), QuestionType::Single);
        assert_eq!(QuestionType::from_tag("dragdrop"), QuestionType::Dragdrop);
        assert_eq!(QuestionType::from_tag("essay"), QuestionType::Unknown);
        assert!(QuestionType::is_known("multiple"));
        assert!(!QuestionType::is_known("truefalse"));
    }
}
