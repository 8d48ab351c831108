// src/models/submission.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Represents the 'submissions' table in the database.
///
/// One row per (quiz, user) pair. Re-attempts overwrite the row in place;
/// `highest_score` is the watermark retained across attempts.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: i64,

    /// One entry per quiz question, holding the normalized submitted value.
    pub answers: Json<Vec<StoredAnswer>>,

    /// Correct count of the latest attempt.
    pub score: i32,

    /// Best score ever achieved on this quiz by this user.
    pub highest_score: i32,

    #[serde(rename = "duration")]
    pub duration_secs: i32,

    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A (questionId, submittedAnswer) pair as persisted in the ledger row.
/// The value shape depends on the question type: a string for single/image,
/// an array of strings for multiple, an array with nulls for dragdrop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAnswer {
    pub question_id: i64,
    pub answer: Value,
}

/// One submitted answer as sent by the client.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerInput {
    pub question_id: i64,
    /// Raw value; its shape is resolved against the quiz definition, never
    /// trusted from the payload.
    #[serde(default)]
    pub answer: Value,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    #[serde(default)]
    pub answers: Vec<AnswerInput>,

    /// Seconds the taker spent on the attempt.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub duration: i32,
}

/// Per-question review line in the grading response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerBreakdown {
    /// The question prompt.
    pub question: String,
    pub correct_answer: Value,
    pub selected_option: Value,
    pub correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Summary of one graded attempt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub answers: Vec<AnswerBreakdown>,
    pub score: i32,
    pub correct_count: i32,
    pub total: i32,
    pub highest_score: i32,
    pub message: String,
}

/// Full response of a submit call: the graded breakdown plus the ledger row
/// as it stands after the write.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub quiz_result: QuizResult,
    pub latest_submission: Submission,
}
