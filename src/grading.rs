// src/grading.rs
//
// The grading core: answer normalization, per-type correctness checks and
// score aggregation. Everything here is synchronous, pure computation over
// in-memory data; persistence happens in the handlers.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::models::quiz::{Question, QuestionType};

/// A submitted answer in canonical, comparable form. The variant is chosen
/// by the question's type from the quiz definition, never by probing the
/// shape of the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedAnswer {
    /// single / image: the selected option, empty string when unanswered.
    Choice(String),
    /// multiple: the selected options; compared as a set.
    Selection(Vec<String>),
    /// dragdrop: one entry per slot, None for unfilled slots.
    Slots(Vec<Option<String>>),
}

impl NormalizedAnswer {
    /// JSON representation for persistence and the review breakdown.
    pub fn to_value(&self) -> Value {
        match self {
            NormalizedAnswer::Choice(s) => Value::String(s.clone()),
            NormalizedAnswer::Selection(items) => {
                Value::Array(items.iter().map(|s| Value::String(s.clone())).collect())
            }
            NormalizedAnswer::Slots(slots) => Value::Array(
                slots
                    .iter()
                    .map(|s| match s {
                        Some(v) => Value::String(v.clone()),
                        None => Value::Null,
                    })
                    .collect(),
            ),
        }
    }
}

/// Maps a raw submitted value into canonical form for the given question.
///
/// Never fails: any malformed or missing value degrades to the "unanswered"
/// form of the question's type, so the question stays gradable (as wrong).
pub fn normalize(question: &Question, raw: Option<&Value>) -> NormalizedAnswer {
    match question.kind() {
        QuestionType::Single | QuestionType::Image | QuestionType::Unknown => {
            let choice = match raw {
                Some(Value::String(s)) => s.clone(),
                _ => String::new(),
            };
            NormalizedAnswer::Choice(choice)
        }
        QuestionType::Multiple => {
            let selection = match raw {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect(),
                _ => Vec::new(),
            };
            NormalizedAnswer::Selection(selection)
        }
        QuestionType::Dragdrop => {
            let slots = question
                .slot_count
                .map(|n| n.max(0) as usize)
                .unwrap_or(question.answer.0.len());
            let mut filled: Vec<Option<String>> = match raw {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|v| v.as_str().map(str::to_owned))
                    .collect(),
                _ => Vec::new(),
            };
            filled.resize(slots, None);
            NormalizedAnswer::Slots(filled)
        }
    }
}

/// Compares a normalized answer against the question's correct-answer set.
///
/// All types are binary: fully correct or incorrect, no partial credit.
/// Unknown question types always grade as incorrect.
pub fn grade(question: &Question, answer: &NormalizedAnswer) -> bool {
    match (question.kind(), answer) {
        (QuestionType::Single | QuestionType::Image, NormalizedAnswer::Choice(choice)) => {
            match question.answer.0.first() {
                Some(correct) => choice == correct,
                None => false,
            }
        }
        (QuestionType::Multiple, NormalizedAnswer::Selection(selection)) => {
            let submitted: HashSet<&str> = selection.iter().map(String::as_str).collect();
            let correct: HashSet<&str> = question.answer.0.iter().map(String::as_str).collect();
            !correct.is_empty() && submitted == correct
        }
        (QuestionType::Dragdrop, NormalizedAnswer::Slots(slots)) => {
            let expected = &question.answer.0;
            if expected.is_empty() || slots.len() != expected.len() {
                return false;
            }
            expected.iter().enumerate().all(|(i, correct)| {
                matches!(&slots[i], Some(value) if value.trim() == correct.trim())
            })
        }
        // Unknown type, or a variant that does not match the question's
        // type (cannot happen for answers produced by `normalize`).
        _ => false,
    }
}

/// One question's grading outcome, carrying the review fields through.
#[derive(Debug, Clone)]
pub struct GradedQuestion {
    pub question_id: i64,
    pub prompt: String,
    pub correct_answer: Value,
    pub selected: Value,
    pub correct: bool,
    pub explanation: Option<String>,
}

/// Grades a full attempt. Iteration is driven by the quiz's question list:
/// questions without a submitted answer grade as unanswered, and submitted
/// entries for unknown question ids are ignored.
pub fn grade_quiz(
    questions: &[Question],
    submitted: &HashMap<i64, Value>,
) -> Vec<GradedQuestion> {
    questions
        .iter()
        .map(|question| {
            let normalized = normalize(question, submitted.get(&question.id));
            let correct = grade(question, &normalized);
            GradedQuestion {
                question_id: question.id,
                prompt: question.content.clone(),
                correct_answer: correct_answer_value(question),
                selected: normalized.to_value(),
                correct,
                explanation: question.analysis.clone(),
            }
        })
        .collect()
}

// single/image expose their sole correct element as a plain string, the
// other types the full list.
fn correct_answer_value(question: &Question) -> Value {
    match question.kind() {
        QuestionType::Single | QuestionType::Image => Value::String(
            question.answer.0.first().cloned().unwrap_or_default(),
        ),
        _ => Value::Array(
            question
                .answer
                .0
                .iter()
                .map(|s| Value::String(s.clone()))
                .collect(),
        ),
    }
}

/// Raw score of one graded attempt. `score` equals `correct_count`;
/// percentage is a presentation concern, see [`ScoreSummary::percent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSummary {
    pub score: i32,
    pub correct_count: i32,
    pub total: i32,
}

impl ScoreSummary {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct_count as f64 / self.total as f64 * 100.0
    }
}

/// Sums correctness over the graded questions.
pub fn aggregate(graded: &[GradedQuestion]) -> ScoreSummary {
    let correct_count = graded.iter().filter(|g| g.correct).count() as i32;
    ScoreSummary {
        score: correct_count,
        correct_count,
        total: graded.len() as i32,
    }
}
