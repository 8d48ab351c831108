// src/handlers/quiz.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    grading,
    models::{
        quiz::{PublicQuestion, PublicQuiz, Question, Quiz},
        submission::{
            AnswerBreakdown, QuizResult, StoredAnswer, SubmitQuizRequest, Submission,
            SubmissionResult,
        },
    },
    utils::jwt::Claims,
};

/// Query parameters for listing quizzes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub course_id: Option<i64>,
}

async fn fetch_quiz(pool: &PgPool, id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, course_id, lesson_id, title, description, time_limit_secs, created_at
        FROM quizzes
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

async fn fetch_questions(pool: &PgPool, quiz_id: i64) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, quiz_id, position, type, content, options, answer, slot_count, analysis
        FROM questions
        WHERE quiz_id = $1
        ORDER BY position, id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

/// Lists quizzes, optionally filtered by course.
pub async fn list_quizzes(
    State(pool): State<PgPool>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, course_id, lesson_id, title, description, time_limit_secs, created_at
        FROM quizzes
        WHERE ($1::BIGINT IS NULL OR course_id = $1)
        ORDER BY id
        "#,
    )
    .bind(params.course_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(quizzes))
}

/// Retrieves a quiz with its ordered question list for taking.
/// Correct answers and explanations are stripped by the DTO projection.
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;
    let questions = fetch_questions(&pool, id).await?;

    Ok(Json(PublicQuiz {
        id: quiz.id,
        course_id: quiz.course_id,
        lesson_id: quiz.lesson_id,
        title: quiz.title,
        description: quiz.description,
        time_limit_secs: quiz.time_limit_secs,
        questions: questions.into_iter().map(PublicQuestion::from).collect(),
    }))
}

/// Submits a user's quiz answers, grades them and records the attempt.
///
/// * Grading iterates the quiz's question list: missing answers grade as
///   unanswered, stray answer entries for unknown question ids are ignored.
/// * The ledger keeps one row per (quiz, user). The upsert overwrites the
///   latest answers/score and raises `highest_score` to the running maximum
///   in a single statement, so concurrent resubmissions cannot lose the
///   watermark to a stale read.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let quiz = fetch_quiz(&pool, quiz_id).await?;
    let questions = fetch_questions(&pool, quiz_id).await?;

    let submitted: HashMap<i64, Value> = req
        .answers
        .into_iter()
        .map(|a| (a.question_id, a.answer))
        .collect();

    let graded = grading::grade_quiz(&questions, &submitted);
    let summary = grading::aggregate(&graded);

    let stored: Vec<StoredAnswer> = graded
        .iter()
        .map(|g| StoredAnswer {
            question_id: g.question_id,
            answer: g.selected.clone(),
        })
        .collect();

    let submission = sqlx::query_as::<_, Submission>(
        r#"
        INSERT INTO submissions (quiz_id, user_id, answers, score, highest_score, duration_secs)
        VALUES ($1, $2, $3, $4, $4, $5)
        ON CONFLICT (quiz_id, user_id) DO UPDATE SET
            answers = EXCLUDED.answers,
            score = EXCLUDED.score,
            highest_score = CASE WHEN EXCLUDED.score > submissions.highest_score
                                 THEN EXCLUDED.score ELSE submissions.highest_score END,
            duration_secs = EXCLUDED.duration_secs,
            submitted_at = CURRENT_TIMESTAMP
        RETURNING id, quiz_id, user_id, answers, score, highest_score, duration_secs, submitted_at
        "#,
    )
    .bind(quiz_id)
    .bind(claims.user_id())
    .bind(sqlx::types::Json(&stored))
    .bind(summary.score)
    .bind(req.duration)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert submission: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(
        "user {} scored {}/{} ({:.0}%) on quiz '{}'",
        submission.user_id,
        summary.score,
        summary.total,
        summary.percent(),
        quiz.title
    );

    let answers: Vec<AnswerBreakdown> = graded
        .into_iter()
        .map(|g| AnswerBreakdown {
            question: g.prompt,
            correct_answer: g.correct_answer,
            selected_option: g.selected,
            correct: g.correct,
            explanation: g.explanation,
        })
        .collect();

    let quiz_result = QuizResult {
        answers,
        score: summary.score,
        correct_count: summary.correct_count,
        total: summary.total,
        highest_score: submission.highest_score,
        message: format!("You scored {}/{}", summary.score, summary.total),
    };

    Ok(Json(SubmissionResult {
        quiz_result,
        latest_submission: submission,
    }))
}

/// Retrieves the caller's submission history for a quiz, newest first.
/// Under the single-row ledger this returns at most one entry.
pub async fn get_history(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, Submission>(
        r#"
        SELECT id, quiz_id, user_id, answers, score, highest_score, duration_secs, submitted_at
        FROM submissions
        WHERE quiz_id = $1 AND user_id = $2
        ORDER BY submitted_at DESC
        "#,
    )
    .bind(quiz_id)
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}
