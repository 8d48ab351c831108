// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::quiz::{
        CreateQuestionRequest, CreateQuizRequest, Question, UpdateQuestionRequest,
        UpdateQuizRequest, check_answer_invariants,
    },
};

/// Creates a new quiz.
/// Admin only.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO quizzes (course_id, lesson_id, title, description, time_limit_secs)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(payload.course_id)
    .bind(payload.lesson_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.time_limit_secs.unwrap_or(0))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates a quiz by ID.
/// Admin only.
pub async fn update_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.course_id.is_none()
        && payload.lesson_id.is_none()
        && payload.title.is_none()
        && payload.description.is_none()
        && payload.time_limit_secs.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE quizzes SET ");
    let mut separated = builder.separated(", ");

    if let Some(course_id) = payload.course_id {
        separated.push("course_id = ");
        separated.push_bind_unseparated(course_id);
    }

    if let Some(lesson_id) = payload.lesson_id {
        separated.push("lesson_id = ");
        separated.push_bind_unseparated(lesson_id);
    }

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(description);
    }

    if let Some(time_limit_secs) = payload.time_limit_secs {
        separated.push("time_limit_secs = ");
        separated.push_bind_unseparated(time_limit_secs);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a quiz by ID, cascading to its questions and submissions.
/// Admin only.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a new question inside a quiz.
/// Admin only.
pub async fn create_question(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    // Append at the end of the quiz unless a position was given.
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO questions (quiz_id, position, type, content, options, answer, slot_count, analysis)
        VALUES (
            $1,
            COALESCE($2, (SELECT COALESCE(MAX(position) + 1, 0) FROM questions WHERE quiz_id = $1)),
            $3, $4, $5, $6, $7, $8
        )
        RETURNING id
        "#,
    )
    .bind(quiz_id)
    .bind(payload.position)
    .bind(&payload.question_type)
    .bind(&payload.content)
    .bind(sqlx::types::Json(&payload.options))
    .bind(sqlx::types::Json(&payload.answer))
    .bind(payload.slot_count)
    .bind(&payload.analysis)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates a question by ID.
/// Admin only. The per-type answer invariants are re-checked against the
/// merged row, so a partial update cannot leave a question ungradable.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let existing = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, quiz_id, position, type, content, options, answer, slot_count, analysis
        FROM questions
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let question_type = payload.question_type.unwrap_or(existing.question_type);
    let content = payload.content.unwrap_or(existing.content);
    let options = payload.options.unwrap_or(existing.options.0);
    let answer = payload.answer.unwrap_or(existing.answer.0);
    let slot_count = payload.slot_count.or(existing.slot_count);
    let analysis = payload.analysis.or(existing.analysis);
    let position = payload.position.unwrap_or(existing.position);

    check_answer_invariants(&question_type, &options, &answer, slot_count)
        .map_err(|e| AppError::BadRequest(e.code.to_string()))?;

    sqlx::query(
        r#"
        UPDATE questions
        SET position = $1, type = $2, content = $3, options = $4,
            answer = $5, slot_count = $6, analysis = $7
        WHERE id = $8
        "#,
    )
    .bind(position)
    .bind(&question_type)
    .bind(&content)
    .bind(sqlx::types::Json(&options))
    .bind(sqlx::types::Json(&answer))
    .bind(slot_count)
    .bind(&analysis)
    .bind(id)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(StatusCode::OK)
}

/// Deletes a question by ID.
/// Admin only.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
