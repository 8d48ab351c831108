// tests/api_tests.rs

use elearn_backend::{config::Config, routes, state::AppState, utils::hash::hash_password};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Helper to spawn the app on a random port for testing.
/// Returns the base URL and a pool for seeding, or None when no test
/// database is configured (the tests then skip).
async fn spawn_app() -> Option<(String, PgPool)> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("skipping: DATABASE_URL not set");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some((address, pool))
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

/// Registers and logs in a fresh user, returning (user_id, token).
async fn register_and_login(address: &str, client: &reqwest::Client) -> (i64, String) {
    let username = unique_name("u");
    let password = "password123";

    let register_resp = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(register_resp.status().as_u16(), 201);
    let user: serde_json::Value = register_resp.json().await.unwrap();
    let user_id = user["id"].as_i64().expect("User id missing");

    let login_resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    let token = login_resp["token"].as_str().expect("Token not found");
    (user_id, token.to_string())
}

/// Seeds an admin user directly and logs in, returning the token.
async fn admin_token(address: &str, client: &reqwest::Client, pool: &PgPool) -> String {
    let username = unique_name("admin");
    let password = "password123";
    let hashed = hash_password(password).unwrap();

    sqlx::query("INSERT INTO users (username, password, role) VALUES ($1, $2, 'admin')")
        .bind(&username)
        .bind(&hashed)
        .execute(pool)
        .await
        .unwrap();

    let login_resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Admin login failed")
        .json::<serde_json::Value>()
        .await
        .unwrap();

    login_resp["token"].as_str().expect("Token not found").to_string()
}

/// Seeds a two-question quiz (Q1 single 'B', Q2 multiple {A,D}) through the
/// pool and returns its id.
async fn seed_two_question_quiz(pool: &PgPool) -> i64 {
    let quiz_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO quizzes (course_id, title, description, time_limit_secs)
        VALUES (1, 'Chapter check', 'Two quick questions', 300)
        RETURNING id
        "#,
    )
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query(
        r#"
        INSERT INTO questions (quiz_id, position, type, content, options, answer, analysis)
        VALUES ($1, 0, 'single', 'Pick B', $2, $3, 'B is correct')
        "#,
    )
    .bind(quiz_id)
    .bind(serde_json::json!(["A", "B", "C", "D"]))
    .bind(serde_json::json!(["B"]))
    .execute(pool)
    .await
    .unwrap();

    sqlx::query(
        r#"
        INSERT INTO questions (quiz_id, position, type, content, options, answer)
        VALUES ($1, 1, 'multiple', 'Pick A and D', $2, $3)
        "#,
    )
    .bind(quiz_id)
    .bind(serde_json::json!(["A", "B", "C", "D"]))
    .bind(serde_json::json!(["A", "D"]))
    .execute(pool)
    .await
    .unwrap();

    quiz_id
}

#[tokio::test]
async fn health_check_404() {
    let Some((address, _pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_fails_validation() {
    let Some((address, _pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    // Username too short
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": "yo",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn public_quiz_hides_answers() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let quiz_id = seed_two_question_quiz(&pool).await;

    let quiz: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .send()
        .await
        .expect("Fetch quiz failed")
        .json()
        .await
        .unwrap();

    let questions = quiz["questions"].as_array().expect("questions missing");
    assert_eq!(questions.len(), 2);
    for q in questions {
        assert!(q.get("answer").is_none(), "answer leaked: {}", q);
        assert!(q.get("analysis").is_none(), "analysis leaked: {}", q);
        assert!(q.get("options").is_some());
    }
}

#[tokio::test]
async fn submit_requires_auth() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let quiz_id = seed_two_question_quiz(&pool).await;

    let response = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .json(&serde_json::json!({ "answers": [], "duration": 1 }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn submit_to_missing_quiz_returns_404() {
    let Some((address, _pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let (_user_id, token) = register_and_login(&address, &client).await;

    let response = client
        .post(format!("{}/api/quizzes/{}/submit", address, i64::MAX))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "answers": [], "duration": 1 }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn submit_grades_and_keeps_watermark() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let quiz_id = seed_two_question_quiz(&pool).await;
    let (user_id, token) = register_and_login(&address, &client).await;

    // First attempt: everything right.
    let result: serde_json::Value = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "answers": [
                { "questionId": quiz_question_id(&pool, quiz_id, 0).await, "answer": "B" },
                { "questionId": quiz_question_id(&pool, quiz_id, 1).await, "answer": ["A", "D"] }
            ],
            "duration": 42
        }))
        .send()
        .await
        .expect("Submit failed")
        .json()
        .await
        .unwrap();

    let quiz_result = &result["quizResult"];
    assert_eq!(quiz_result["correctCount"], 2);
    assert_eq!(quiz_result["total"], 2);
    assert_eq!(quiz_result["score"], 2);
    assert_eq!(quiz_result["highestScore"], 2);
    assert_eq!(quiz_result["message"], "You scored 2/2");

    let breakdown = quiz_result["answers"].as_array().unwrap();
    assert_eq!(breakdown.len(), 2);
    assert_eq!(breakdown[0]["correct"], true);
    assert_eq!(breakdown[0]["explanation"], "B is correct");

    let latest = &result["latestSubmission"];
    assert_eq!(latest["userId"], user_id);
    assert_eq!(latest["quizId"], quiz_id);
    assert_eq!(latest["duration"], 42);

    // Second attempt: everything wrong, watermark must not drop.
    let result: serde_json::Value = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "answers": [
                { "questionId": quiz_question_id(&pool, quiz_id, 0).await, "answer": "A" },
                { "questionId": quiz_question_id(&pool, quiz_id, 1).await, "answer": ["A"] }
            ],
            "duration": 17
        }))
        .send()
        .await
        .expect("Submit failed")
        .json()
        .await
        .unwrap();

    assert_eq!(result["quizResult"]["correctCount"], 0);
    assert_eq!(result["quizResult"]["highestScore"], 2);
    assert_eq!(result["latestSubmission"]["score"], 0);
    assert_eq!(result["latestSubmission"]["highestScore"], 2);

    // The ledger holds a single row per (quiz, user).
    let history: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}/history", address, quiz_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("History failed")
        .json()
        .await
        .unwrap();

    let rows = history.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["highestScore"], 2);
    assert_eq!(rows[0]["score"], 0);
}

#[tokio::test]
async fn missing_answers_grade_as_wrong() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let quiz_id = seed_two_question_quiz(&pool).await;
    let (_user_id, token) = register_and_login(&address, &client).await;

    // Empty submission: graded against the full question list.
    let result: serde_json::Value = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "answers": [], "duration": 0 }))
        .send()
        .await
        .expect("Submit failed")
        .json()
        .await
        .unwrap();

    assert_eq!(result["quizResult"]["total"], 2);
    assert_eq!(result["quizResult"]["correctCount"], 0);
    assert_eq!(result["quizResult"]["message"], "You scored 0/2");
}

#[tokio::test]
async fn admin_routes_reject_plain_users() {
    let Some((address, _pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let (_user_id, token) = register_and_login(&address, &client).await;

    let response = client
        .post(format!("{}/api/admin/quizzes", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "courseId": 1, "title": "Nope" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn admin_authoring_flow() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let token = admin_token(&address, &client, &pool).await;

    // Create a quiz.
    let created: serde_json::Value = client
        .post(format!("{}/api/admin/quizzes", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "courseId": 7,
            "title": "Dragdrop drill",
            "timeLimitSecs": 120
        }))
        .send()
        .await
        .expect("Create quiz failed")
        .json()
        .await
        .unwrap();
    let quiz_id = created["id"].as_i64().unwrap();

    // A dragdrop question whose answer length does not match slotCount is rejected.
    let bad = client
        .post(format!("{}/api/admin/quizzes/{}/questions", address, quiz_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "type": "dragdrop",
            "content": "Order the steps",
            "options": ["X", "Y", "Z"],
            "answer": ["X", "Y", "Z"],
            "slotCount": 2
        }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(bad.status().as_u16(), 400);

    // A valid one is accepted.
    let good = client
        .post(format!("{}/api/admin/quizzes/{}/questions", address, quiz_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "type": "dragdrop",
            "content": "Order the steps",
            "options": ["X", "Y", "Z"],
            "answer": ["X", "Y", "Z"],
            "slotCount": 3
        }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(good.status().as_u16(), 201);

    // The quiz now serves one question.
    let quiz: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .send()
        .await
        .expect("Fetch quiz failed")
        .json()
        .await
        .unwrap();
    assert_eq!(quiz["questions"].as_array().unwrap().len(), 1);
    assert_eq!(quiz["questions"][0]["slotCount"], 3);
}

/// Looks up the id of the question at `position` in a quiz.
async fn quiz_question_id(pool: &PgPool, quiz_id: i64, position: i32) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "SELECT id FROM questions WHERE quiz_id = $1 AND position = $2",
    )
    .bind(quiz_id)
    .bind(position)
    .fetch_one(pool)
    .await
    .unwrap()
}
