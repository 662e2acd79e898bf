use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use habitarr::config::Config;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // A pooled in-memory sqlite would give each connection its own database.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config.observability.metrics_enabled = false;

    let state = habitarr::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    habitarr::api::router(state).await
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = if let Some(body) = body {
        builder
            .header("Content-Type", mime::APPLICATION_JSON.as_ref())
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn register_user(app: &Router, username: &str) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "secret1",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn create_habit(app: &Router, token: &str, name: &str, target_value: i64) -> i64 {
    let (status, body) = request(
        app,
        "POST",
        "/api/habits",
        Some(token),
        Some(json!({
            "name": name,
            "targetValue": target_value,
            "unit": "glasses",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "create habit failed: {body}");
    body["data"]["id"].as_i64().unwrap()
}

fn today() -> String {
    chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

fn days_from_today(days: i64) -> String {
    (chrono::Utc::now().date_naive() + chrono::Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_register_validation() {
    let app = spawn_app().await;

    // Password without a digit, bad email, short username: every violated
    // field is reported.
    let (status, body) = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "ab", "email": "not-an-email", "password": "letters"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);

    let (status, _) = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "email": "alice@example.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_register_duplicate_username_rejected() {
    let app = spawn_app().await;
    register_user(&app, "alice").await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "email": "other@example.com", "password": "secret1"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username or email already in use");
}

#[tokio::test]
async fn test_login_errors_do_not_leak_which_field_was_wrong() {
    let app = spawn_app().await;
    register_user(&app, "alice").await;

    let (status_a, body_a) = request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"identifier": "alice", "password": "wrong99"})),
    )
    .await;

    let (status_b, body_b) = request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"identifier": "nobody", "password": "secret1"})),
    )
    .await;

    assert_eq!(status_a, StatusCode::BAD_REQUEST);
    assert_eq!(status_b, StatusCode::BAD_REQUEST);
    assert_eq!(body_a["error"], body_b["error"]);
}

#[tokio::test]
async fn test_login_with_email_is_case_insensitive() {
    let app = spawn_app().await;
    register_user(&app, "alice").await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"identifier": "ALICE@Example.COM", "password": "secret1"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["username"], "alice");
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = spawn_app().await;

    let (status, _) = request(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(&app, "GET", "/api/auth/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = register_user(&app, "alice").await;
    let (status, body) = request(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
}

// ============================================================================
// Habits
// ============================================================================

#[tokio::test]
async fn test_habit_crud() {
    let app = spawn_app().await;
    let token = register_user(&app, "alice").await;

    let id = create_habit(&app, &token, "Drink Water", 8).await;

    let (status, body) = request(&app, "GET", &format!("/api/habits/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Drink Water");
    assert_eq!(body["data"]["targetValue"], 8);
    assert_eq!(body["data"]["category"], "general");
    assert_eq!(body["data"]["isActive"], true);

    // Partial update: only the named fields change.
    let (status, body) = request(
        &app,
        "PUT",
        &format!("/api/habits/{id}"),
        Some(&token),
        Some(json!({"category": "health", "targetValue": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["category"], "health");
    assert_eq!(body["data"]["targetValue"], 10);
    assert_eq!(body["data"]["name"], "Drink Water");

    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/habits/{id}/toggle-status"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isActive"], false);

    let (status, _) = request(&app, "DELETE", &format!("/api/habits/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(&app, "GET", &format!("/api/habits/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_habit_validation() {
    let app = spawn_app().await;
    let token = register_user(&app, "alice").await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/habits",
        Some(&token),
        Some(json!({"name": "", "targetValue": 0, "color": "blue"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_habit_bad_id_is_rejected() {
    let app = spawn_app().await;
    let token = register_user(&app, "alice").await;

    let (status, _) = request(&app, "GET", "/api/habits/0", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(&app, "GET", "/api/habits/not-a-number", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_habits_are_scoped_to_their_owner() {
    let app = spawn_app().await;
    let token_a = register_user(&app, "alice").await;
    let token_b = register_user(&app, "bob").await;

    let id = create_habit(&app, &token_a, "Alice Habit", 1).await;

    let (status, _) = request(&app, "GET", &format!("/api/habits/{id}"), Some(&token_b), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = request(&app, "GET", "/api/habits", Some(&token_b), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_habit_stats_with_zero_habits() {
    let app = spawn_app().await;
    let token = register_user(&app, "alice").await;

    let (status, body) = request(&app, "GET", "/api/habits/stats/overview", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalHabits"], 0);
    assert_eq!(body["data"]["activeHabits"], 0);
    assert_eq!(body["data"]["inactiveHabits"], 0);
}

#[tokio::test]
async fn test_habit_stats_category_breakdown() {
    let app = spawn_app().await;
    let token = register_user(&app, "alice").await;

    create_habit(&app, &token, "Water", 8).await;
    let (status, _) = request(
        &app,
        "POST",
        "/api/habits",
        Some(&token),
        Some(json!({"name": "Run", "category": "fitness"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = request(&app, "GET", "/api/habits/stats/overview", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalHabits"], 2);
    assert_eq!(body["data"]["activeHabits"], 2);

    let by_category = body["data"]["byCategory"].as_array().unwrap();
    assert_eq!(by_category.len(), 2);
}

// ============================================================================
// Progress
// ============================================================================

#[tokio::test]
async fn test_progress_upsert_derives_completion() {
    let app = spawn_app().await;
    let token = register_user(&app, "alice").await;
    let habit_id = create_habit(&app, &token, "Drink Water", 8).await;

    // Hitting the target completes the day.
    let (status, body) = request(
        &app,
        "POST",
        "/api/progress",
        Some(&token),
        Some(json!({"habitId": habit_id, "date": today(), "value": 8})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["completed"], true);
    assert!(body["data"]["completedAt"].is_string());
    assert_eq!(body["data"]["habit"]["name"], "Drink Water");

    // Same (habit, date) again takes the update path and re-derives.
    let (status, body) = request(
        &app,
        "POST",
        "/api/progress",
        Some(&token),
        Some(json!({"habitId": habit_id, "date": today(), "value": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed"], false);
    assert!(body["data"]["completedAt"].is_null());

    // Exactly one record for the triple, holding the second value.
    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/progress?date={}", today()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["value"], 3.0);
}

#[tokio::test]
async fn test_progress_rejects_future_date() {
    let app = spawn_app().await;
    let token = register_user(&app, "alice").await;
    let habit_id = create_habit(&app, &token, "Water", 8).await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/progress",
        Some(&token),
        Some(json!({"habitId": habit_id, "date": days_from_today(1), "value": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("future"));

    // Today is allowed.
    let (status, _) = request(
        &app,
        "POST",
        "/api/progress",
        Some(&token),
        Some(json!({"habitId": habit_id, "date": today(), "value": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_progress_validation_reports_every_field() {
    let app = spawn_app().await;
    let token = register_user(&app, "alice").await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/progress",
        Some(&token),
        Some(json!({"habitId": 0, "date": "08/07/2026", "value": -2})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_progress_against_foreign_habit_is_not_found() {
    let app = spawn_app().await;
    let token_a = register_user(&app, "alice").await;
    let token_b = register_user(&app, "bob").await;
    let habit_id = create_habit(&app, &token_a, "Alice Habit", 1).await;

    let (status, _) = request(
        &app,
        "POST",
        "/api/progress",
        Some(&token_b),
        Some(json!({"habitId": habit_id, "date": today(), "value": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_progress_update_by_id_rejects_collision() {
    let app = spawn_app().await;
    let token = register_user(&app, "alice").await;
    let habit_id = create_habit(&app, &token, "Water", 8).await;

    for days_ago in [1i64, 0] {
        let (status, _) = request(
            &app,
            "POST",
            "/api/progress",
            Some(&token),
            Some(json!({"habitId": habit_id, "date": days_from_today(-days_ago), "value": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = request(&app, "GET", "/api/progress", Some(&token), None).await;
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    let newest_id = records[0]["id"].as_i64().unwrap();

    // Moving the newest record onto the older record's date must not
    // silently collide.
    let (status, body) = request(
        &app,
        "PUT",
        &format!("/api/progress/{newest_id}"),
        Some(&token),
        Some(json!({"habitId": habit_id, "date": days_from_today(-1), "value": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Progress already exists for this habit and date");

    // Updating in place (same date) is fine.
    let (status, body) = request(
        &app,
        "PUT",
        &format!("/api/progress/{newest_id}"),
        Some(&token),
        Some(json!({"habitId": habit_id, "date": today(), "value": 9})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed"], true);
}

#[tokio::test]
async fn test_toggle_completion_is_a_manual_override() {
    let app = spawn_app().await;
    let token = register_user(&app, "alice").await;
    let habit_id = create_habit(&app, &token, "Water", 8).await;

    let (_, body) = request(
        &app,
        "POST",
        "/api/progress",
        Some(&token),
        Some(json!({"habitId": habit_id, "date": today(), "value": 3})),
    )
    .await;
    let id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["completed"], false);

    // The override wins over the value/target rule: value stays below
    // target while completed flips on.
    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/progress/{id}/toggle-completion"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed"], true);
    assert_eq!(body["data"]["value"], 3.0);
    assert!(body["data"]["completedAt"].is_string());

    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/progress/{id}/toggle-completion"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed"], false);
    assert!(body["data"]["completedAt"].is_null());
}

#[tokio::test]
async fn test_delete_habit_cascades_to_progress() {
    let app = spawn_app().await;
    let token = register_user(&app, "alice").await;
    let habit_id = create_habit(&app, &token, "Water", 8).await;

    let (_, _) = request(
        &app,
        "POST",
        "/api/progress",
        Some(&token),
        Some(json!({"habitId": habit_id, "date": today(), "value": 8})),
    )
    .await;

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/habits/{habit_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(&app, "GET", "/api/progress", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_progress_queries_by_date_and_habit() {
    let app = spawn_app().await;
    let token = register_user(&app, "alice").await;
    let water = create_habit(&app, &token, "Water", 8).await;
    let run = create_habit(&app, &token, "Run", 5).await;

    for (habit, date, value) in [
        (water, today(), 8.0),
        (water, days_from_today(-1), 4.0),
        (run, today(), 5.0),
    ] {
        let (status, _) = request(
            &app,
            "POST",
            "/api/progress",
            Some(&token),
            Some(json!({"habitId": habit, "date": date, "value": value})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/progress/date/{}", today()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/progress/habit/{water}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    // Newest date first, annotated with the parent habit summary.
    assert_eq!(records[0]["date"], today());
    assert_eq!(records[0]["habit"]["targetValue"], 8);

    let (status, _) = request(
        &app,
        "GET",
        &format!("/api/progress/habit/{water}?limit=0"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(
        &app,
        "GET",
        "/api/progress/date/2026-13-99",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_progress_stats_overview() {
    let app = spawn_app().await;
    let token = register_user(&app, "alice").await;

    // No habits at all: all zeros, no division error.
    let (status, body) = request(
        &app,
        "GET",
        "/api/progress/stats/overview",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["activeHabits"], 0);
    assert_eq!(body["data"]["todayRate"], 0);

    let habit_id = create_habit(&app, &token, "Water", 8).await;
    let (_, _) = request(
        &app,
        "POST",
        "/api/progress",
        Some(&token),
        Some(json!({"habitId": habit_id, "date": today(), "value": 8})),
    )
    .await;

    let (status, body) = request(
        &app,
        "GET",
        "/api/progress/stats/overview",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completedToday"], 1);
    assert_eq!(body["data"]["completedAllTime"], 1);
    assert_eq!(body["data"]["todayRate"], 100);
}

// ============================================================================
// System
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_requires_no_auth() {
    let app = spawn_app().await;

    let (status, body) = request(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["database"], "connected");
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_protected_routes_reject_missing_token() {
    let app = spawn_app().await;

    for uri in ["/api/habits", "/api/progress", "/api/habits/stats/overview"] {
        let (status, _) = request(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "route {uri}");
    }
}
