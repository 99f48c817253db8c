use std::env;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

use jobboard_backend::middleware::auth::Claims;
use jobboard_backend::services::notification_service::CollectingNotifier;
use jobboard_backend::storage::memory::InMemoryStore;
use jobboard_backend::{routes, AppState};

fn ensure_config() {
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("DATABASE_URL", "postgres://localhost/unused");
    env::set_var("JWT_SECRET", "test_secret_key");
    env::set_var("WEBHOOK_SECRET", "whsec_test");
    env::set_var("NOTIFY_WEBHOOK_URL", "http://localhost/webhook");
    env::set_var("PUBLIC_RPS", "100");
    env::set_var("ADMIN_RPS", "100");
    let _ = jobboard_backend::config::init_config();
}

fn token_for(user_id: Uuid, role: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: 4102444800,
        role: Some(role.to_string()),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(b"test_secret_key"),
    )
    .expect("encode token")
}

fn build_app(store: Arc<InMemoryStore>) -> Router {
    let state = AppState::new(store, Arc::new(CollectingNotifier::default()));

    let public = Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/api/certificates/:code",
            get(routes::certificate_routes::verify_certificate),
        );

    let applicant_api = Router::new()
        .route(
            "/api/assessments",
            get(routes::assessment_routes::list_assessments),
        )
        .route(
            "/api/assessments/:id",
            get(routes::assessment_routes::get_assessment),
        )
        .route(
            "/api/assessments/:id/submit",
            post(routes::assessment_routes::submit_assessment),
        )
        .route(
            "/api/assessments/:id/result",
            get(routes::assessment_routes::get_result),
        )
        .layer(axum::middleware::from_fn(
            jobboard_backend::middleware::auth::require_bearer_auth,
        ));

    let admin_api = Router::new()
        .route(
            "/api/admin/assessments",
            get(routes::admin_routes::list_assessments).post(routes::admin_routes::create_assessment),
        )
        .route(
            "/api/admin/assessments/:id",
            get(routes::admin_routes::get_assessment)
                .patch(routes::admin_routes::update_assessment)
                .delete(routes::admin_routes::delete_assessment),
        )
        .route(
            "/api/admin/assessments/:id/attempts",
            get(routes::admin_routes::list_attempts),
        )
        .layer(axum::middleware::from_fn(
            jobboard_backend::middleware::auth::require_employer_or_admin,
        ));

    public.merge(applicant_api).merge(admin_api).with_state(state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).expect("serialize body")))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    };

    let response = app.clone().oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse body")
    };
    (status, json)
}

fn create_payload() -> JsonValue {
    let questions: Vec<JsonValue> = (0..25)
        .map(|i| {
            json!({
                "prompt": format!("Question {}", i),
                "option_a": "first",
                "option_b": "second",
                "option_c": "third",
                "option_d": "fourth",
                "correct_answer": "A",
            })
        })
        .collect();
    json!({
        "title": "Backend fundamentals",
        "description": "Core backend knowledge check",
        "kind": "skill_assessment",
        "time_limit_minutes": 30,
        "passing_score": 70,
        "questions": questions,
    })
}

fn answers_from_view(view: &JsonValue, correct_count: usize) -> JsonValue {
    let questions = view["questions"].as_array().expect("questions array");
    let answers: Vec<JsonValue> = questions
        .iter()
        .enumerate()
        .map(|(idx, q)| {
            json!({
                "question_id": q["id"],
                "selected_option": if idx < correct_count { "A" } else { "B" },
            })
        })
        .collect();
    json!({ "answers": answers, "time_spent_minutes": 12 })
}

#[tokio::test]
async fn skill_assessment_flow_end_to_end() {
    ensure_config();
    let store = Arc::new(InMemoryStore::new());
    let app = build_app(store);

    let admin = token_for(Uuid::new_v4(), "admin");
    let applicant_id = Uuid::new_v4();
    let applicant = token_for(applicant_id, "applicant");

    // admin creates the assessment
    let (status, created) = send(
        &app,
        "POST",
        "/api/admin/assessments",
        Some(&admin),
        Some(create_payload()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let assessment_id = created["id"].as_str().expect("assessment id").to_string();

    // applicant browses and fetches the definition without answers
    let (status, listing) = send(&app, "GET", "/api/assessments", Some(&applicant), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["total"], json!(1));

    let (status, view) = send(
        &app,
        "GET",
        &format!("/api/assessments/{}", assessment_id),
        Some(&applicant),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["total_questions"], json!(25));
    assert!(!serde_json::to_string(&view).unwrap().contains("correct_answer"));

    // 18/25 correct -> 72%, passes the 70% bar
    let (status, result) = send(
        &app,
        "POST",
        &format!("/api/assessments/{}/submit", assessment_id),
        Some(&applicant),
        Some(answers_from_view(&view, 18)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["score"], json!(72));
    assert_eq!(result["is_passed"], json!(true));
    assert_eq!(result["passing_score"], json!(70));
    assert_eq!(result["badge_earned"], json!(true));
    let code = result["certificate"]["certificate_code"]
        .as_str()
        .expect("certificate code")
        .to_string();
    assert!(code.starts_with("CERT-"));

    // retake: score is overwritten, the certificate code is stable
    let (status, retake) = send(
        &app,
        "POST",
        &format!("/api/assessments/{}/submit", assessment_id),
        Some(&applicant),
        Some(answers_from_view(&view, 25)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(retake["score"], json!(100));
    assert_eq!(retake["certificate"]["certificate_code"], json!(code.clone()));
    assert_eq!(retake["attempt_id"], result["attempt_id"]);

    // result endpoint reflects the stored attempt
    let (status, latest) = send(
        &app,
        "GET",
        &format!("/api/assessments/{}/result", assessment_id),
        Some(&applicant),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["score"], json!(100));

    // anyone holding the code can verify the certificate
    let (status, verification) =
        send(&app, "GET", &format!("/api/certificates/{}", code), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verification["is_valid"], json!(true));

    // admin sees the recorded attempt
    let (status, attempts) = send(
        &app,
        "GET",
        &format!("/api/admin/assessments/{}/attempts", assessment_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(attempts.as_array().expect("attempts array").len(), 1);
}

#[tokio::test]
async fn failing_submission_earns_no_certificate() {
    ensure_config();
    let store = Arc::new(InMemoryStore::new());
    let app = build_app(store);

    let admin = token_for(Uuid::new_v4(), "employer");
    let applicant = token_for(Uuid::new_v4(), "applicant");

    let (_, created) = send(
        &app,
        "POST",
        "/api/admin/assessments",
        Some(&admin),
        Some(create_payload()),
    )
    .await;
    let assessment_id = created["id"].as_str().unwrap().to_string();

    let (_, view) = send(
        &app,
        "GET",
        &format!("/api/assessments/{}", assessment_id),
        Some(&applicant),
        None,
    )
    .await;

    let (status, result) = send(
        &app,
        "POST",
        &format!("/api/assessments/{}/submit", assessment_id),
        Some(&applicant),
        Some(answers_from_view(&view, 10)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["score"], json!(40));
    assert_eq!(result["is_passed"], json!(false));
    assert_eq!(result["badge_earned"], json!(false));
    assert_eq!(result["certificate"], JsonValue::Null);
}

#[tokio::test]
async fn map_shaped_answers_are_accepted() {
    ensure_config();
    let store = Arc::new(InMemoryStore::new());
    let app = build_app(store);

    let admin = token_for(Uuid::new_v4(), "admin");
    let applicant = token_for(Uuid::new_v4(), "applicant");

    let (_, created) = send(
        &app,
        "POST",
        "/api/admin/assessments",
        Some(&admin),
        Some(create_payload()),
    )
    .await;
    let assessment_id = created["id"].as_str().unwrap().to_string();

    let (_, view) = send(
        &app,
        "GET",
        &format!("/api/assessments/{}", assessment_id),
        Some(&applicant),
        None,
    )
    .await;

    let mut map = serde_json::Map::new();
    for q in view["questions"].as_array().unwrap() {
        map.insert(q["id"].as_str().unwrap().to_string(), json!("A"));
    }
    let (status, result) = send(
        &app,
        "POST",
        &format!("/api/assessments/{}/submit", assessment_id),
        Some(&applicant),
        Some(json!({ "answers": map, "time_spent_minutes": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["score"], json!(100));
}

#[tokio::test]
async fn auth_is_enforced_per_surface() {
    ensure_config();
    let store = Arc::new(InMemoryStore::new());
    let app = build_app(store);

    // applicant surface requires a token
    let (status, _) = send(&app, "GET", "/api/assessments", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // admin surface rejects applicant tokens
    let applicant = token_for(Uuid::new_v4(), "applicant");
    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/assessments",
        Some(&applicant),
        Some(create_payload()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // health stays open
    let (status, _) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn partial_answer_sets_are_rejected() {
    ensure_config();
    let store = Arc::new(InMemoryStore::new());
    let app = build_app(store);

    let admin = token_for(Uuid::new_v4(), "admin");
    let applicant = token_for(Uuid::new_v4(), "applicant");

    let (_, created) = send(
        &app,
        "POST",
        "/api/admin/assessments",
        Some(&admin),
        Some(create_payload()),
    )
    .await;
    let assessment_id = created["id"].as_str().unwrap().to_string();

    let (_, view) = send(
        &app,
        "GET",
        &format!("/api/assessments/{}", assessment_id),
        Some(&applicant),
        None,
    )
    .await;

    let questions = view["questions"].as_array().unwrap();
    let answers: Vec<JsonValue> = questions
        .iter()
        .take(5)
        .map(|q| json!({ "question_id": q["id"], "selected_option": "A" }))
        .collect();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/assessments/{}/submit", assessment_id),
        Some(&applicant),
        Some(json!({ "answers": answers, "time_spent_minutes": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("expected 25 answers"));
}
