// tests/api_tests.rs

use std::sync::Arc;

use certprep::{
    config::Config,
    models::{
        content::{NewDumpQuestion, NewExamDump},
        mock_exam::NewMockExam,
    },
    routes,
    seed::seed_admin_user,
    state::AppState,
    store::{ContentStore, MemoryStore},
};
use serde_json::{Value, json};

const ADMIN_EMAIL: &str = "admin@certprep.test";
const ADMIN_PASSWORD: &str = "Admin123!";

struct TestApp {
    address: String,
    store: Arc<MemoryStore>,
    client: reqwest::Client,
}

fn test_config() -> Config {
    Config {
        port: 0,
        environment: "test".to_string(),
        database_url: String::new(),
        database_max_connections: 1,
        jwt_secret: "test_access_secret".to_string(),
        jwt_refresh_secret: "test_refresh_secret".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        jwt_refresh_expiration: 3600,
        cors_origins: vec!["http://localhost:3000".to_string()],
        admin_email: Some(ADMIN_EMAIL.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
        seed_demo_data: false,
        rust_log: "error".to_string(),
    }
}

/// Spawns the app on a random port, backed by a fresh in-memory store.
async fn spawn_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    seed_admin_user(store.as_ref(), &config)
        .await
        .expect("Failed to seed admin user");

    let state = AppState::new(store.clone(), config);
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        store,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (u16, Value) {
        let mut request = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.expect("Failed to execute request");
        let status = response.status().as_u16();
        (status, response.json().await.expect("Body is not JSON"))
    }

    async fn get(&self, path: &str, token: Option<&str>) -> (u16, Value) {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.expect("Failed to execute request");
        let status = response.status().as_u16();
        (status, response.json().await.expect("Body is not JSON"))
    }

    /// Registers a fresh user and returns its access token.
    async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({ "email": email, "password": "Abcdef1!" }),
            )
            .await;
        assert_eq!(status, 201, "{}", body);
        body["data"]["access_token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        let (status, body) = self
            .post(
                "/api/auth/login",
                None,
                json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(status, 200, "{}", body);
        body["data"]["access_token"].as_str().unwrap().to_string()
    }

    /// Creates a certification with `questions` two-option questions.
    /// Returns the certification id and `(question_id, correct_option_id, wrong_option_id)` triples.
    async fn certification_with_questions(&self, questions: usize) -> (String, Vec<(String, String, String)>) {
        let admin = self.admin_token().await;
        let (status, body) = self
            .post(
                "/api/certifications",
                Some(&admin),
                json!({ "name": "AWS Solutions Architect Professional", "passing_score": 72 }),
            )
            .await;
        assert_eq!(status, 201, "{}", body);
        let certification_id = body["data"]["id"].as_str().unwrap().to_string();

        let mut keys = Vec::new();
        for i in 0..questions {
            let (status, body) = self
                .post(
                    &format!("/api/exams/{}/questions", certification_id),
                    Some(&admin),
                    json!({
                        "question_text": format!("Question {}", i),
                        "explanation": "Read the docs",
                        "options": [
                            { "answer_text": "Right", "is_correct": true },
                            { "answer_text": "Wrong" }
                        ]
                    }),
                )
                .await;
            assert_eq!(status, 201, "{}", body);
            let options = body["data"]["options"].as_array().unwrap();
            let correct = options.iter().find(|o| o["is_correct"] == true).unwrap();
            let wrong = options.iter().find(|o| o["is_correct"] == false).unwrap();
            keys.push((
                body["data"]["id"].as_str().unwrap().to_string(),
                correct["id"].as_str().unwrap().to_string(),
                wrong["id"].as_str().unwrap().to_string(),
            ));
        }

        (certification_id, keys)
    }
}

#[tokio::test]
async fn health_check_works() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let (status, body) = app.get("/health", None).await;

    // Assert
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["environment"], "test");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn unknown_route_returns_404_envelope() {
    let app = spawn_app().await;

    let (status, body) = app.get("/random_path_that_does_not_exist", None).await;

    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn register_me_login_flow() {
    // Arrange
    let app = spawn_app().await;

    // Act: register
    let (status, registered) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "email": "a@b.com", "password": "Abcdef1!" }),
        )
        .await;

    // Assert
    assert_eq!(status, 201);
    assert_eq!(registered["success"], true);
    assert_eq!(registered["data"]["user"]["email"], "a@b.com");
    assert_eq!(registered["data"]["user"]["role"], "USER");
    assert!(registered["data"]["user"].get("password_hash").is_none());
    let access = registered["data"]["access_token"].as_str().unwrap();
    let refresh = registered["data"]["refresh_token"].as_str().unwrap();

    // Act: me
    let (status, me) = app.get("/api/auth/me", Some(access)).await;
    assert_eq!(status, 200);
    assert_eq!(me["data"]["email"], "a@b.com");
    assert_eq!(me["data"]["is_active"], true);
    assert_eq!(me["data"]["id"], registered["data"]["user"]["id"]);

    // Act: login
    let (status, logged_in) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "a@b.com", "password": "Abcdef1!" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_ne!(logged_in["data"]["access_token"].as_str().unwrap(), access);
    assert_ne!(logged_in["data"]["refresh_token"].as_str().unwrap(), refresh);
}

#[tokio::test]
async fn register_duplicate_email_conflicts_regardless_of_password() {
    let app = spawn_app().await;
    app.register("dup@b.com").await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "email": "dup@b.com", "password": "abcdefgh" }),
        )
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Email already registered");
}

#[tokio::test]
async fn register_rejects_weak_password_and_bad_email() {
    let app = spawn_app().await;

    let (status, _) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "email": "weak@b.com", "password": "abcdefgh" }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "email": "not-an-email", "password": "Abcdef1!" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Validation error");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn login_does_not_leak_which_check_failed() {
    let app = spawn_app().await;
    app.register("known@b.com").await;

    let (wrong_status, wrong_password) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "known@b.com", "password": "Wrong123!" }),
        )
        .await;
    let (unknown_status, unknown_email) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "nobody@b.com", "password": "Abcdef1!" }),
        )
        .await;

    assert_eq!(wrong_status, 401);
    assert_eq!(wrong_status, unknown_status);
    assert_eq!(wrong_password["message"], unknown_email["message"]);
}

#[tokio::test]
async fn refresh_returns_usable_access_token() {
    let app = spawn_app().await;
    let (_, registered) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "email": "r@b.com", "password": "Abcdef1!" }),
        )
        .await;
    let refresh = registered["data"]["refresh_token"].as_str().unwrap();
    let access = registered["data"]["access_token"].as_str().unwrap();

    let (status, body) = app
        .post("/api/auth/refresh", None, json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(status, 200);
    assert!(body["data"].get("refresh_token").is_none());
    let new_access = body["data"]["access_token"].as_str().unwrap();

    let (status, _) = app.get("/api/auth/me", Some(new_access)).await;
    assert_eq!(status, 200);

    // Access tokens are signed with the other secret.
    let (status, _) = app
        .post("/api/auth/refresh", None, json!({ "refresh_token": access }))
        .await;
    assert_eq!(status, 401);

    // A refresh token is not accepted as a bearer token.
    let (status, _) = app.get("/api/auth/me", Some(refresh)).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn protected_routes_require_bearer_token() {
    let app = spawn_app().await;

    let (status, body) = app.get("/api/auth/me", None).await;
    assert_eq!(status, 401);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/api/auth/me", Some("garbage")).await;
    assert_eq!(status, 401);

    let (status, _) = app.post("/api/auth/logout", None, json!({})).await;
    assert_eq!(status, 401);

    let token = app.register("out@b.com").await;
    let (status, body) = app.post("/api/auth/logout", Some(&token), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn empty_catalog_lists_empty_array() {
    let app = spawn_app().await;

    let (status, body) = app.get("/api/certifications", None).await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn only_admins_create_certifications() {
    let app = spawn_app().await;
    let user = app.register("user@b.com").await;
    let payload = json!({
        "name": "Azure Administrator",
        "topics": [{ "name": "Identity" }, { "name": "Networking" }]
    });

    let (status, _) = app.post("/api/certifications", None, payload.clone()).await;
    assert_eq!(status, 401);

    let (status, body) = app.post("/api/certifications", Some(&user), payload.clone()).await;
    assert_eq!(status, 403);
    assert_eq!(body["success"], false);

    let admin = app.admin_token().await;
    let (status, created) = app.post("/api/certifications", Some(&admin), payload).await;
    assert_eq!(status, 201);
    assert_eq!(created["data"]["passing_score"], 70);
    assert_eq!(created["data"]["topics"].as_array().unwrap().len(), 2);

    let id = created["data"]["id"].as_str().unwrap();
    let (status, detail) = app.get(&format!("/api/certifications/{}", id), None).await;
    assert_eq!(status, 200);
    assert_eq!(detail["data"]["name"], "Azure Administrator");
    assert_eq!(detail["data"]["topics"][0]["name"], "Identity");

    let (_, filtered) = app
        .get("/api/certifications?name=Azure%20Administrator", None)
        .await;
    assert_eq!(filtered["data"].as_array().unwrap().len(), 1);

    let (status, _) = app.get("/api/certifications/does-not-exist", None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn quiz_flow_grades_and_records_history() {
    let app = spawn_app().await;
    let (certification_id, keys) = app.certification_with_questions(4).await;
    let token = app.register("quiz@b.com").await;

    // Questions come without the answer key.
    let (status, quiz) = app
        .get(&format!("/api/exams/{}/quiz?limit=3", certification_id), None)
        .await;
    assert_eq!(status, 200);
    let questions = quiz["data"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert!(questions[0]["options"][0].get("is_correct").is_none());

    let answers = json!([
        { "question_id": keys[0].0, "selected_option_id": keys[0].1 },
        { "question_id": keys[1].0, "selected_option_id": keys[1].2 },
        { "question_id": keys[2].0, "selected_option_id": keys[2].1 },
        { "question_id": keys[3].0 }
    ]);
    let (status, result) = app
        .post(
            "/api/exams/quiz/submit",
            Some(&token),
            json!({ "certification_id": certification_id, "answers": answers }),
        )
        .await;

    assert_eq!(status, 200, "{}", result);
    assert_eq!(result["data"]["submission"]["correct_answers"], 2);
    assert_eq!(result["data"]["submission"]["score"], 50.0);
    assert_eq!(result["data"]["submission"]["passed"], false);
    assert_eq!(result["data"]["summary"]["pass_percentage"], 75.0);
    assert_eq!(result["data"]["details"][1]["correct_option_text"], "Right");
    assert_eq!(result["data"]["details"][1]["explanation"], "Read the docs");

    let (status, history) = app
        .get(&format!("/api/exams/{}/history/quiz", certification_id), Some(&token))
        .await;
    assert_eq!(status, 200);
    assert_eq!(history["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn quiz_score_divides_by_submitted_answers() {
    let app = spawn_app().await;
    let (certification_id, keys) = app.certification_with_questions(10).await;
    let token = app.register("partial@b.com").await;

    let (status, result) = app
        .post(
            "/api/exams/quiz/submit",
            Some(&token),
            json!({
                "certification_id": certification_id,
                "answers": [{ "question_id": keys[0].0, "selected_option_id": keys[0].1 }]
            }),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(result["data"]["submission"]["score"], 100.0);
    assert_eq!(result["data"]["submission"]["passed"], true);
}

#[tokio::test]
async fn quiz_submission_validation() {
    let app = spawn_app().await;
    let (certification_id, _) = app.certification_with_questions(1).await;
    let token = app.register("v@b.com").await;

    let (status, body) = app
        .post(
            "/api/exams/quiz/submit",
            Some(&token),
            json!({ "certification_id": certification_id, "answers": [] }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Validation error");

    let (status, _) = app
        .post(
            "/api/exams/quiz/submit",
            Some(&token),
            json!({ "certification_id": "missing", "answers": [{ "question_id": "q" }] }),
        )
        .await;
    assert_eq!(status, 404);

    let (status, _) = app
        .post("/api/exams/quiz/submit", Some(&token), json!({ "answers": "nope" }))
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn mock_exam_start_submit_and_history() {
    let app = spawn_app().await;
    let (certification_id, keys) = app.certification_with_questions(4).await;
    let mock = app
        .store
        .insert_mock_exam(NewMockExam {
            certification_id: certification_id.clone(),
            name: "Full Mock".to_string(),
            total_questions: 4,
            duration_minutes: 180,
            passing_score: 70,
        })
        .await
        .unwrap();
    let token = app.register("mock@b.com").await;
    let other = app.register("other@b.com").await;

    let (status, listed) = app
        .get(&format!("/api/exams/{}/mocks", certification_id), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(listed["data"][0]["id"], mock.id.as_str());

    // Starting twice yields two independent attempts.
    let start = format!("/api/exams/mocks/{}/start", mock.id);
    let (status, first) = app.post(&start, Some(&token), json!({})).await;
    assert_eq!(status, 201);
    let (_, second) = app.post(&start, Some(&token), json!({})).await;
    assert_ne!(first["data"]["id"], second["data"]["id"]);
    assert_eq!(first["data"]["correct_answers"], 0);

    let attempt_id = first["data"]["id"].as_str().unwrap();
    let answers: Vec<Value> = keys
        .iter()
        .take(3)
        .map(|(question, correct, _)| {
            json!({ "question_id": question, "selected_answer": correct, "time_spent_seconds": 30 })
        })
        .collect();
    let payload = json!({ "attempt_id": attempt_id, "answers": answers });

    let (status, _) = app.post("/api/exams/mocks/submit", Some(&other), payload.clone()).await;
    assert_eq!(status, 404);

    let (status, result) = app.post("/api/exams/mocks/submit", Some(&token), payload.clone()).await;
    assert_eq!(status, 200, "{}", result);
    assert_eq!(result["data"]["summary"]["correct_answers"], 3);
    assert_eq!(result["data"]["summary"]["score"], 75.0);
    assert_eq!(result["data"]["summary"]["passed"], true);
    assert!(result["data"]["attempt"]["completed_at"].is_string());

    let (status, body) = app.post("/api/exams/mocks/submit", Some(&token), payload).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(app.store.mock_answers(attempt_id).await.len(), 3);

    let (status, history) = app
        .get(&format!("/api/exams/{}/history/mocks", certification_id), Some(&token))
        .await;
    assert_eq!(status, 200);
    let rows = history["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["mock_exam"]["name"], "Full Mock");

    let (status, _) = app.post("/api/exams/mocks/missing/start", Some(&token), json!({})).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn dump_questions_are_paginated() {
    let app = spawn_app().await;
    let (certification_id, _) = app.certification_with_questions(0).await;
    let questions = (1..=25)
        .map(|i| NewDumpQuestion {
            question_text: format!("Dump question {}", i),
            options: vec!["A".to_string(), "B".to_string()],
            correct_answer: "A".to_string(),
            explanation: None,
            order_index: i,
        })
        .collect();
    let dump = app
        .store
        .insert_dump(
            NewExamDump {
                certification_id: certification_id.clone(),
                title: "Practice Dump".to_string(),
                description: None,
            },
            questions,
        )
        .await
        .unwrap();

    let (status, listed) = app
        .get(&format!("/api/exams/{}/dumps", certification_id), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(listed["data"][0]["dump_questions"].as_array().unwrap().len(), 5);

    let (status, page) = app
        .get(&format!("/api/exams/dumps/{}/questions?page=2&limit=10", dump.id), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(page["data"].as_array().unwrap().len(), 10);
    assert_eq!(page["data"][0]["question_text"], "Dump question 11");
    assert_eq!(page["pagination"], json!({ "page": 2, "limit": 10, "total": 25, "pages": 3 }));

    let (status, page) = app
        .get(
            &format!("/api/exams/dumps/{}/questions?page=9223372036854775807", dump.id),
            None,
        )
        .await;
    assert_eq!(status, 200, "{}", page);
    assert_eq!(page["data"], json!([]));

    let (status, _) = app.get("/api/exams/dumps/missing/questions", None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn malformed_query_strings_keep_the_envelope() {
    let app = spawn_app().await;
    let (certification_id, _) = app.certification_with_questions(12).await;

    let (status, body) = app
        .get(&format!("/api/exams/{}/quiz?limit=abc", certification_id), None)
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"].as_array().unwrap().len(), 10);

    let (status, body) = app.get("/api/certifications?name=a&name=b", None).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Validation error");
    assert!(body["error"].is_string());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn overview_counts_content() {
    let app = spawn_app().await;
    let (certification_id, _) = app.certification_with_questions(2).await;

    let (status, body) = app
        .get(&format!("/api/exams/{}/overview", certification_id), None)
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["data"]["quiz_question_count"], 2);
    assert_eq!(body["data"]["dump_count"], 0);
    assert_eq!(body["data"]["topics"], json!([]));

    let (status, materials) = app
        .get(&format!("/api/exams/{}/study-materials", certification_id), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(materials["data"], json!([]));
}
