// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, certification, exam, health},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Assembles the main application router.
///
/// * Public, authenticated and admin routes per resource.
/// * Global middleware (Trace, CORS) and a JSON 404 fallback.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let require_auth = || middleware::from_fn_with_state(state.tokens.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .route("/me", get(auth::me))
                .route_layer(require_auth()),
        );

    let certification_routes = Router::new()
        .route("/", get(certification::list_certifications))
        .route("/{id}", get(certification::get_certification))
        .merge(
            Router::new()
                .route("/", post(certification::create_certification))
                // Auth first, then the role check
                .route_layer(middleware::from_fn(admin_middleware))
                .route_layer(require_auth()),
        );

    let exam_routes = Router::new()
        .route("/{certification_id}/overview", get(exam::get_overview))
        .route("/{certification_id}/study-materials", get(exam::list_study_materials))
        .route("/{certification_id}/quiz", get(exam::get_quiz))
        .route("/{certification_id}/dumps", get(exam::list_dumps))
        .route("/{certification_id}/mocks", get(exam::list_mock_exams))
        .route("/dumps/{dump_id}/questions", get(exam::list_dump_questions))
        .route("/mocks/{mock_exam_id}", get(exam::get_mock_exam))
        .merge(
            Router::new()
                .route("/quiz/submit", post(exam::submit_quiz))
                .route("/mocks/{mock_exam_id}/start", post(exam::start_mock_exam))
                .route("/mocks/submit", post(exam::submit_mock_exam))
                .route("/{certification_id}/history/quiz", get(exam::quiz_history))
                .route("/{certification_id}/history/mocks", get(exam::mock_history))
                .route_layer(require_auth()),
        )
        .merge(
            Router::new()
                .route("/{certification_id}/questions", post(exam::create_question))
                .route_layer(middleware::from_fn(admin_middleware))
                .route_layer(require_auth()),
        );

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/auth", auth_routes)
        .nest("/api/certifications", certification_routes)
        .nest("/api/exams", exam_routes)
        .fallback(health::not_found)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
