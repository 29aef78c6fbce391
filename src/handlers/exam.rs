// src/handlers/exam.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{
        mock_exam::SubmitMockExamRequest,
        question::{CreateQuestionRequest, QuizParams},
        response::{ApiResponse, PageParams},
        submission::SubmitQuizRequest,
    },
    services::{CatalogService, ExamService},
    utils::{
        extract::{QueryParams, ValidatedJson},
        jwt::Claims,
    },
};

/// Certification detail plus how much practice content it has.
pub async fn get_overview(
    State(catalog): State<CatalogService>,
    Path(certification_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let overview = catalog.overview(&certification_id).await?;
    Ok(Json(ApiResponse::success(overview, "Overview retrieved successfully")))
}

pub async fn list_study_materials(
    State(exams): State<ExamService>,
    Path(certification_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let materials = exams.study_materials(&certification_id).await?;
    Ok(Json(ApiResponse::success(
        materials,
        "Study materials retrieved successfully",
    )))
}

/// Returns up to `limit` quiz questions. Correct answers are not included.
pub async fn get_quiz(
    State(exams): State<ExamService>,
    Path(certification_id): Path<String>,
    QueryParams(params): QueryParams<QuizParams>,
) -> Result<impl IntoResponse, AppError> {
    let questions = exams.quiz_questions(&certification_id, params.limit()).await?;
    Ok(Json(ApiResponse::success(
        questions,
        "Quiz questions retrieved successfully",
    )))
}

/// Grades a quiz attempt and records it for the caller.
pub async fn submit_quiz(
    State(exams): State<ExamService>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(payload): ValidatedJson<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = exams.submit_quiz(&claims.sub, payload).await?;
    Ok(Json(ApiResponse::success(result, "Quiz submitted successfully")))
}

/// Adds a question to the certification's quiz bank (admin only).
pub async fn create_question(
    State(exams): State<ExamService>,
    Path(certification_id): Path<String>,
    ValidatedJson(payload): ValidatedJson<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question = exams.create_question(&certification_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(question, "Question created successfully")),
    ))
}

pub async fn list_dumps(
    State(exams): State<ExamService>,
    Path(certification_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let dumps = exams.dumps(&certification_id).await?;
    Ok(Json(ApiResponse::success(dumps, "Exam dumps retrieved successfully")))
}

pub async fn list_dump_questions(
    State(exams): State<ExamService>,
    Path(dump_id): Path<String>,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let (questions, pagination) = exams.dump_questions(&dump_id, &params).await?;
    Ok(Json(ApiResponse::paginated(
        questions,
        pagination,
        "Dump questions retrieved successfully",
    )))
}

pub async fn list_mock_exams(
    State(exams): State<ExamService>,
    Path(certification_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mocks = exams.mock_exams(&certification_id).await?;
    Ok(Json(ApiResponse::success(mocks, "Mock exams retrieved successfully")))
}

pub async fn get_mock_exam(
    State(exams): State<ExamService>,
    Path(mock_exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mock = exams.mock_exam(&mock_exam_id).await?;
    Ok(Json(ApiResponse::success(mock, "Mock exam retrieved successfully")))
}

/// Opens a new attempt. Calling it again starts another attempt.
pub async fn start_mock_exam(
    State(exams): State<ExamService>,
    Extension(claims): Extension<Claims>,
    Path(mock_exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = exams.start_mock(&claims.sub, &mock_exam_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(attempt, "Mock exam started successfully")),
    ))
}

pub async fn submit_mock_exam(
    State(exams): State<ExamService>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(payload): ValidatedJson<SubmitMockExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = exams.submit_mock(&claims.sub, payload).await?;
    Ok(Json(ApiResponse::success(
        result,
        "Mock exam submitted successfully",
    )))
}

/// The caller's last quiz submissions for a certification, newest first.
pub async fn quiz_history(
    State(exams): State<ExamService>,
    Extension(claims): Extension<Claims>,
    Path(certification_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let history = exams.quiz_history(&claims.sub, &certification_id).await?;
    Ok(Json(ApiResponse::success(
        history,
        "Quiz history retrieved successfully",
    )))
}

/// The caller's last mock exam attempts for a certification, newest first.
pub async fn mock_history(
    State(exams): State<ExamService>,
    Extension(claims): Extension<Claims>,
    Path(certification_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let history = exams.mock_history(&claims.sub, &certification_id).await?;
    Ok(Json(ApiResponse::success(
        history,
        "Mock exam history retrieved successfully",
    )))
}
