// src/handlers/certification.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{
        certification::{CertificationListParams, CreateCertificationRequest},
        response::ApiResponse,
    },
    services::CatalogService,
    utils::extract::{QueryParams, ValidatedJson},
};

/// Lists active certifications ordered by name, optionally filtered by exact name.
pub async fn list_certifications(
    State(catalog): State<CatalogService>,
    QueryParams(params): QueryParams<CertificationListParams>,
) -> Result<impl IntoResponse, AppError> {
    let certifications = catalog.list(params.name.as_deref()).await?;
    Ok(Json(ApiResponse::success(
        certifications,
        "Certifications retrieved successfully",
    )))
}

/// Retrieves a single certification with its topics.
pub async fn get_certification(
    State(catalog): State<CatalogService>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let certification = catalog.detail(&id).await?;
    Ok(Json(ApiResponse::success(
        certification,
        "Certification retrieved successfully",
    )))
}

/// Creates a certification (admin only).
pub async fn create_certification(
    State(catalog): State<CatalogService>,
    ValidatedJson(payload): ValidatedJson<CreateCertificationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let certification = catalog.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            certification,
            "Certification created successfully",
        )),
    ))
}
