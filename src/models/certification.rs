// src/models/certification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'certifications' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Certification {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Percentage, 0-100.
    pub passing_score: i32,
    pub duration_minutes: i32,
    pub total_questions: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Represents the 'topics' table. Child of exactly one certification.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Topic {
    pub id: String,
    pub certification_id: String,
    pub name: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub is_active: bool,
}

/// A certification together with its active topics.
#[derive(Debug, Serialize)]
pub struct CertificationDetail {
    #[serde(flatten)]
    pub certification: Certification,
    pub topics: Vec<Topic>,
}

/// Exam overview tab: the certification plus content counts.
#[derive(Debug, Serialize)]
pub struct CertificationOverview {
    #[serde(flatten)]
    pub detail: CertificationDetail,
    pub quiz_question_count: i64,
    pub dump_count: i64,
    pub mock_exam_count: i64,
}

/// Query parameters for listing certifications.
#[derive(Debug, Default, Deserialize)]
pub struct CertificationListParams {
    /// Exact name match, used by clients to find a certification before creating it.
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCertification {
    pub name: String,
    pub description: Option<String>,
    pub passing_score: i32,
    pub duration_minutes: i32,
    pub total_questions: i32,
}

#[derive(Debug, Clone)]
pub struct NewTopic {
    pub name: String,
    pub description: Option<String>,
    pub order_index: i32,
}

/// DTO for creating a certification (admin only).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCertificationRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters."))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 0, max = 100, message = "Passing score must be a percentage."))]
    #[serde(default = "default_passing_score")]
    pub passing_score: i32,
    #[validate(range(min = 1, message = "Duration must be positive."))]
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: i32,
    #[validate(range(min = 1, message = "Question count must be positive."))]
    #[serde(default = "default_total_questions")]
    pub total_questions: i32,
    #[validate(nested)]
    #[serde(default)]
    pub topics: Vec<CreateTopicRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTopicRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub order_index: Option<i32>,
}

fn default_passing_score() -> i32 {
    70
}

fn default_duration_minutes() -> i32 {
    120
}

fn default_total_questions() -> i32 {
    60
}
