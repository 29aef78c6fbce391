// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::{Validate, ValidationError};

use crate::models::response::lenient_number;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub id: String,
    pub certification_id: String,
    pub topic_id: Option<String>,
    pub question_text: String,

    /// e.g. 'MULTIPLE_CHOICE'.
    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: String,

    /// 'EASY', 'MEDIUM' or 'HARD'.
    pub difficulty: String,
    pub explanation: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Represents the 'question_options' table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuestionOption {
    pub id: String,
    pub question_id: String,
    pub answer_text: String,
    pub is_correct: bool,
    pub order_index: i32,
}

/// A question with its options ordered by `order_index`.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<QuestionOption>,
}

impl QuestionWithOptions {
    pub fn option(&self, option_id: &str) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub fn correct_option(&self) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.is_correct)
    }
}

/// DTO for sending a quiz question to the client (excludes answer key and explanation).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    pub topic_id: Option<String>,
    pub question_text: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub difficulty: String,
    pub options: Vec<PublicOption>,
}

#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: String,
    pub answer_text: String,
    pub order_index: i32,
}

impl From<QuestionWithOptions> for PublicQuestion {
    fn from(q: QuestionWithOptions) -> Self {
        Self {
            id: q.question.id,
            topic_id: q.question.topic_id,
            question_text: q.question.question_text,
            question_type: q.question.question_type,
            difficulty: q.question.difficulty,
            options: q
                .options
                .into_iter()
                .map(|o| PublicOption {
                    id: o.id,
                    answer_text: o.answer_text,
                    order_index: o.order_index,
                })
                .collect(),
        }
    }
}

/// Query parameters for fetching a quiz.
#[derive(Debug, Default, Deserialize)]
pub struct QuizParams {
    #[serde(default, deserialize_with = "lenient_number")]
    pub limit: Option<i64>,
}

impl QuizParams {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub certification_id: String,
    pub topic_id: Option<String>,
    pub question_text: String,
    pub question_type: String,
    pub difficulty: String,
    pub explanation: Option<String>,
    pub options: Vec<NewOption>,
}

#[derive(Debug, Clone)]
pub struct NewOption {
    pub answer_text: String,
    pub is_correct: bool,
}

/// DTO for creating a new question (admin only).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub topic_id: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    #[validate(custom(function = validate_question_type))]
    #[serde(rename = "type", default = "default_question_type")]
    pub question_type: String,
    #[validate(custom(function = validate_difficulty))]
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[validate(length(max = 4000))]
    pub explanation: Option<String>,
    #[validate(custom(function = validate_options))]
    #[validate(nested)]
    pub options: Vec<CreateOptionRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOptionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub answer_text: String,
    #[serde(default)]
    pub is_correct: bool,
}

fn default_question_type() -> String {
    "MULTIPLE_CHOICE".to_string()
}

fn default_difficulty() -> String {
    "MEDIUM".to_string()
}

fn validate_question_type(value: &str) -> Result<(), ValidationError> {
    match value {
        "MULTIPLE_CHOICE" | "TRUE_FALSE" => Ok(()),
        _ => Err(ValidationError::new("unknown_question_type")),
    }
}

fn validate_difficulty(value: &str) -> Result<(), ValidationError> {
    match value {
        "EASY" | "MEDIUM" | "HARD" => Ok(()),
        _ => Err(ValidationError::new("unknown_difficulty")),
    }
}

fn validate_options(options: &[CreateOptionRequest]) -> Result<(), ValidationError> {
    if options.len() < 2 {
        return Err(ValidationError::new("at_least_two_options"));
    }
    if options.iter().filter(|o| o.is_correct).count() != 1 {
        return Err(ValidationError::new("exactly_one_correct_option"));
    }
    Ok(())
}
