// src/models/submission.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'quiz_submissions' table in the database.
/// Immutable: every attempt inserts a new row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuizSubmission {
    pub id: String,
    pub user_id: String,
    pub certification_id: String,
    pub total_questions: i32,
    pub correct_answers: i32,
    /// Percentage, 0-100.
    pub score: f64,
    pub passed: bool,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewQuizSubmission {
    pub user_id: String,
    pub certification_id: String,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub score: f64,
    pub passed: bool,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitQuizRequest {
    #[validate(length(min = 1))]
    pub certification_id: String,
    #[validate(length(min = 1, message = "No answers submitted"))]
    #[validate(nested)]
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmittedAnswer {
    #[validate(length(min = 1))]
    pub question_id: String,
    /// Absent when the question was skipped; always graded as incorrect.
    pub selected_option_id: Option<String>,
}

/// Per-question breakdown returned after grading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerDetail {
    pub question_id: String,
    pub question_text: Option<String>,
    pub selected_option_id: Option<String>,
    pub selected_option_text: Option<String>,
    pub correct_option_id: Option<String>,
    pub correct_option_text: Option<String>,
    pub explanation: Option<String>,
    pub is_correct: bool,
}

#[derive(Debug, Serialize)]
pub struct QuizSummary {
    pub total_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub score: f64,
    pub passed: bool,
    pub pass_percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct QuizResult {
    pub submission: QuizSubmission,
    pub details: Vec<AnswerDetail>,
    pub summary: QuizSummary,
}
