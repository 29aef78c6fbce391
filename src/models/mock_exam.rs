// src/models/mock_exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'mock_exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MockExam {
    pub id: String,
    pub certification_id: String,
    pub name: String,
    pub total_questions: i32,
    pub duration_minutes: i32,
    /// Percentage required to pass this exam.
    pub passing_score: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// One user's run through a mock exam.
/// Created with `correct_answers = 0`, completed at most once.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MockExamAttempt {
    pub id: String,
    pub user_id: String,
    pub mock_exam_id: String,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub score: Option<f64>,
    pub passed: Option<bool>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_taken_seconds: Option<i32>,
}

impl MockExamAttempt {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MockExamAnswer {
    pub id: String,
    pub attempt_id: String,
    pub question_id: String,
    pub selected_answer: Option<String>,
    pub time_spent_seconds: i32,
}

#[derive(Debug, Clone)]
pub struct NewMockExam {
    pub certification_id: String,
    pub name: String,
    pub total_questions: i32,
    pub duration_minutes: i32,
    pub passing_score: i32,
}

#[derive(Debug, Clone)]
pub struct NewMockAttempt {
    pub user_id: String,
    pub mock_exam_id: String,
    pub total_questions: i32,
}

#[derive(Debug, Clone)]
pub struct NewMockAnswer {
    pub question_id: String,
    pub selected_answer: Option<String>,
    pub time_spent_seconds: i32,
}

/// Final figures written to an attempt when it completes.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub correct_answers: i32,
    pub score: f64,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
    pub time_taken_seconds: i32,
}

/// DTO for submitting a mock exam attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitMockExamRequest {
    #[validate(length(min = 1))]
    pub attempt_id: String,
    #[validate(nested)]
    pub answers: Vec<MockAnswerInput>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MockAnswerInput {
    #[validate(length(min = 1))]
    pub question_id: String,
    /// Option id chosen by the user.
    pub selected_answer: Option<String>,
    #[validate(range(min = 0))]
    pub time_spent_seconds: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct MockExamSummary {
    pub total_questions: i32,
    pub answered: i32,
    pub correct_answers: i32,
    pub score: f64,
    pub passed: bool,
    pub passing_score: i32,
}

#[derive(Debug, Serialize)]
pub struct MockExamResult {
    pub attempt: MockExamAttempt,
    pub summary: MockExamSummary,
}

/// History row: an attempt with the mock exam it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct MockAttemptWithExam {
    #[serde(flatten)]
    pub attempt: MockExamAttempt,
    pub mock_exam: MockExam,
}
