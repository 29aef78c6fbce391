// src/store/mod.rs
//
// Persistence seam. Services only talk to these traits; `PgStore` backs them
// with Postgres, `MemoryStore` keeps everything in-process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        certification::{Certification, NewCertification, NewTopic, Topic},
        content::{
            DumpQuestion, ExamDump, ExamDumpWithPreview, NewDumpQuestion, NewExamDump,
            NewStudyMaterial, StudyMaterial,
        },
        mock_exam::{
            AttemptOutcome, MockAttemptWithExam, MockExam, MockExamAttempt, NewMockAnswer,
            NewMockAttempt, NewMockExam,
        },
        question::{NewQuestion, QuestionWithOptions},
        submission::{NewQuizSubmission, QuizSubmission},
        user::{NewUser, User},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Credential store.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Fails with `AppError::Conflict` when the email is already taken.
    async fn insert_user(&self, new_user: NewUser) -> Result<User, AppError>;

    async fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), AppError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Active certifications ordered by name, optionally filtered by exact name.
    async fn list_certifications(&self, name: Option<&str>) -> Result<Vec<Certification>, AppError>;

    /// Active certification by id.
    async fn find_certification(&self, id: &str) -> Result<Option<Certification>, AppError>;

    /// Active topics of a certification ordered by `order_index`.
    async fn list_topics(&self, certification_id: &str) -> Result<Vec<Topic>, AppError>;

    /// Inserts a certification and its topics as one unit.
    async fn insert_certification(
        &self,
        certification: NewCertification,
        topics: Vec<NewTopic>,
    ) -> Result<(Certification, Vec<Topic>), AppError>;
}

/// Exam content: question bank, dumps, study materials and mock exams.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Active questions of a certification with their options, oldest first.
    async fn list_quiz_questions(
        &self,
        certification_id: &str,
        limit: i64,
    ) -> Result<Vec<QuestionWithOptions>, AppError>;

    /// Batch fetch by id. Unknown ids are silently absent from the result.
    async fn find_questions(&self, ids: &[String]) -> Result<Vec<QuestionWithOptions>, AppError>;

    async fn count_quiz_questions(&self, certification_id: &str) -> Result<i64, AppError>;

    async fn insert_question(&self, question: NewQuestion) -> Result<QuestionWithOptions, AppError>;

    /// Active materials, newest first.
    async fn list_study_materials(&self, certification_id: &str) -> Result<Vec<StudyMaterial>, AppError>;

    async fn insert_study_material(&self, material: NewStudyMaterial) -> Result<StudyMaterial, AppError>;

    /// Active dumps, newest first, each with up to `preview` questions.
    async fn list_dumps(
        &self,
        certification_id: &str,
        preview: i64,
    ) -> Result<Vec<ExamDumpWithPreview>, AppError>;

    async fn find_dump(&self, dump_id: &str) -> Result<Option<ExamDump>, AppError>;

    /// One page of a dump's questions plus the total question count.
    async fn list_dump_questions(
        &self,
        dump_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<DumpQuestion>, i64), AppError>;

    async fn insert_dump(
        &self,
        dump: NewExamDump,
        questions: Vec<NewDumpQuestion>,
    ) -> Result<ExamDump, AppError>;

    /// Active mock exams, newest first.
    async fn list_mock_exams(&self, certification_id: &str) -> Result<Vec<MockExam>, AppError>;

    async fn find_mock_exam(&self, id: &str) -> Result<Option<MockExam>, AppError>;

    async fn insert_mock_exam(&self, mock_exam: NewMockExam) -> Result<MockExam, AppError>;
}

/// Write side: quiz submissions and mock exam attempts.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert_quiz_submission(&self, submission: NewQuizSubmission) -> Result<QuizSubmission, AppError>;

    /// Latest submissions of a user for a certification, newest first.
    async fn recent_quiz_submissions(
        &self,
        user_id: &str,
        certification_id: &str,
        limit: i64,
    ) -> Result<Vec<QuizSubmission>, AppError>;

    async fn insert_mock_attempt(&self, attempt: NewMockAttempt) -> Result<MockExamAttempt, AppError>;

    async fn find_mock_attempt(&self, id: &str) -> Result<Option<MockExamAttempt>, AppError>;

    /// Records the answers and completes the attempt in one unit of work.
    /// Fails with `AppError::Conflict` (and records nothing) if the attempt
    /// was already completed.
    async fn complete_mock_attempt(
        &self,
        attempt_id: &str,
        answers: Vec<NewMockAnswer>,
        outcome: AttemptOutcome,
    ) -> Result<MockExamAttempt, AppError>;

    /// Latest attempts of a user on mock exams of a certification, newest first.
    async fn recent_mock_attempts(
        &self,
        user_id: &str,
        certification_id: &str,
        limit: i64,
    ) -> Result<Vec<MockAttemptWithExam>, AppError>;
}

/// Everything the application needs from persistence.
pub trait Store: UserStore + CatalogStore + ContentStore + SubmissionStore {}

impl<T> Store for T where T: UserStore + CatalogStore + ContentStore + SubmissionStore {}

/// Fresh opaque identifier for a new row.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn attempt_already_completed() -> AppError {
    AppError::Conflict("Mock exam attempt already submitted".to_string())
}

pub(crate) fn email_taken() -> AppError {
    AppError::Conflict("Email already registered".to_string())
}
