// src/services/exams.rs

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;

use crate::{
    config::{DUMP_PREVIEW_SIZE, HISTORY_LIMIT, QUIZ_PASS_PERCENTAGE},
    error::AppError,
    models::{
        certification::Certification,
        content::{DumpQuestion, ExamDumpWithPreview, StudyMaterial},
        mock_exam::{
            AttemptOutcome, MockAttemptWithExam, MockExam, MockExamAttempt, MockExamResult,
            MockExamSummary, NewMockAnswer, NewMockAttempt, SubmitMockExamRequest,
        },
        question::{CreateQuestionRequest, NewOption, NewQuestion, PublicQuestion, QuestionWithOptions},
        response::{PageParams, Pagination},
        submission::{NewQuizSubmission, QuizResult, QuizSubmission, QuizSummary, SubmitQuizRequest},
    },
    services::grading::{grade_mock, grade_quiz, percentage},
    store::{Store, attempt_already_completed},
    utils::html::{clean_html, clean_optional},
};

/// Exam content reads plus quiz and mock exam submissions.
#[derive(Clone)]
pub struct ExamService {
    store: Arc<dyn Store>,
}

impl ExamService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn certification(&self, id: &str) -> Result<Certification, AppError> {
        self.store
            .find_certification(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Certification not found".to_string()))
    }

    /// Quiz questions without the answer key.
    pub async fn quiz_questions(&self, certification_id: &str, limit: i64) -> Result<Vec<PublicQuestion>, AppError> {
        let questions = self.store.list_quiz_questions(certification_id, limit).await?;
        Ok(questions.into_iter().map(PublicQuestion::from).collect())
    }

    /// Grades a quiz and stores an immutable submission.
    ///
    /// The score is taken over the submitted answers, not over the
    /// certification's question count, and the pass mark is fixed.
    pub async fn submit_quiz(&self, user_id: &str, req: SubmitQuizRequest) -> Result<QuizResult, AppError> {
        let certification = self.certification(&req.certification_id).await?;

        let ids: Vec<String> = req.answers.iter().map(|a| a.question_id.clone()).collect();
        let questions = self.store.find_questions(&ids).await?;

        let graded = grade_quiz(&req.answers, &questions);
        let total_questions = req.answers.len() as i32;
        let score = percentage(graded.correct_answers, total_questions);
        let passed = score >= QUIZ_PASS_PERCENTAGE;

        let submission = self
            .store
            .insert_quiz_submission(NewQuizSubmission {
                user_id: user_id.to_string(),
                certification_id: certification.id,
                total_questions,
                correct_answers: graded.correct_answers,
                score,
                passed,
            })
            .await?;

        tracing::info!(
            user_id,
            submission_id = %submission.id,
            score,
            passed,
            "quiz submitted"
        );

        Ok(QuizResult {
            summary: QuizSummary {
                total_questions,
                correct_answers: graded.correct_answers,
                wrong_answers: total_questions - graded.correct_answers,
                score,
                passed,
                pass_percentage: QUIZ_PASS_PERCENTAGE,
            },
            submission,
            details: graded.details,
        })
    }

    pub async fn study_materials(&self, certification_id: &str) -> Result<Vec<StudyMaterial>, AppError> {
        self.store.list_study_materials(certification_id).await
    }

    pub async fn dumps(&self, certification_id: &str) -> Result<Vec<ExamDumpWithPreview>, AppError> {
        self.store.list_dumps(certification_id, DUMP_PREVIEW_SIZE).await
    }

    pub async fn dump_questions(
        &self,
        dump_id: &str,
        params: &PageParams,
    ) -> Result<(Vec<DumpQuestion>, Pagination), AppError> {
        if self.store.find_dump(dump_id).await?.is_none() {
            return Err(AppError::NotFound("Exam dump not found".to_string()));
        }

        let (questions, total) = self
            .store
            .list_dump_questions(dump_id, params.offset(), params.limit())
            .await?;
        Ok((questions, Pagination::new(params.page(), params.limit(), total)))
    }

    pub async fn mock_exams(&self, certification_id: &str) -> Result<Vec<MockExam>, AppError> {
        self.store.list_mock_exams(certification_id).await
    }

    pub async fn mock_exam(&self, mock_exam_id: &str) -> Result<MockExam, AppError> {
        self.store
            .find_mock_exam(mock_exam_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Mock exam not found".to_string()))
    }

    /// Opens a new attempt. Retakes are allowed, every call creates a row.
    pub async fn start_mock(&self, user_id: &str, mock_exam_id: &str) -> Result<MockExamAttempt, AppError> {
        let mock_exam = self.mock_exam(mock_exam_id).await?;
        if !mock_exam.is_active {
            return Err(AppError::NotFound("Mock exam not found".to_string()));
        }

        let attempt = self
            .store
            .insert_mock_attempt(NewMockAttempt {
                user_id: user_id.to_string(),
                mock_exam_id: mock_exam.id,
                total_questions: mock_exam.total_questions,
            })
            .await?;

        tracing::info!(user_id, attempt_id = %attempt.id, "mock exam started");
        Ok(attempt)
    }

    /// Grades and completes an attempt owned by `user_id`.
    ///
    /// The denominator is the attempt's `total_questions`, and the pass mark
    /// is the mock exam's own `passing_score`.
    pub async fn submit_mock(&self, user_id: &str, req: SubmitMockExamRequest) -> Result<MockExamResult, AppError> {
        let attempt = self
            .store
            .find_mock_attempt(&req.attempt_id)
            .await?
            .filter(|a| a.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Mock exam attempt not found".to_string()))?;
        if attempt.is_completed() {
            return Err(attempt_already_completed());
        }

        let mock_exam = self.mock_exam(&attempt.mock_exam_id).await?;

        let ids: Vec<String> = req.answers.iter().map(|a| a.question_id.clone()).collect();
        let questions = self.store.find_questions(&ids).await?;
        let correct_answers = grade_mock(
            &req.answers,
            &questions,
            &mock_exam.certification_id,
            attempt.total_questions,
        );

        let answered = req
            .answers
            .iter()
            .filter(|a| a.selected_answer.is_some())
            .map(|a| a.question_id.as_str())
            .collect::<HashSet<_>>()
            .len()
            .min(attempt.total_questions.max(0) as usize) as i32;

        let score = percentage(correct_answers, attempt.total_questions);
        let passed = score >= f64::from(mock_exam.passing_score);
        let completed_at = Utc::now();
        let time_taken_seconds = (completed_at - attempt.started_at).num_seconds().max(0) as i32;

        let answers = req
            .answers
            .into_iter()
            .map(|a| NewMockAnswer {
                question_id: a.question_id,
                selected_answer: a.selected_answer,
                time_spent_seconds: a.time_spent_seconds.unwrap_or(0),
            })
            .collect();

        let attempt = self
            .store
            .complete_mock_attempt(
                &attempt.id,
                answers,
                AttemptOutcome {
                    correct_answers,
                    score,
                    passed,
                    completed_at,
                    time_taken_seconds,
                },
            )
            .await?;

        tracing::info!(user_id, attempt_id = %attempt.id, score, passed, "mock exam submitted");

        Ok(MockExamResult {
            summary: MockExamSummary {
                total_questions: attempt.total_questions,
                answered,
                correct_answers,
                score,
                passed,
                passing_score: mock_exam.passing_score,
            },
            attempt,
        })
    }

    pub async fn quiz_history(&self, user_id: &str, certification_id: &str) -> Result<Vec<QuizSubmission>, AppError> {
        self.store
            .recent_quiz_submissions(user_id, certification_id, HISTORY_LIMIT)
            .await
    }

    pub async fn mock_history(&self, user_id: &str, certification_id: &str) -> Result<Vec<MockAttemptWithExam>, AppError> {
        self.store
            .recent_mock_attempts(user_id, certification_id, HISTORY_LIMIT)
            .await
    }

    /// Adds a question to a certification's bank. A topic, when given, must
    /// belong to the same certification.
    pub async fn create_question(
        &self,
        certification_id: &str,
        req: CreateQuestionRequest,
    ) -> Result<QuestionWithOptions, AppError> {
        let certification = self.certification(certification_id).await?;

        if let Some(topic_id) = req.topic_id.as_deref() {
            let topics = self.store.list_topics(&certification.id).await?;
            if !topics.iter().any(|t| t.id == topic_id) {
                return Err(AppError::BadRequest(
                    "Topic does not belong to this certification".to_string(),
                ));
            }
        }

        let question_text = clean_html(&req.question_text);
        if question_text.is_empty() {
            return Err(AppError::Validation("question_text: must not be empty".to_string()));
        }

        let question = self
            .store
            .insert_question(NewQuestion {
                certification_id: certification.id,
                topic_id: req.topic_id,
                question_text,
                question_type: req.question_type,
                difficulty: req.difficulty,
                explanation: clean_optional(req.explanation.as_deref()),
                options: req
                    .options
                    .into_iter()
                    .map(|o| NewOption {
                        answer_text: clean_html(&o.answer_text),
                        is_correct: o.is_correct,
                    })
                    .collect(),
            })
            .await?;

        tracing::info!(question_id = %question.question.id, "question created");
        Ok(question)
    }
}
