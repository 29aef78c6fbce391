// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use super::{
    CatalogStore, ContentStore, SubmissionStore, UserStore, attempt_already_completed,
    email_taken, new_id,
};
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
        question::{NewQuestion, Question, QuestionOption, QuestionWithOptions},
        submission::{NewQuizSubmission, QuizSubmission},
        user::{NewUser, User},
    },
};

/// Postgres-backed store. Owns a handle to the shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded migrations in `./migrations`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Loads the options of `questions` in a single query and attaches them.
    async fn attach_options(&self, questions: Vec<Question>) -> Result<Vec<QuestionWithOptions>, AppError> {
        if questions.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();
        let options = sqlx::query_as::<_, QuestionOption>(
            r#"
            SELECT id, question_id, answer_text, is_correct, order_index
            FROM question_options
            WHERE question_id = ANY($1)
            ORDER BY question_id, order_index, id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_question: HashMap<String, Vec<QuestionOption>> = HashMap::new();
        for option in options {
            by_question.entry(option.question_id.clone()).or_default().push(option);
        }

        Ok(questions
            .into_iter()
            .map(|question| {
                let options = by_question.remove(&question.id).unwrap_or_default();
                QuestionWithOptions { question, options }
            })
            .collect())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.first_name.as_deref())
        .bind(new_user.last_name.as_deref())
        .bind(new_user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                email_taken()
            } else {
                tracing::error!("Failed to insert user: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_certifications(&self, name: Option<&str>) -> Result<Vec<Certification>, AppError> {
        let certifications = sqlx::query_as::<_, Certification>(
            r#"
            SELECT * FROM certifications
            WHERE is_active = TRUE
              AND ($1::TEXT IS NULL OR name = $1)
            ORDER BY name ASC
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;
        Ok(certifications)
    }

    async fn find_certification(&self, id: &str) -> Result<Option<Certification>, AppError> {
        let certification = sqlx::query_as::<_, Certification>(
            "SELECT * FROM certifications WHERE id = $1 AND is_active = TRUE",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(certification)
    }

    async fn list_topics(&self, certification_id: &str) -> Result<Vec<Topic>, AppError> {
        let topics = sqlx::query_as::<_, Topic>(
            r#"
            SELECT * FROM topics
            WHERE certification_id = $1 AND is_active = TRUE
            ORDER BY order_index ASC, id ASC
            "#,
        )
        .bind(certification_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(topics)
    }

    async fn insert_certification(
        &self,
        certification: NewCertification,
        topics: Vec<NewTopic>,
    ) -> Result<(Certification, Vec<Topic>), AppError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Certification>(
            r#"
            INSERT INTO certifications (id, name, description, passing_score, duration_minutes, total_questions)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&certification.name)
        .bind(certification.description.as_deref())
        .bind(certification.passing_score)
        .bind(certification.duration_minutes)
        .bind(certification.total_questions)
        .fetch_one(&mut *tx)
        .await?;

        let mut created_topics = Vec::with_capacity(topics.len());
        for topic in topics {
            let row = sqlx::query_as::<_, Topic>(
                r#"
                INSERT INTO topics (id, certification_id, name, description, order_index)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(new_id())
            .bind(&created.id)
            .bind(&topic.name)
            .bind(topic.description.as_deref())
            .bind(topic.order_index)
            .fetch_one(&mut *tx)
            .await?;
            created_topics.push(row);
        }

        tx.commit().await?;
        created_topics.sort_by_key(|t| t.order_index);
        Ok((created, created_topics))
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn list_quiz_questions(
        &self,
        certification_id: &str,
        limit: i64,
    ) -> Result<Vec<QuestionWithOptions>, AppError> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT * FROM questions
            WHERE certification_id = $1 AND is_active = TRUE
            ORDER BY created_at ASC, id ASC
            LIMIT $2
            "#,
        )
        .bind(certification_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.attach_options(questions).await
    }

    async fn find_questions(&self, ids: &[String]) -> Result<Vec<QuestionWithOptions>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let questions = sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;

        self.attach_options(questions).await
    }

    async fn count_quiz_questions(&self, certification_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM questions WHERE certification_id = $1 AND is_active = TRUE",
        )
        .bind(certification_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert_question(&self, question: NewQuestion) -> Result<QuestionWithOptions, AppError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (id, certification_id, topic_id, question_text, type, difficulty, explanation)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&question.certification_id)
        .bind(question.topic_id.as_deref())
        .bind(&question.question_text)
        .bind(&question.question_type)
        .bind(&question.difficulty)
        .bind(question.explanation.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        let mut options = Vec::with_capacity(question.options.len());
        for (index, option) in question.options.into_iter().enumerate() {
            let row = sqlx::query_as::<_, QuestionOption>(
                r#"
                INSERT INTO question_options (id, question_id, answer_text, is_correct, order_index)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, question_id, answer_text, is_correct, order_index
                "#,
            )
            .bind(new_id())
            .bind(&created.id)
            .bind(&option.answer_text)
            .bind(option.is_correct)
            .bind(index as i32)
            .fetch_one(&mut *tx)
            .await?;
            options.push(row);
        }

        tx.commit().await?;
        Ok(QuestionWithOptions {
            question: created,
            options,
        })
    }

    async fn list_study_materials(&self, certification_id: &str) -> Result<Vec<StudyMaterial>, AppError> {
        let materials = sqlx::query_as::<_, StudyMaterial>(
            r#"
            SELECT * FROM study_materials
            WHERE certification_id = $1 AND is_active = TRUE
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .bind(certification_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(materials)
    }

    async fn insert_study_material(&self, material: NewStudyMaterial) -> Result<StudyMaterial, AppError> {
        let created = sqlx::query_as::<_, StudyMaterial>(
            r#"
            INSERT INTO study_materials (id, certification_id, title, url, material_type, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&material.certification_id)
        .bind(&material.title)
        .bind(&material.url)
        .bind(&material.material_type)
        .bind(material.description.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_dumps(
        &self,
        certification_id: &str,
        preview: i64,
    ) -> Result<Vec<ExamDumpWithPreview>, AppError> {
        let dumps = sqlx::query_as::<_, ExamDump>(
            r#"
            SELECT * FROM exam_dumps
            WHERE certification_id = $1 AND is_active = TRUE
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .bind(certification_id)
        .fetch_all(&self.pool)
        .await?;

        if dumps.is_empty() || preview <= 0 {
            return Ok(dumps
                .into_iter()
                .map(|dump| ExamDumpWithPreview {
                    dump,
                    dump_questions: Vec::new(),
                })
                .collect());
        }

        // First `preview` questions of every dump in one round trip.
        let ids: Vec<String> = dumps.iter().map(|d| d.id.clone()).collect();
        let questions = sqlx::query_as::<_, DumpQuestion>(
            r#"
            SELECT id, dump_id, question_text, options, correct_answer, explanation, order_index
            FROM (
                SELECT dq.*,
                       ROW_NUMBER() OVER (PARTITION BY dq.dump_id ORDER BY dq.order_index, dq.id) AS rn
                FROM dump_questions dq
                WHERE dq.dump_id = ANY($1)
            ) ranked
            WHERE rn <= $2
            ORDER BY dump_id, order_index, id
            "#,
        )
        .bind(ids)
        .bind(preview)
        .fetch_all(&self.pool)
        .await?;

        let mut by_dump: HashMap<String, Vec<DumpQuestion>> = HashMap::new();
        for question in questions {
            by_dump.entry(question.dump_id.clone()).or_default().push(question);
        }

        Ok(dumps
            .into_iter()
            .map(|dump| {
                let dump_questions = by_dump.remove(&dump.id).unwrap_or_default();
                ExamDumpWithPreview {
                    dump,
                    dump_questions,
                }
            })
            .collect())
    }

    async fn find_dump(&self, dump_id: &str) -> Result<Option<ExamDump>, AppError> {
        let dump = sqlx::query_as::<_, ExamDump>("SELECT * FROM exam_dumps WHERE id = $1")
            .bind(dump_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(dump)
    }

    async fn list_dump_questions(
        &self,
        dump_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<DumpQuestion>, i64), AppError> {
        let questions = sqlx::query_as::<_, DumpQuestion>(
            r#"
            SELECT * FROM dump_questions
            WHERE dump_id = $1
            ORDER BY order_index ASC, id ASC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(dump_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM dump_questions WHERE dump_id = $1")
            .bind(dump_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((questions, total))
    }

    async fn insert_dump(
        &self,
        dump: NewExamDump,
        questions: Vec<NewDumpQuestion>,
    ) -> Result<ExamDump, AppError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, ExamDump>(
            r#"
            INSERT INTO exam_dumps (id, certification_id, title, description)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&dump.certification_id)
        .bind(&dump.title)
        .bind(dump.description.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        for question in questions {
            sqlx::query(
                r#"
                INSERT INTO dump_questions (id, dump_id, question_text, options, correct_answer, explanation, order_index)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(new_id())
            .bind(&created.id)
            .bind(&question.question_text)
            .bind(Json(&question.options))
            .bind(&question.correct_answer)
            .bind(question.explanation.as_deref())
            .bind(question.order_index)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn list_mock_exams(&self, certification_id: &str) -> Result<Vec<MockExam>, AppError> {
        let exams = sqlx::query_as::<_, MockExam>(
            r#"
            SELECT * FROM mock_exams
            WHERE certification_id = $1 AND is_active = TRUE
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .bind(certification_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    async fn find_mock_exam(&self, id: &str) -> Result<Option<MockExam>, AppError> {
        let exam = sqlx::query_as::<_, MockExam>("SELECT * FROM mock_exams WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(exam)
    }

    async fn insert_mock_exam(&self, mock_exam: NewMockExam) -> Result<MockExam, AppError> {
        let created = sqlx::query_as::<_, MockExam>(
            r#"
            INSERT INTO mock_exams (id, certification_id, name, total_questions, duration_minutes, passing_score)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&mock_exam.certification_id)
        .bind(&mock_exam.name)
        .bind(mock_exam.total_questions)
        .bind(mock_exam.duration_minutes)
        .bind(mock_exam.passing_score)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn insert_quiz_submission(&self, submission: NewQuizSubmission) -> Result<QuizSubmission, AppError> {
        let created = sqlx::query_as::<_, QuizSubmission>(
            r#"
            INSERT INTO quiz_submissions
                (id, user_id, certification_id, total_questions, correct_answers, score, passed)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&submission.user_id)
        .bind(&submission.certification_id)
        .bind(submission.total_questions)
        .bind(submission.correct_answers)
        .bind(submission.score)
        .bind(submission.passed)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert quiz submission: {:?}", e);
            AppError::from(e)
        })?;
        Ok(created)
    }

    async fn recent_quiz_submissions(
        &self,
        user_id: &str,
        certification_id: &str,
        limit: i64,
    ) -> Result<Vec<QuizSubmission>, AppError> {
        let submissions = sqlx::query_as::<_, QuizSubmission>(
            r#"
            SELECT * FROM quiz_submissions
            WHERE user_id = $1 AND certification_id = $2
            ORDER BY submitted_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(certification_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(submissions)
    }

    async fn insert_mock_attempt(&self, attempt: NewMockAttempt) -> Result<MockExamAttempt, AppError> {
        let created = sqlx::query_as::<_, MockExamAttempt>(
            r#"
            INSERT INTO mock_exam_attempts (id, user_id, mock_exam_id, total_questions, correct_answers)
            VALUES ($1, $2, $3, $4, 0)
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&attempt.user_id)
        .bind(&attempt.mock_exam_id)
        .bind(attempt.total_questions)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find_mock_attempt(&self, id: &str) -> Result<Option<MockExamAttempt>, AppError> {
        let attempt = sqlx::query_as::<_, MockExamAttempt>("SELECT * FROM mock_exam_attempts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(attempt)
    }

    async fn complete_mock_attempt(
        &self,
        attempt_id: &str,
        answers: Vec<NewMockAnswer>,
        outcome: AttemptOutcome,
    ) -> Result<MockExamAttempt, AppError> {
        let mut tx = self.pool.begin().await?;

        // Completing first locks the row, so a concurrent resubmission waits and then finds it completed.
        let completed = sqlx::query_as::<_, MockExamAttempt>(
            r#"
            UPDATE mock_exam_attempts
            SET completed_at = $2,
                correct_answers = $3,
                score = $4,
                passed = $5,
                time_taken_seconds = $6
            WHERE id = $1 AND completed_at IS NULL
            RETURNING *
            "#,
        )
        .bind(attempt_id)
        .bind(outcome.completed_at)
        .bind(outcome.correct_answers)
        .bind(outcome.score)
        .bind(outcome.passed)
        .bind(outcome.time_taken_seconds)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(completed) = completed else {
            tx.rollback().await?;
            return Err(attempt_already_completed());
        };

        if !answers.is_empty() {
            let mut query_builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO mock_exam_answers (id, attempt_id, question_id, selected_answer, time_spent_seconds) ",
            );
            query_builder.push_values(answers, |mut row, answer| {
                row.push_bind(new_id())
                    .push_bind(attempt_id.to_string())
                    .push_bind(answer.question_id)
                    .push_bind(answer.selected_answer)
                    .push_bind(answer.time_spent_seconds);
            });
            query_builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(completed)
    }

    async fn recent_mock_attempts(
        &self,
        user_id: &str,
        certification_id: &str,
        limit: i64,
    ) -> Result<Vec<MockAttemptWithExam>, AppError> {
        let attempts = sqlx::query_as::<_, MockExamAttempt>(
            r#"
            SELECT a.*
            FROM mock_exam_attempts a
            JOIN mock_exams m ON m.id = a.mock_exam_id
            WHERE a.user_id = $1 AND m.certification_id = $2
            ORDER BY a.started_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(certification_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        if attempts.is_empty() {
            return Ok(Vec::new());
        }

        let exam_ids: Vec<String> = attempts.iter().map(|a| a.mock_exam_id.clone()).collect();
        let exams: HashMap<String, MockExam> =
            sqlx::query_as::<_, MockExam>("SELECT * FROM mock_exams WHERE id = ANY($1)")
                .bind(exam_ids)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|exam| (exam.id.clone(), exam))
                .collect();

        Ok(attempts
            .into_iter()
            .filter_map(|attempt| {
                let mock_exam = exams.get(&attempt.mock_exam_id)?.clone();
                Some(MockAttemptWithExam { attempt, mock_exam })
            })
            .collect())
    }
}
