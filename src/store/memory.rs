// src/store/memory.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use tokio::sync::RwLock;

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
            AttemptOutcome, MockAttemptWithExam, MockExam, MockExamAnswer, MockExamAttempt,
            NewMockAnswer, NewMockAttempt, NewMockExam,
        },
        question::{NewQuestion, Question, QuestionOption, QuestionWithOptions},
        submission::{NewQuizSubmission, QuizSubmission},
        user::{NewUser, User},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    certifications: Vec<Certification>,
    topics: Vec<Topic>,
    questions: Vec<Question>,
    options: Vec<QuestionOption>,
    study_materials: Vec<StudyMaterial>,
    dumps: Vec<ExamDump>,
    dump_questions: Vec<DumpQuestion>,
    mock_exams: Vec<MockExam>,
    quiz_submissions: Vec<QuizSubmission>,
    attempts: Vec<MockExamAttempt>,
    answers: Vec<MockExamAnswer>,
}

impl Tables {
    fn with_options(&self, question: &Question) -> QuestionWithOptions {
        let mut options: Vec<QuestionOption> = self
            .options
            .iter()
            .filter(|o| o.question_id == question.id)
            .cloned()
            .collect();
        options.sort_by_key(|o| o.order_index);
        QuestionWithOptions {
            question: question.clone(),
            options,
        }
    }

    fn dump_questions_of(&self, dump_id: &str) -> Vec<DumpQuestion> {
        let mut questions: Vec<DumpQuestion> = self
            .dump_questions
            .iter()
            .filter(|q| q.dump_id == dump_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order_index);
        questions
    }
}

/// In-process store with the same observable ordering rules as `PgStore`.
/// Used by the test suite; state is lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer rows recorded for an attempt.
    pub async fn mock_answers(&self, attempt_id: &str) -> Vec<MockExamAnswer> {
        let tables = self.tables.read().await;
        tables
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect()
    }
}

/// Keeps newest-first listings deterministic when timestamps collide.
fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> DateTime<Utc>) {
    rows.reverse();
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == new_user.email) {
            return Err(email_taken());
        }

        let user = User {
            id: new_id(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            role: new_user.role,
            is_active: true,
            email_verified: false,
            last_login: None,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.last_login = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_certifications(&self, name: Option<&str>) -> Result<Vec<Certification>, AppError> {
        let tables = self.tables.read().await;
        let mut certifications: Vec<Certification> = tables
            .certifications
            .iter()
            .filter(|c| c.is_active && name.is_none_or(|n| c.name == n))
            .cloned()
            .collect();
        certifications.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(certifications)
    }

    async fn find_certification(&self, id: &str) -> Result<Option<Certification>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .certifications
            .iter()
            .find(|c| c.id == id && c.is_active)
            .cloned())
    }

    async fn list_topics(&self, certification_id: &str) -> Result<Vec<Topic>, AppError> {
        let tables = self.tables.read().await;
        let mut topics: Vec<Topic> = tables
            .topics
            .iter()
            .filter(|t| t.certification_id == certification_id && t.is_active)
            .cloned()
            .collect();
        topics.sort_by_key(|t| t.order_index);
        Ok(topics)
    }

    async fn insert_certification(
        &self,
        certification: NewCertification,
        topics: Vec<NewTopic>,
    ) -> Result<(Certification, Vec<Topic>), AppError> {
        let mut tables = self.tables.write().await;

        let created = Certification {
            id: new_id(),
            name: certification.name,
            description: certification.description,
            passing_score: certification.passing_score,
            duration_minutes: certification.duration_minutes,
            total_questions: certification.total_questions,
            is_active: true,
            created_at: Utc::now(),
        };

        let mut created_topics: Vec<Topic> = topics
            .into_iter()
            .map(|topic| Topic {
                id: new_id(),
                certification_id: created.id.clone(),
                name: topic.name,
                description: topic.description,
                order_index: topic.order_index,
                is_active: true,
            })
            .collect();
        created_topics.sort_by_key(|t| t.order_index);

        tables.certifications.push(created.clone());
        tables.topics.extend(created_topics.iter().cloned());
        Ok((created, created_topics))
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list_quiz_questions(
        &self,
        certification_id: &str,
        limit: i64,
    ) -> Result<Vec<QuestionWithOptions>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .iter()
            .filter(|q| q.certification_id == certification_id && q.is_active)
            .take(limit.max(0) as usize)
            .map(|q| tables.with_options(q))
            .collect())
    }

    async fn find_questions(&self, ids: &[String]) -> Result<Vec<QuestionWithOptions>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .iter()
            .filter(|q| ids.contains(&q.id))
            .map(|q| tables.with_options(q))
            .collect())
    }

    async fn count_quiz_questions(&self, certification_id: &str) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .iter()
            .filter(|q| q.certification_id == certification_id && q.is_active)
            .count() as i64)
    }

    async fn insert_question(&self, question: NewQuestion) -> Result<QuestionWithOptions, AppError> {
        let mut tables = self.tables.write().await;

        let created = Question {
            id: new_id(),
            certification_id: question.certification_id,
            topic_id: question.topic_id,
            question_text: question.question_text,
            question_type: question.question_type,
            difficulty: question.difficulty,
            explanation: question.explanation,
            is_active: true,
            created_at: Utc::now(),
        };

        let options: Vec<QuestionOption> = question
            .options
            .into_iter()
            .enumerate()
            .map(|(index, option)| QuestionOption {
                id: new_id(),
                question_id: created.id.clone(),
                answer_text: option.answer_text,
                is_correct: option.is_correct,
                order_index: index as i32,
            })
            .collect();

        tables.questions.push(created.clone());
        tables.options.extend(options.iter().cloned());
        Ok(QuestionWithOptions {
            question: created,
            options,
        })
    }

    async fn list_study_materials(&self, certification_id: &str) -> Result<Vec<StudyMaterial>, AppError> {
        let tables = self.tables.read().await;
        let mut materials: Vec<StudyMaterial> = tables
            .study_materials
            .iter()
            .filter(|m| m.certification_id == certification_id && m.is_active)
            .cloned()
            .collect();
        newest_first(&mut materials, |m| m.created_at);
        Ok(materials)
    }

    async fn insert_study_material(&self, material: NewStudyMaterial) -> Result<StudyMaterial, AppError> {
        let mut tables = self.tables.write().await;
        let created = StudyMaterial {
            id: new_id(),
            certification_id: material.certification_id,
            title: material.title,
            url: material.url,
            material_type: material.material_type,
            description: material.description,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.study_materials.push(created.clone());
        Ok(created)
    }

    async fn list_dumps(
        &self,
        certification_id: &str,
        preview: i64,
    ) -> Result<Vec<ExamDumpWithPreview>, AppError> {
        let tables = self.tables.read().await;
        let mut dumps: Vec<ExamDump> = tables
            .dumps
            .iter()
            .filter(|d| d.certification_id == certification_id && d.is_active)
            .cloned()
            .collect();
        newest_first(&mut dumps, |d| d.created_at);

        Ok(dumps
            .into_iter()
            .map(|dump| {
                let dump_questions = tables
                    .dump_questions_of(&dump.id)
                    .into_iter()
                    .take(preview.max(0) as usize)
                    .collect();
                ExamDumpWithPreview {
                    dump,
                    dump_questions,
                }
            })
            .collect())
    }

    async fn find_dump(&self, dump_id: &str) -> Result<Option<ExamDump>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.dumps.iter().find(|d| d.id == dump_id).cloned())
    }

    async fn list_dump_questions(
        &self,
        dump_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<DumpQuestion>, i64), AppError> {
        let tables = self.tables.read().await;
        let all = tables.dump_questions_of(dump_id);
        let total = all.len() as i64;
        let page = all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn insert_dump(
        &self,
        dump: NewExamDump,
        questions: Vec<NewDumpQuestion>,
    ) -> Result<ExamDump, AppError> {
        let mut tables = self.tables.write().await;
        let created = ExamDump {
            id: new_id(),
            certification_id: dump.certification_id,
            title: dump.title,
            description: dump.description,
            is_active: true,
            created_at: Utc::now(),
        };

        let rows: Vec<DumpQuestion> = questions
            .into_iter()
            .map(|q| DumpQuestion {
                id: new_id(),
                dump_id: created.id.clone(),
                question_text: q.question_text,
                options: Json(q.options),
                correct_answer: q.correct_answer,
                explanation: q.explanation,
                order_index: q.order_index,
            })
            .collect();

        tables.dumps.push(created.clone());
        tables.dump_questions.extend(rows);
        Ok(created)
    }

    async fn list_mock_exams(&self, certification_id: &str) -> Result<Vec<MockExam>, AppError> {
        let tables = self.tables.read().await;
        let mut exams: Vec<MockExam> = tables
            .mock_exams
            .iter()
            .filter(|m| m.certification_id == certification_id && m.is_active)
            .cloned()
            .collect();
        newest_first(&mut exams, |m| m.created_at);
        Ok(exams)
    }

    async fn find_mock_exam(&self, id: &str) -> Result<Option<MockExam>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.mock_exams.iter().find(|m| m.id == id).cloned())
    }

    async fn insert_mock_exam(&self, mock_exam: NewMockExam) -> Result<MockExam, AppError> {
        let mut tables = self.tables.write().await;
        let created = MockExam {
            id: new_id(),
            certification_id: mock_exam.certification_id,
            name: mock_exam.name,
            total_questions: mock_exam.total_questions,
            duration_minutes: mock_exam.duration_minutes,
            passing_score: mock_exam.passing_score,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.mock_exams.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn insert_quiz_submission(&self, submission: NewQuizSubmission) -> Result<QuizSubmission, AppError> {
        let mut tables = self.tables.write().await;
        let created = QuizSubmission {
            id: new_id(),
            user_id: submission.user_id,
            certification_id: submission.certification_id,
            total_questions: submission.total_questions,
            correct_answers: submission.correct_answers,
            score: submission.score,
            passed: submission.passed,
            submitted_at: Utc::now(),
        };
        tables.quiz_submissions.push(created.clone());
        Ok(created)
    }

    async fn recent_quiz_submissions(
        &self,
        user_id: &str,
        certification_id: &str,
        limit: i64,
    ) -> Result<Vec<QuizSubmission>, AppError> {
        let tables = self.tables.read().await;
        let mut submissions: Vec<QuizSubmission> = tables
            .quiz_submissions
            .iter()
            .filter(|s| s.user_id == user_id && s.certification_id == certification_id)
            .cloned()
            .collect();
        newest_first(&mut submissions, |s| s.submitted_at);
        submissions.truncate(limit.max(0) as usize);
        Ok(submissions)
    }

    async fn insert_mock_attempt(&self, attempt: NewMockAttempt) -> Result<MockExamAttempt, AppError> {
        let mut tables = self.tables.write().await;
        let created = MockExamAttempt {
            id: new_id(),
            user_id: attempt.user_id,
            mock_exam_id: attempt.mock_exam_id,
            total_questions: attempt.total_questions,
            correct_answers: 0,
            score: None,
            passed: None,
            started_at: Utc::now(),
            completed_at: None,
            time_taken_seconds: None,
        };
        tables.attempts.push(created.clone());
        Ok(created)
    }

    async fn find_mock_attempt(&self, id: &str) -> Result<Option<MockExamAttempt>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.attempts.iter().find(|a| a.id == id).cloned())
    }

    async fn complete_mock_attempt(
        &self,
        attempt_id: &str,
        answers: Vec<NewMockAnswer>,
        outcome: AttemptOutcome,
    ) -> Result<MockExamAttempt, AppError> {
        // Both writes happen under one write guard.
        let mut tables = self.tables.write().await;

        let attempt = tables
            .attempts
            .iter_mut()
            .find(|a| a.id == attempt_id)
            .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;
        if attempt.is_completed() {
            return Err(attempt_already_completed());
        }

        attempt.completed_at = Some(outcome.completed_at);
        attempt.correct_answers = outcome.correct_answers;
        attempt.score = Some(outcome.score);
        attempt.passed = Some(outcome.passed);
        attempt.time_taken_seconds = Some(outcome.time_taken_seconds);
        let completed = attempt.clone();

        tables.answers.extend(answers.into_iter().map(|answer| MockExamAnswer {
            id: new_id(),
            attempt_id: attempt_id.to_string(),
            question_id: answer.question_id,
            selected_answer: answer.selected_answer,
            time_spent_seconds: answer.time_spent_seconds,
        }));

        Ok(completed)
    }

    async fn recent_mock_attempts(
        &self,
        user_id: &str,
        certification_id: &str,
        limit: i64,
    ) -> Result<Vec<MockAttemptWithExam>, AppError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<MockAttemptWithExam> = tables
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id)
            .filter_map(|attempt| {
                let mock_exam = tables
                    .mock_exams
                    .iter()
                    .find(|m| m.id == attempt.mock_exam_id && m.certification_id == certification_id)?;
                Some(MockAttemptWithExam {
                    attempt: attempt.clone(),
                    mock_exam: mock_exam.clone(),
                })
            })
            .collect();
        newest_first(&mut rows, |r| r.attempt.started_at);
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{question::NewOption, user::Role};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            first_name: None,
            last_name: None,
            role: Role::User,
        }
    }

    fn certification(name: &str) -> NewCertification {
        NewCertification {
            name: name.to_string(),
            description: None,
            passing_score: 70,
            duration_minutes: 120,
            total_questions: 50,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert_user(new_user("a@b.com")).await.unwrap();
        let err = store.insert_user(new_user("a@b.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        // Case-sensitive as stored.
        assert!(store.insert_user(new_user("A@b.com")).await.is_ok());
    }

    #[tokio::test]
    async fn certifications_are_sorted_and_filterable_by_name() {
        let store = MemoryStore::new();
        store.insert_certification(certification("PMP"), vec![]).await.unwrap();
        store.insert_certification(certification("Azure Administrator"), vec![]).await.unwrap();
        store.insert_certification(certification("PMP"), vec![]).await.unwrap();

        let all = store.list_certifications(None).await.unwrap();
        let names: Vec<&str> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Azure Administrator", "PMP", "PMP"]);

        let pmp = store.list_certifications(Some("PMP")).await.unwrap();
        assert_eq!(pmp.len(), 2);
    }

    #[tokio::test]
    async fn topics_follow_order_index() {
        let store = MemoryStore::new();
        let topic = |name: &str, order_index| NewTopic {
            name: name.to_string(),
            description: None,
            order_index,
        };
        let (cert, _) = store
            .insert_certification(
                certification("AWS"),
                vec![topic("S3", 2), topic("EC2", 1), topic("RDS", 3)],
            )
            .await
            .unwrap();
        let topics = store.list_topics(&cert.id).await.unwrap();
        let names: Vec<&str> = topics.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["EC2", "S3", "RDS"]);
        assert!(topics.iter().all(|t| t.certification_id == cert.id));
    }

    #[tokio::test]
    async fn questions_are_fetched_with_ordered_options() {
        let store = MemoryStore::new();
        let (cert, _) = store.insert_certification(certification("AWS"), vec![]).await.unwrap();
        let created = store
            .insert_question(NewQuestion {
                certification_id: cert.id.clone(),
                topic_id: None,
                question_text: "What does EC2 stand for?".to_string(),
                question_type: "MULTIPLE_CHOICE".to_string(),
                difficulty: "EASY".to_string(),
                explanation: None,
                options: vec![
                    NewOption { answer_text: "Elastic Compute Cloud".to_string(), is_correct: true },
                    NewOption { answer_text: "Elastic Container Cloud".to_string(), is_correct: false },
                ],
            })
            .await
            .unwrap();

        let found = store
            .find_questions(&[created.question.id.clone(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].options.len(), 2);
        assert_eq!(found[0].options[0].order_index, 0);
        assert_eq!(
            found[0].correct_option().map(|o| o.answer_text.as_str()),
            Some("Elastic Compute Cloud")
        );
        assert_eq!(store.count_quiz_questions(&cert.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn attempt_completes_only_once() {
        let store = MemoryStore::new();
        let attempt = store
            .insert_mock_attempt(NewMockAttempt {
                user_id: "u".to_string(),
                mock_exam_id: "m".to_string(),
                total_questions: 2,
            })
            .await
            .unwrap();
        assert_eq!(attempt.correct_answers, 0);

        let outcome = AttemptOutcome {
            correct_answers: 1,
            score: 50.0,
            passed: false,
            completed_at: Utc::now(),
            time_taken_seconds: 30,
        };
        let answer = NewMockAnswer {
            question_id: "q1".to_string(),
            selected_answer: Some("o1".to_string()),
            time_spent_seconds: 12,
        };

        let done = store
            .complete_mock_attempt(&attempt.id, vec![answer.clone()], outcome.clone())
            .await
            .unwrap();
        assert!(done.is_completed());
        assert_eq!(done.score, Some(50.0));

        let err = store
            .complete_mock_attempt(&attempt.id, vec![answer], outcome)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.mock_answers(&attempt.id).await.len(), 1);
    }
}
