// src/services/catalog.rs

use std::sync::Arc;

use crate::{
    error::AppError,
    models::certification::{
        Certification, CertificationDetail, CertificationOverview, CreateCertificationRequest,
        NewCertification, NewTopic,
    },
    store::Store,
    utils::html::{clean_html, clean_optional},
};

/// Read-mostly access to certifications and their topics.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, name: Option<&str>) -> Result<Vec<Certification>, AppError> {
        self.store.list_certifications(name).await
    }

    /// Active certification with its active topics. Inactive counts as missing.
    pub async fn detail(&self, id: &str) -> Result<CertificationDetail, AppError> {
        let certification = self
            .store
            .find_certification(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Certification not found".to_string()))?;
        let topics = self.store.list_topics(&certification.id).await?;

        Ok(CertificationDetail {
            certification,
            topics,
        })
    }

    /// Detail plus content counts, as shown on the certification landing tab.
    pub async fn overview(&self, id: &str) -> Result<CertificationOverview, AppError> {
        let detail = self.detail(id).await?;
        let cert_id = detail.certification.id.as_str();

        let quiz_question_count = self.store.count_quiz_questions(cert_id).await?;
        let dump_count = self.store.list_dumps(cert_id, 0).await?.len() as i64;
        let mock_exam_count = self.store.list_mock_exams(cert_id).await?.len() as i64;

        Ok(CertificationOverview {
            detail,
            quiz_question_count,
            dump_count,
            mock_exam_count,
        })
    }

    /// Creates a certification and its topics. Topics without an explicit
    /// `order_index` keep their position in the request.
    pub async fn create(&self, req: CreateCertificationRequest) -> Result<CertificationDetail, AppError> {
        let name = clean_html(&req.name);
        if name.is_empty() {
            return Err(AppError::Validation("name: must not be empty".to_string()));
        }

        let certification = NewCertification {
            name,
            description: clean_optional(req.description.as_deref()),
            passing_score: req.passing_score,
            duration_minutes: req.duration_minutes,
            total_questions: req.total_questions,
        };

        let topics = req
            .topics
            .into_iter()
            .enumerate()
            .map(|(position, topic)| NewTopic {
                name: clean_html(&topic.name),
                description: clean_optional(topic.description.as_deref()),
                order_index: topic.order_index.unwrap_or(position as i32 + 1),
            })
            .collect();

        let (certification, topics) = self.store.insert_certification(certification, topics).await?;
        tracing::info!(certification_id = %certification.id, name = %certification.name, "certification created");

        Ok(CertificationDetail {
            certification,
            topics,
        })
    }
}
