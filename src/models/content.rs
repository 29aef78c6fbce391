// src/models/content.rs
//
// Read-only study content: exam dumps and study materials.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, types::Json};

/// Represents the 'exam_dumps' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExamDump {
    pub id: String,
    pub certification_id: String,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Represents the 'dump_questions' table. Answers are shown, dumps are for study.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DumpQuestion {
    pub id: String,
    pub dump_id: String,
    pub question_text: String,
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub order_index: i32,
}

/// Dump listing entry with the first few questions as a preview.
#[derive(Debug, Clone, Serialize)]
pub struct ExamDumpWithPreview {
    #[serde(flatten)]
    pub dump: ExamDump,
    pub dump_questions: Vec<DumpQuestion>,
}

/// Represents the 'study_materials' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudyMaterial {
    pub id: String,
    pub certification_id: String,
    pub title: String,
    pub url: String,
    /// 'documentation', 'video' or 'article'.
    pub material_type: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewExamDump {
    pub certification_id: String,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewDumpQuestion {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub order_index: i32,
}

#[derive(Debug, Clone)]
pub struct NewStudyMaterial {
    pub certification_id: String,
    pub title: String,
    pub url: String,
    pub material_type: String,
    pub description: Option<String>,
}
