// src/services/mod.rs

pub mod auth;
pub mod catalog;
pub mod exams;
pub mod grading;

pub use auth::AuthService;
pub use catalog::CatalogService;
pub use exams::ExamService;
