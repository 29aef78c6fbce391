// src/models/mod.rs

pub mod certification;
pub mod content;
pub mod mock_exam;
pub mod question;
pub mod response;
pub mod submission;
pub mod user;
