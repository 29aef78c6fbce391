// src/handlers/mod.rs

pub mod auth;
pub mod certification;
pub mod exam;
pub mod health;
