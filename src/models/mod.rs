//! Core data models for the book catalog service.
//!
//! These entities represent the logical structure of catalog records. They
//! map cleanly to database tables via `sqlx::FromRow` and serialize
//! naturally as JSON via `serde`.

pub mod book;
