//! Book catalog API with remote asset offload.
//!
//! This crate provides:
//! - Dual-asset ingestion: cover image + content file staged locally, then
//!   moved to a remote object store
//! - A SQLite-backed catalog of book metadata referencing the stored assets
//! - The HTTP control plane (create/update/delete/get/list, health)

pub mod assets;
pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod staging;
pub mod state;
pub mod store;

pub use errors::ApiError;
pub use state::AppState;
