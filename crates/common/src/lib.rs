//! Papershelf Common Library
//!
//! Core of the paper catalog:
//! - DOI normalization and validation
//! - Tag inference graph traversal and automatic paper tagging
//! - Approval workflow for tags, categories and papers
//! - Entity models and repository pattern
//! - Form validation
//! - Error types, configuration and metrics

pub mod approval;
pub mod config;
pub mod db;
pub mod doi;
pub mod errors;
pub mod forms;
pub mod inference;
pub mod metrics;
pub mod services;
pub mod tags;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};
pub use services::CatalogService;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
