//! Disaster Response - Message Classification Pipeline
//!
//! A Rust library for preparing disaster-response messages and training a
//! multi-label classifier over them.
//!
//! # Features
//!
//! - Merge raw message and category CSV files
//! - Expand encoded categories into binary label columns
//! - Persist the cleaned dataset to SQLite with a label manifest
//! - Tokenize, vectorize, and grid-search per-label random forests
//! - Report per-label precision/recall/F1 and save the fitted model

/// Serialized model files
pub mod artifact;
/// Category expansion and deduplication
pub mod cleaner;
/// Configuration management
pub mod config;
/// SQLite persistence of the cleaned dataset
pub mod db;
/// Error types
pub mod error;
/// Train/test split and classification reports
pub mod evaluation;
/// CSV loading and joining
pub mod loader;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Model building and grid search
pub mod model;
/// Data models and structures
pub mod models;
/// Tokenization
pub mod nlp;
/// Database schema definitions
pub mod schema;
/// End-to-end pipeline runs
pub mod service;
/// TF-IDF vectorization
pub mod vectorizer;

// Re-export key components for easier access
pub use db::Database;
pub use error::{PipelineError, Result};
pub use model::{build_model, FittedSearch, GridSearch};
pub use nlp::{LinguisticResources, Tokenizer};
