//! Forge Coach - Manuscript Coaching Engine
//!
//! A Rust library that observes prose and answers craft questions for
//! authors working on a manuscript, without ever rewriting their text.
//!
//! # Features
//!
//! - Passage analysis and craft Q&A through an external language model
//! - Quantitative prose "temperature" metrics computed locally
//! - Per-tier daily quota with usage reporting
//! - Interaction log with acknowledge/dismiss/flag follow-ups
//! - Per-project style profiles that ground every prompt

/// External model client
pub mod client;
/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Error taxonomy
pub mod error;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Prompt synthesis
pub mod prompt;
/// Quota policy
pub mod quota;
/// Repository pattern for data access
pub mod repository;
/// Database schema definitions
pub mod schema;
/// Coaching orchestrator and interaction lifecycle
pub mod service;
/// Prose metrics analyzer
pub mod temperature;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use client::{ClaudeClient, CompletionClient};
pub use db::Database;
pub use error::{CoachError, Result};
pub use models::{FocusArea, Intensity, Interaction, StyleContext, SubscriptionTier};
pub use repository::{CoachingRepository, SqliteRepository};
pub use service::CoachingService;
pub use temperature::{TemperatureAnalyzer, TemperatureMetrics};
