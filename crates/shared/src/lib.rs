//! Shared types, errors, and configuration for Tallybook.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Limit/offset pagination for list and report queries
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
