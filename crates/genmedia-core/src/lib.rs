//! Core domain types for genmedia
//!
//! Shared building blocks used by the storage, gateway, and MCP crates:
//! the artifact metadata model, generation configuration with defaulting
//! and validation, error types, and environment configuration.

pub mod config;
pub mod error;
pub mod models;

pub use config::AppConfig;
pub use error::ValidationError;
