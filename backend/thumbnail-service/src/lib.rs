//! Thumbnail Service
//!
//! Accepts uploaded images, persists them, and produces a resized PNG
//! thumbnail for each one in the background. Uploads publish a job onto a
//! work queue; a fixed pool of polling workers pulls those jobs and runs the
//! thumbnail pipeline.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod queue;
pub mod services;
pub mod storage;
pub mod telemetry;
pub mod worker;

// Public re-exports
pub use config::Config;
pub use error::{AppError, JobError, Result};
