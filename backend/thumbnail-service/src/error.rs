/// Error types for the thumbnail service
///
/// `AppError` is returned by the upload/listing path and converted to HTTP
/// responses. `JobError` is the failure taxonomy of a single thumbnail job
/// invocation; it is logged by the job handler and never leaves it.
/// `StorageError` is what the blob and metadata adapters report.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;
use thiserror::Error;

/// Result type for upload/listing operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Database operation failed
    DatabaseError(String),

    /// Blob storage operation failed
    StorageError(String),

    /// Publishing to the job queue failed
    QueueError(String),

    /// Resource not found
    NotFound(String),

    /// Bad request (invalid image, unsafe name, ...)
    BadRequest(String),

    /// Internal server error
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            AppError::QueueError(msg) => write!(f, "Queue error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_)
            | AppError::StorageError(_)
            | AppError::QueueError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_type = match self {
            AppError::DatabaseError(_)
            | AppError::StorageError(_)
            | AppError::QueueError(_)
            | AppError::Internal(_) => "server_error",
            AppError::NotFound(_) => "not_found_error",
            AppError::BadRequest(_) => "validation_error",
        };

        HttpResponse::build(status).json(serde_json::json!({
            "error": error_type,
            "message": self.to_string(),
            "status": status.as_u16(),
        }))
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Database(e) => AppError::DatabaseError(e.to_string()),
            other => AppError::StorageError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Errors reported by the blob and metadata store adapters
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed at startup
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The store refused the operation (invalid name, injected failure, ...)
    #[error("{0}")]
    Rejected(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Failure of a single thumbnail job invocation
///
/// Every variant is terminal for the invocation that produced it. The job
/// was acknowledged before processing started, so none of these are retried.
#[derive(Error, Debug)]
pub enum JobError {
    /// Fetching or decoding the job envelope failed
    #[error("queue error: {0}")]
    Queue(String),

    /// The source blob could not be opened or read as an image
    #[error("failed to decode source image {path}: {reason}")]
    Decode { path: String, reason: String },

    /// The thumbnail bytes could not be produced
    #[error("failed to encode thumbnail for {path}: {reason}")]
    Encode { path: String, reason: String },

    /// Blob write or metadata insert failed
    #[error("failed to persist thumbnail for {path}: {reason}")]
    Persistence { path: String, reason: String },
}

impl JobError {
    /// Pipeline stage the error belongs to, used as a log field and metric label
    pub fn stage(&self) -> &'static str {
        match self {
            JobError::Queue(_) => "queue",
            JobError::Decode { .. } => "decode",
            JobError::Encode { .. } => "encode",
            JobError::Persistence { .. } => "persistence",
        }
    }

    /// Job path the failure belongs to, when a job had been received
    pub fn path(&self) -> Option<&str> {
        match self {
            JobError::Queue(_) => None,
            JobError::Decode { path, .. }
            | JobError::Encode { path, .. }
            | JobError::Persistence { path, .. } => Some(path),
        }
    }
}

impl From<redis::RedisError> for JobError {
    fn from(err: redis::RedisError) -> Self {
        JobError::Queue(err.to_string())
    }
}

impl From<serde_json::Error> for JobError {
    fn from(err: serde_json::Error) -> Self {
        JobError::Queue(format!("malformed job payload: {err}"))
    }
}
