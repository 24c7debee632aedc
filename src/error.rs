//! Error types for role-signup.

use crate::registration::validate::Rejection;

/// Error from an operation that crosses more than one collaborator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Image host error: {0}")]
    ImageHost(#[from] ImageHostError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Draft store errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Failures talking to the account-creation service.
///
/// These never reach the user directly; the orchestrator folds them into a
/// normalized failure message.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Request to account service failed: {0}")]
    Transport(String),

    #[error("Account service returned an unreadable body (status {status}): {reason}")]
    InvalidBody { status: u16, reason: String },
}

/// Image upload errors.
#[derive(Debug, thiserror::Error)]
pub enum ImageHostError {
    #[error("Image uploads are not configured")]
    NotConfigured,

    #[error("Image upload failed: {0}")]
    UploadFailed(String),

    #[error("Image host response did not contain a URL")]
    MissingUrl,
}

/// Errors raised by the workflow when an operation is not allowed right now.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("A submission is already in progress")]
    SubmissionInFlight,

    #[error("This registration has already been submitted")]
    AlreadySubmitted,

    #[error("{0}")]
    Rejected(#[from] Rejection),
}
