use thiserror::Error;

use crate::session::SessionError;

pub type Result<T> = std::result::Result<T, CareError>;

/// Every failure a user-facing action can produce. None of these end the
/// session; the driver reports them and lets the user try again.
#[derive(Debug, Error)]
pub enum CareError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("username '{0}' already exists")]
    UsernameTaken(String),

    #[error("username and password are required")]
    MissingCredentials,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    #[error("prediction failed: {0}")]
    ModelInvocation(String),

    #[error("storage error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Navigation(#[from] SessionError),
}

impl CareError {
    pub fn category(&self) -> &'static str {
        match self {
            CareError::InvalidCredentials
            | CareError::UsernameTaken(_)
            | CareError::MissingCredentials
            | CareError::PasswordHash(_) => "auth",
            CareError::DataIntegrity(_) => "data_integrity",
            CareError::ModelInvocation(_) => "model_invocation",
            CareError::Persistence(_) | CareError::Migration(_) => "persistence",
            CareError::Navigation(_) => "navigation",
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        CareError::DataIntegrity(message.into())
    }

    pub fn model(message: impl Into<String>) -> Self {
        CareError::ModelInvocation(message.into())
    }
}
