use crate::db::errors::DbError;
use crate::registry::{EnrollmentError, ImportError};
use crate::types::{Operation, Permission};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// User lacks required permissions for the operation
    #[error("Insufficient permissions to {action:?} {resource}")]
    InsufficientPermissions {
        required: Permission,
        action: Operation,
        resource: String,
    },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// The school has never imported a registry
    #[error("No registry imported for this school")]
    NoRegistry,

    /// The declared child matches no registry student. Deliberately vague.
    #[error("Child identity does not match school records")]
    IdentityMismatch,

    /// Conflict error, e.g. a registry student already linked to a parent
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Uploaded file exceeds the configured size limit
    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },

    /// A registry upload produced no storable rows
    #[error("{message}")]
    ImportRejected {
        message: String,
        invalid_count: usize,
        duplicate_count: usize,
    },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } | Error::ImportRejected { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } | Error::NoRegistry | Error::IdentityMismatch => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::InsufficientPermissions { action, resource, .. } => {
                format!("Insufficient permissions to {action} {resource}")
            }
            Error::BadRequest { message } | Error::PayloadTooLarge { message } | Error::ImportRejected { message, .. } => {
                message.clone()
            }
            Error::NotFound { resource, id } => {
                format!("{resource} with ID {id} not found")
            }
            Error::NoRegistry | Error::IdentityMismatch => self.to_string(),
            Error::Conflict { message } => message.clone(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { .. } => "Resource already exists".to_string(),
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::InsufficientPermissions { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. }
            | Error::NotFound { .. }
            | Error::NoRegistry
            | Error::IdentityMismatch
            | Error::PayloadTooLarge { .. }
            | Error::ImportRejected { .. } => {
                tracing::debug!("Client error: {}", self);
            }
            Error::Conflict { .. } => {
                tracing::warn!("Conflict error: {}", self);
            }
        }

        let status = self.status_code();

        match &self {
            Error::ImportRejected {
                message,
                invalid_count,
                duplicate_count,
            } => {
                let body = json!({
                    "message": message,
                    "invalid_count": invalid_count,
                    "duplicate_count": duplicate_count,
                });
                (status, Json(body)).into_response()
            }
            Error::Conflict { message } => (status, Json(json!({ "message": message }))).into_response(),
            _ => (status, self.user_message()).into_response(),
        }
    }
}

impl From<ImportError> for Error {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::UnsupportedFormat { file_name } => Error::BadRequest {
                message: format!("Unsupported file type: {file_name}. Upload a PDF, CSV or Excel file."),
            },
            ImportError::SchoolNotFound(id) => Error::NotFound {
                resource: "School".to_string(),
                id: id.to_string(),
            },
            ImportError::NoValidData { invalid_count } => Error::ImportRejected {
                message: "No valid student rows found in the file".to_string(),
                invalid_count,
                duplicate_count: 0,
            },
            ImportError::NoValidRowsAfterNormalization {
                invalid_count,
                duplicate_count,
            } => Error::ImportRejected {
                message: "No valid student rows remain after normalization".to_string(),
                invalid_count,
                duplicate_count,
            },
            ImportError::Database(db_err) => Error::Database(db_err),
            err @ (ImportError::Extraction(_) | ImportError::Task(_)) => {
                Error::Other(anyhow::Error::new(err).context("registry import failed"))
            }
        }
    }
}

impl From<EnrollmentError> for Error {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::MissingField(_) | EnrollmentError::InvalidBirthDate(_) => Error::BadRequest { message: err.to_string() },
            EnrollmentError::NoRegistry => Error::NoRegistry,
            EnrollmentError::NoMatch => Error::IdentityMismatch,
            EnrollmentError::AlreadyLinked => Error::Conflict {
                message: "Student already linked to a parent".to_string(),
            },
            EnrollmentError::CorruptRegistryRow(_) => Error::Other(anyhow::Error::new(err)),
            EnrollmentError::Database(db_err) => Error::Database(db_err),
        }
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrollment_errors_map_to_distinct_statuses() {
        assert_eq!(Error::from(EnrollmentError::NoMatch).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::from(EnrollmentError::NoRegistry).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::from(EnrollmentError::AlreadyLinked).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            Error::from(EnrollmentError::MissingField("first_name")).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_no_match_message_is_generic() {
        let message = Error::from(EnrollmentError::NoMatch).user_message();
        assert_eq!(message, "Child identity does not match school records");
    }

    #[test]
    fn test_import_errors() {
        let err = Error::from(ImportError::NoValidRowsAfterNormalization {
            invalid_count: 3,
            duplicate_count: 2,
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(matches!(
            err,
            Error::ImportRejected {
                invalid_count: 3,
                duplicate_count: 2,
                ..
            }
        ));

        let err = Error::from(ImportError::Task("panicked".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Internal server error");
    }

    #[test]
    fn test_database_errors() {
        let err = Error::Database(DbError::UniqueViolation {
            constraint: None,
            table: None,
            message: "dup".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(Error::Database(DbError::NotFound).status_code(), StatusCode::NOT_FOUND);
    }
}
