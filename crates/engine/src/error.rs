use mcr_storage::StorageError;

use crate::access::DenialReason;
use crate::entity::EntityError;

/// Message for requests missing a required key component.
pub const NO_KEY: &str = "Must provide key for table";
/// Message for access denials.
pub const UNAUTHORIZED: &str = "User is not authorized to access this page.";
/// Message for missing reports, including ones with dangling references.
pub const NO_MATCHING_RECORD: &str = "No matching record found";
/// Message for optimistic concurrency conflicts.
pub const CONFLICT: &str = "Report was changed by another session; reload and try again";
/// Message for every storage failure. Internal detail is never exposed.
pub const SERVER_ERROR: &str = "An unspecified server error occurred";

/// Every non-success outcome of an engine operation.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Missing or empty key components, unknown report or entity types,
    /// invalid payloads. Detected before any storage access where possible.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(#[from] DenialReason),

    /// Missing metadata, or a template / field-data pointer that does not
    /// resolve. The two are deliberately indistinguishable to callers.
    #[error("report not found")]
    NotFound,

    #[error("entity {entity_id} not found in {entity_type}")]
    EntityNotFound {
        entity_type: String,
        entity_id: String,
    },

    /// The field-data document changed since it was read.
    #[error("conflict: expected field data version {expected_version}, found {actual_version}")]
    Conflict {
        expected_version: u64,
        actual_version: u64,
    },

    #[error("storage failure: {0}")]
    StorageFailure(#[source] StorageError),
}

/// Client-facing categories of client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    MalformedRequest,
    Unauthorized,
    NotFound,
    Conflict,
}

/// Outcome class of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    ClientError(ClientErrorKind),
    ServerError,
}

impl ReportError {
    pub fn malformed(message: impl Into<String>) -> Self {
        ReportError::MalformedRequest(message.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ReportError::MalformedRequest(_) => {
                ErrorClass::ClientError(ClientErrorKind::MalformedRequest)
            }
            ReportError::Unauthorized(_) => ErrorClass::ClientError(ClientErrorKind::Unauthorized),
            ReportError::NotFound | ReportError::EntityNotFound { .. } => {
                ErrorClass::ClientError(ClientErrorKind::NotFound)
            }
            ReportError::Conflict { .. } => ErrorClass::ClientError(ClientErrorKind::Conflict),
            ReportError::StorageFailure(_) => ErrorClass::ServerError,
        }
    }

    /// The message safe to show a caller.
    pub fn public_message(&self) -> String {
        match self {
            ReportError::MalformedRequest(msg) => msg.clone(),
            ReportError::Unauthorized(_) => UNAUTHORIZED.to_string(),
            ReportError::NotFound => NO_MATCHING_RECORD.to_string(),
            ReportError::EntityNotFound { .. } => self.to_string(),
            ReportError::Conflict { .. } => CONFLICT.to_string(),
            ReportError::StorageFailure(_) => SERVER_ERROR.to_string(),
        }
    }
}

impl From<StorageError> for ReportError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Conflict {
                expected_version,
                actual_version,
                ..
            } => ReportError::Conflict {
                expected_version,
                actual_version,
            },
            StorageError::DocumentMissing { .. } => ReportError::NotFound,
            other => ReportError::StorageFailure(other),
        }
    }
}

impl From<EntityError> for ReportError {
    fn from(e: EntityError) -> Self {
        match e {
            EntityError::EntityNotFound {
                entity_type,
                entity_id,
            } => ReportError::EntityNotFound {
                entity_type,
                entity_id,
            },
            other => ReportError::MalformedRequest(other.to_string()),
        }
    }
}
