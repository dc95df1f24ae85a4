//! Mapping of engine outcomes onto HTTP responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mcr_engine::{ClientErrorKind, ErrorClass, ReportError};

use super::json_error;

/// A failed request, rendered as `{"error": message}`.
#[derive(Debug)]
pub(crate) enum ApiError {
    /// Missing or unrecognised principal headers.
    Unauthenticated(&'static str),
    /// The body or query string could not be decoded.
    BadRequest(String),
    Report(ReportError),
}

impl ApiError {
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Report(e) => match e.class() {
                ErrorClass::ClientError(ClientErrorKind::MalformedRequest) => {
                    StatusCode::BAD_REQUEST
                }
                ErrorClass::ClientError(ClientErrorKind::Unauthorized) => StatusCode::FORBIDDEN,
                ErrorClass::ClientError(ClientErrorKind::NotFound) => StatusCode::NOT_FOUND,
                ErrorClass::ClientError(ClientErrorKind::Conflict) => StatusCode::CONFLICT,
                ErrorClass::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthenticated(msg) => msg.to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Report(e) => e.public_message(),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        ApiError::Report(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Report(ReportError::StorageFailure(source)) => {
                tracing::error!(error = %source, "storage failure");
            }
            ApiError::Report(ReportError::Unauthorized(reason)) => {
                tracing::info!(%reason, "access denied");
            }
            _ => {}
        }
        json_error(status, &self.message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcr_engine::DenialReason;
    use mcr_storage::StorageError;

    #[test]
    fn engine_outcomes_map_to_status_codes() {
        let cases = [
            (ReportError::malformed("Must provide key for table"), 400),
            (ReportError::Unauthorized(DenialReason::ReportLocked), 403),
            (ReportError::NotFound, 404),
            (
                ReportError::Conflict {
                    expected_version: 1,
                    actual_version: 2,
                },
                409,
            ),
            (
                ReportError::StorageFailure(StorageError::Backend("timeout".to_string())),
                500,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status().as_u16(), status);
        }
        assert_eq!(
            ApiError::Unauthenticated("missing role").status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn server_errors_hide_storage_detail() {
        let err = ApiError::from(ReportError::StorageFailure(StorageError::Backend(
            "table mcr-reports throttled".to_string(),
        )));
        assert!(!err.message().contains("throttled"));
    }
}
