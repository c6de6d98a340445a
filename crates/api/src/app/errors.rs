use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{error, warn};

use filterjob_infra::jobs::JobServiceError;

pub fn service_error_to_response(err: JobServiceError) -> axum::response::Response {
    match err {
        JobServiceError::NoSuchDataSet(_) => {
            json_error(StatusCode::BAD_REQUEST, "no_such_dataset", err.to_string())
        }
        JobServiceError::InvalidDimension(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_dimension", msg)
        }
        JobServiceError::NoSuchJob(_) => {
            json_error(StatusCode::NOT_FOUND, "no_such_job", err.to_string())
        }
        JobServiceError::TooManyRequests => {
            json_error(StatusCode::TOO_MANY_REQUESTS, "too_many_requests", err.to_string())
        }
        JobServiceError::ServiceUnavailable(_) => {
            warn!(error = %err, "filter service unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", err.to_string())
        }
        JobServiceError::NoFilesSpecified => {
            json_error(StatusCode::BAD_REQUEST, "no_files_specified", err.to_string())
        }
        JobServiceError::Internal(detail) => {
            error!(error = %detail, "unexpected failure handling job request");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "an unexpected error occurred",
            )
        }
    }
}

pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "bad_request", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
