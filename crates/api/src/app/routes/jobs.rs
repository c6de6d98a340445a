use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::debug;

use filterjob_core::{CreateJobRequest, JobId};
use filterjob_infra::jobs::JobServiceError;

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/job", post(create_job))
        .route("/job/:id", get(get_job))
}

pub async fn create_job(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CreateJobRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(request) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    debug!(data_set_id = %request.data_set_id, "job request");

    match services.jobs.create_job(&request).await {
        Ok(job) => (StatusCode::CREATED, Json(job)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    debug!(job_id = id.as_str(), "job status check");

    // Ids that cannot exist are reported like any other missing job.
    let job_id: JobId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::service_error_to_response(JobServiceError::NoSuchJob(id)),
    };

    match services.jobs.check_job_status(job_id).await {
        Ok(job) => Json(job).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
