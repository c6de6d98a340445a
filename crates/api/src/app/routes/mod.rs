use axum::{routing::get, Router};

pub mod jobs;
pub mod system;

/// Router for all public endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/healthcheck", get(system::healthcheck))
        .merge(jobs::router())
}
