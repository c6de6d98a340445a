use axum::Json;

pub async fn healthcheck() -> Json<bool> {
    Json(true)
}
