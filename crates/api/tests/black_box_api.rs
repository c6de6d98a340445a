use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use filterjob_api::app::services::{build_in_memory_services, InMemoryAdapters};
use filterjob_core::{CanonicalFilters, DataSetId, FileFormat, Fingerprint, ManualClock};
use filterjob_infra::jobs::JobSettings;
use filterjob_infra::storage::DownloadUrlTemplate;
use reqwest::StatusCode;
use serde_json::json;

struct TestServer {
    base_url: String,
    adapters: InMemoryAdapters,
    clock: Arc<ManualClock>,
    data_set: DataSetId,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(pending_job_limit: u64) -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let settings = JobSettings {
            pending_job_limit,
            output_bucket: "out".to_string(),
            download_url_template: DownloadUrlTemplate::new("https://dl.example/{filename}"),
            ..JobSettings::default()
        };
        let (services, adapters) = build_in_memory_services(settings, clock.clone());

        let data_set = DataSetId::new();
        let mut known = CanonicalFilters::new();
        known.insert("colour", ["red", "blue", "green"]);
        known.insert("size", ["S", "M"]);
        adapters.data_sets.insert(data_set, "s3://input/data.csv", known);

        // Same router as prod, bound to an ephemeral port.
        let app = filterjob_api::app::router(Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            adapters,
            clock,
            data_set,
            handle,
        }
    }

    fn expected_file_name(&self, dimension: &str, values: &[&str]) -> String {
        let mut canonical = CanonicalFilters::new();
        canonical.insert(dimension, values.iter().copied());
        Fingerprint::compute(self.data_set, &canonical).file_name(FileFormat::Csv)
    }

    async fn create(&self, client: &reqwest::Client, body: serde_json::Value) -> reqwest::Response {
        client
            .post(format!("{}/job", self.base_url))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn check(&self, client: &reqwest::Client, id: &str) -> reqwest::Response {
        client
            .get(format!("{}/job/{}", self.base_url, id))
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn colour_request(data_set: DataSetId) -> serde_json::Value {
    json!({
        "id": data_set.to_string(),
        "dimensions": [{"id": "colour", "options": ["red", "blue"]}],
        "fileFormats": ["CSV"]
    })
}

#[tokio::test]
async fn healthcheck_returns_true() {
    let srv = TestServer::spawn(10).await;
    let res = reqwest::get(format!("{}/healthcheck", srv.base_url)).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!(true));
}

#[tokio::test]
async fn create_check_and_complete_lifecycle() {
    let srv = TestServer::spawn(10).await;
    let client = reqwest::Client::new();
    let file_name = srv.expected_file_name("colour", &["blue", "red"]);

    // New request: one pending file, one publish.
    let res = srv.create(&client, colour_request(srv.data_set)).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    assert_eq!(created["status"], "Pending");
    assert_eq!(created["files"][0]["name"], file_name.as_str());
    assert_eq!(created["files"][0]["status"], "Pending");
    assert!(created["files"][0].get("url").is_none());
    assert!(created.get("expiryTime").is_none());
    assert!(created.get("expiry_time").is_none());
    assert_eq!(srv.adapters.queue.publish_count(), 1);

    // Same request again: deduplicated, no second publish.
    let res = srv.create(&client, colour_request(srv.data_set)).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let repeated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(repeated["files"][0]["name"], file_name.as_str());
    assert_ne!(repeated["id"], created["id"]);
    assert_eq!(srv.adapters.queue.publish_count(), 1);

    // Worker deposits the file: next check flips to complete.
    srv.adapters.objects.put("out", file_name.clone());
    let id = created["id"].as_str().unwrap();
    let res = srv.check(&client, id).await;
    assert_eq!(res.status(), StatusCode::OK);
    let done: serde_json::Value = res.json().await.unwrap();
    assert_eq!(done["status"], "Complete");
    assert_eq!(done["files"][0]["status"], "Complete");
    assert_eq!(
        done["files"][0]["url"],
        format!("https://dl.example/{}", file_name).as_str()
    );
}

#[tokio::test]
async fn filter_order_does_not_change_file_name() {
    let srv = TestServer::spawn(10).await;
    let client = reqwest::Client::new();

    let a = srv
        .create(
            &client,
            json!({
                "id": srv.data_set.to_string(),
                "dimensions": [
                    {"id": "size", "options": ["M", "S"]},
                    {"id": "colour", "options": ["red"]}
                ]
            }),
        )
        .await
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let b = srv
        .create(
            &client,
            json!({
                "id": srv.data_set.to_string(),
                "dimensions": [
                    {"id": "colour", "options": ["red"]},
                    {"id": "size", "options": ["S", "M"]}
                ]
            }),
        )
        .await
        .json::<serde_json::Value>()
        .await
        .unwrap();

    assert_eq!(a["files"][0]["name"], b["files"][0]["name"]);
    assert!(a["files"][0]["name"].as_str().unwrap().ends_with(".csv"));
}

#[tokio::test]
async fn unknown_dataset_is_bad_request() {
    let srv = TestServer::spawn(10).await;
    let client = reqwest::Client::new();

    let res = srv.create(&client, colour_request(DataSetId::new())).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "no_such_dataset");
}

#[tokio::test]
async fn invalid_dimension_is_bad_request() {
    let srv = TestServer::spawn(10).await;
    let client = reqwest::Client::new();

    let res = srv
        .create(
            &client,
            json!({
                "id": srv.data_set.to_string(),
                "dimensions": [{"id": "colour", "options": ["purple"]}]
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_dimension");
    assert!(body["message"].as_str().unwrap().contains("'colour'"));
}

#[tokio::test]
async fn malformed_requests_are_bad_request() {
    let srv = TestServer::spawn(10).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/job", srv.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .create(&client, json!({"id": "not-a-uuid", "dimensions": []}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .create(
            &client,
            json!({"id": srv.data_set.to_string(), "fileFormats": ["XLSX"]}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn empty_format_list_is_bad_request() {
    let srv = TestServer::spawn(10).await;
    let client = reqwest::Client::new();

    let res = srv
        .create(&client, json!({"id": srv.data_set.to_string(), "fileFormats": []}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "no_files_specified");
}

#[tokio::test]
async fn backpressure_rejects_new_work_but_not_finished_work() {
    let srv = TestServer::spawn(1).await;
    let client = reqwest::Client::new();

    let res = srv.create(&client, colour_request(srv.data_set)).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let other = json!({
        "id": srv.data_set.to_string(),
        "dimensions": [{"id": "size", "options": ["S"]}]
    });
    let res = srv.create(&client, other.clone()).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "too_many_requests");
    assert_eq!(srv.adapters.queue.publish_count(), 1);
    assert_eq!(srv.adapters.store.job_count(), 1);

    // Already generated output is served regardless of the limit.
    srv.adapters
        .objects
        .put("out", srv.expected_file_name("size", &["S"]));
    let res = srv.create(&client, other).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "Complete");
}

#[tokio::test]
async fn queue_outage_is_service_unavailable() {
    let srv = TestServer::spawn(10).await;
    let client = reqwest::Client::new();
    srv.adapters.queue.set_failing(true);

    let res = srv.create(&client, colour_request(srv.data_set)).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(srv.adapters.store.job_count(), 0);
}

#[tokio::test]
async fn unknown_and_expired_jobs_are_not_found() {
    let srv = TestServer::spawn(10).await;
    let client = reqwest::Client::new();

    let res = srv.check(&client, "no-such-job").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "no_such_job");

    let created: serde_json::Value = srv
        .create(&client, colour_request(srv.data_set))
        .await
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();

    srv.clock.advance(ChronoDuration::minutes(61));
    let res = srv.check(&client, id).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(srv.adapters.store.job_count(), 0);
}

#[tokio::test]
async fn storage_outage_is_internal_error_without_detail() {
    let srv = TestServer::spawn(10).await;
    let client = reqwest::Client::new();
    srv.adapters.objects.set_unavailable(true);

    let res = srv.create(&client, colour_request(srv.data_set)).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "internal_error");
    assert_eq!(body["message"], "an unexpected error occurred");
}
