//! Shared test helpers for HTTP integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use clouddisk_core::config::{AppConfig, DatabaseConfig, StorageConfig};
use clouddisk_database::{DatabasePool, run_migrations};
use clouddisk_storage::LocalFilesystem;

const BOUNDARY: &str = "clouddisk-test-boundary";

/// Test application context over a throwaway directory.
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Catalog pool for direct queries
    pub db: DatabasePool,
    /// Storage root of the mirror
    pub storage_root: PathBuf,
    _dir: TempDir,
}

impl TestApp {
    /// Create a new test application with default limits.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test application after adjusting the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let storage_root = dir.path().join("storage");

        let mut config = AppConfig::default();
        config.database = DatabaseConfig::with_url(format!(
            "sqlite://{}",
            dir.path().join("catalog.db").display()
        ));
        config.storage = StorageConfig::with_root(storage_root.display().to_string());
        adjust(&mut config);

        let db = DatabasePool::connect(&config.database)
            .await
            .expect("Failed to connect to test catalog");
        run_migrations(db.pool())
            .await
            .expect("Failed to run migrations");

        let mirror = LocalFilesystem::new(&storage_root)
            .await
            .expect("Failed to init storage");

        let state = clouddisk_api::build_state(config, db.clone(), Arc::new(mirror));
        let router = clouddisk_api::build_router(state);

        Self {
            router,
            db,
            storage_root,
            _dir: dir,
        }
    }

    /// Physical location of a catalog path.
    pub fn physical(&self, path: &str) -> PathBuf {
        self.storage_root.join(path.trim_start_matches('/'))
    }

    /// Send a JSON request.
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Create a folder and return its id.
    pub async fn create_folder(&self, name: &str, parent_id: i64) -> i64 {
        let response = self
            .request(
                "POST",
                "/api/folders",
                Some(serde_json::json!({ "name": name, "parent_id": parent_id })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.data()["id"].as_i64().expect("folder id")
    }

    /// Upload a file through the multipart endpoint.
    pub async fn upload(
        &self,
        parent_id: i64,
        name: &str,
        content: &[u8],
        size: Option<i64>,
    ) -> TestResponse {
        let mut body = Vec::new();
        let mut text_field = |field: &str, value: &str| {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        };
        text_field("parent_id", &parent_id.to_string());
        if let Some(size) = size {
            text_field("size", &size.to_string());
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/api/files/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Fetch raw bytes from a download endpoint.
    pub async fn download(&self, path: &str) -> (StatusCode, Option<String>, Bytes) {
        let req = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
            .await
            .expect("Failed to read body");
        (status, content_type, bytes)
    }

    async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// The `data` member of a success envelope.
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    /// The error code of an error body.
    pub fn error_code(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}
