#![cfg(feature = "server")]

use actix_web::{http::StatusCode, test, web, App};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storybook_illustrator::{
    server::{app_config, AppState},
    GenerationClient, GenerationResponse, IllustrationError, IllustrationPipeline,
    LocalImageStore, LocalStorageConfig, PipelineConfig, ResponsePart, Result,
};
use tempfile::TempDir;

const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

struct StubGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl GenerationClient for StubGenerator {
    async fn generate(&self, _model_id: &str, prompt: &str) -> Result<GenerationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains("storm") {
            return Err(IllustrationError::ResponseError("503 from model".into()));
        }
        if prompt.contains("refuse") {
            return Ok(GenerationResponse::from_parts(vec![ResponsePart::text("No.")]));
        }
        Ok(GenerationResponse::from_parts(vec![ResponsePart::inline(
            "image/png",
            PNG_B64,
        )]))
    }
}

struct Harness {
    dir: TempDir,
    local: Arc<LocalImageStore>,
    generator: Arc<StubGenerator>,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let local = Arc::new(LocalImageStore::new(
            &LocalStorageConfig::new().with_public_dir(dir.path()),
        ));
        let generator = Arc::new(StubGenerator {
            calls: AtomicUsize::new(0),
        });
        Self {
            dir,
            local,
            generator,
        }
    }

    fn state(&self, with_pipeline: bool) -> web::Data<AppState> {
        let pipeline = with_pipeline.then(|| {
            Arc::new(IllustrationPipeline::new(
                self.generator.clone(),
                self.local.clone(),
                "stub-model",
                PipelineConfig::default().with_batch_delay(Duration::ZERO),
            ))
        });
        web::Data::new(AppState::new(pipeline, self.local.clone(), 50))
    }
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(App::new().app_data($state).configure(app_config)).await
    };
}

#[actix_web::test]
async fn test_single_illustration_stored_locally() {
    let harness = Harness::new();
    let app = app!(harness.state(true));

    let req = test::TestRequest::post()
        .uri("/api/illustrations")
        .set_json(json!({"prompt": "A child waves at a lighthouse", "style": "cartoon", "consistencyMode": true}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["storage"], "localFilesystem");
    let url = body["imageUrl"].as_str().unwrap();
    assert!(url.starts_with("/api/images/illustration_"));

    let req = test::TestRequest::get().uri(url).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("content-type").unwrap(), "image/png");
    assert!(resp
        .headers()
        .get("cache-control")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("max-age=31536000"));
}

#[actix_web::test]
async fn test_extraction_miss_reported_not_raised() {
    let harness = Harness::new();
    let app = app!(harness.state(true));

    let req = test::TestRequest::post()
        .uri("/api/illustrations")
        .set_json(json!({"prompt": "Please refuse this"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["imageUrl"].is_null());
    assert!(body["error"].as_str().unwrap().contains("No image"));
}

#[actix_web::test]
async fn test_advanced_route_uses_advanced_prefix() {
    let harness = Harness::new();
    let app = app!(harness.state(true));

    let req = test::TestRequest::post()
        .uri("/api/illustrations/advanced")
        .set_json(json!({
            "prompt": "The fox returns home",
            "style": "sketch",
            "editMode": true,
            "fusionMode": true,
            "previousImageUrl": "/api/images/illustration_1_aaaaaaaa.png"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["imageUrl"]
        .as_str()
        .unwrap()
        .starts_with("/api/images/advanced_illustration_sketch_"));
}

#[actix_web::test]
async fn test_missing_api_key_fails_before_any_work() {
    let harness = Harness::new();
    let app = app!(harness.state(false));

    let req = test::TestRequest::post()
        .uri("/api/illustrations/batch")
        .set_json(json!({"bookId": "b", "pages": [{"prompt": "x", "pageIndex": 0}]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["type"], "configuration_error");
    assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_malformed_body_rejected() {
    let harness = Harness::new();
    let app = app!(harness.state(true));

    let req = test::TestRequest::post()
        .uri("/api/illustrations/batch")
        .set_json(json!({"bookId": "b", "pages": "not a list"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert_eq!(body["error"]["field"], "pages");
    assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_nested_shape_error_names_page_field() {
    let harness = Harness::new();
    let app = app!(harness.state(true));

    let req = test::TestRequest::post()
        .uri("/api/illustrations/batch")
        .set_json(json!({
            "bookId": "b",
            "pages": [{"prompt": "x", "pageIndex": 0}, {"prompt": 7, "pageIndex": 1}]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["field"], "pages[1].prompt");
    assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_batch_size_out_of_range_names_field() {
    let harness = Harness::new();
    let app = app!(harness.state(true));

    let req = test::TestRequest::post()
        .uri("/api/illustrations/batch")
        .set_json(json!({
            "bookId": "b",
            "pages": [{"prompt": "x", "pageIndex": 0}],
            "batchSize": 9
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["field"], "batchSize");
    assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_batch_reports_successes_and_failures() {
    let harness = Harness::new();
    let app = app!(harness.state(true));

    let req = test::TestRequest::post()
        .uri("/api/illustrations/batch")
        .set_json(json!({
            "bookId": "moon-book",
            "style": "watercolor",
            "batchSize": 2,
            "pages": [
                {"text": "Once upon a time", "prompt": "A rabbit looks at the moon", "pageIndex": 0},
                {"text": "Then it rained", "prompt": "A storm over the meadow", "pageIndex": 1},
                {"text": "The end", "prompt": "The rabbit sleeps", "pageIndex": 2}
            ]
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["bookId"], "moon-book");
    assert_eq!(body["summary"]["totalPages"], 3);
    assert_eq!(body["summary"]["successful"], 2);
    assert_eq!(body["summary"]["failed"], 1);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["pageIndex"], 0);
    assert_eq!(results[0]["text"], "Once upon a time");
    assert_eq!(results[0]["style"], "watercolor");
    assert!(results[1]["imageUrl"]
        .as_str()
        .unwrap()
        .contains("batch_illustration_moon-book_page2_"));

    let failed = body["failedResults"].as_array().unwrap();
    assert_eq!(failed[0]["pageIndex"], 1);
    assert!(failed[0]["error"].as_str().unwrap().contains("503"));
}

#[actix_web::test]
async fn test_image_route_rejects_traversal_and_missing_files() {
    let harness = Harness::new();
    std::fs::write(harness.dir.path().join("secret.txt"), "nope").unwrap();
    let app = app!(harness.state(true));

    let req = test::TestRequest::get()
        .uri("/api/images/../secret.txt")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_client_error());
    let body = test::read_body(resp).await;
    assert_ne!(body.as_ref(), b"nope");

    let req = test::TestRequest::get()
        .uri("/api/images/nothing_here.png")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_cleanup_endpoint_applies_retention() {
    let harness = Harness::new();
    for i in 0..60i64 {
        let name = format!("illustration_{}_{:08x}.png", 1_700_000_000_000 + i, i);
        harness.local.write(&name, b"x").await.unwrap();
    }
    let app = app!(harness.state(false));

    let req = test::TestRequest::post()
        .uri("/api/admin/cleanup-images")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["deleted"], 10);
    assert_eq!(body["kept"], 50);

    let req = test::TestRequest::post()
        .uri("/api/admin/cleanup-images")
        .set_json(json!({"keep": 5}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["deleted"], 45);
    assert_eq!(body["kept"], 5);
}

#[actix_web::test]
async fn test_health_reports_generation_availability() {
    let harness = Harness::new();
    let app = app!(harness.state(false));

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["generation"], false);
}
