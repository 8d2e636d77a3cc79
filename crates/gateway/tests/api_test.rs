//! Integration tests for the gateway's HTTP surface.
//!
//! The real router runs against stub broker and vision backends, so these
//! tests cover routing, payload validation, broker-reply-to-HTTP-status
//! translation, the admission guard, and the unary/batch vision split,
//! without dialing AMQP or gRPC.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::AppResult;
use gateway_lib::broker_client::BrokerClient;
use gateway_lib::clients::{ImageJob, VisionBackend};
use gateway_lib::config::GatewayRuntimeConfig;
use gateway_lib::middleware::RateLimiter;
use gateway_lib::routes::create_router;
use gateway_lib::state::AppState;

// =============================================================================
// Stub backends
// =============================================================================

/// Broker double returning one canned reply per operation.
#[derive(Clone, Default)]
struct StubBroker {
    sign_up: Value,
    sign_in: Value,
    refresh: Value,
    validate: Value,
    verify: Value,
}

#[async_trait]
impl BrokerClient for StubBroker {
    async fn sign_up(
        &self,
        _firstname: String,
        _lastname: String,
        _email: String,
        _password: String,
    ) -> AppResult<Value> {
        Ok(self.sign_up.clone())
    }

    async fn sign_in(&self, _email: String, _password: String) -> AppResult<Value> {
        Ok(self.sign_in.clone())
    }

    async fn refresh_token(&self, _token: String) -> AppResult<Value> {
        Ok(self.refresh.clone())
    }

    async fn validate_token(&self, _token: String) -> AppResult<Value> {
        Ok(self.validate.clone())
    }

    async fn verify_user(&self, _key: String) -> AppResult<Value> {
        Ok(self.verify.clone())
    }
}

/// Vision double describing each image by its byte length.
struct StubVision;

#[async_trait]
impl VisionBackend for StubVision {
    async fn process_image(&self, job: ImageJob) -> AppResult<String> {
        Ok(format!("an image of {} bytes", job.bytes.len()))
    }

    async fn process_image_batch(&self, jobs: Vec<ImageJob>) -> AppResult<Vec<String>> {
        Ok(jobs
            .iter()
            .map(|job| format!("an image of {} bytes", job.bytes.len()))
            .collect())
    }
}

fn app(broker: StubBroker, budget: u32) -> Router {
    let state = AppState::new(
        Arc::new(broker),
        Arc::new(StubVision),
        Arc::new(RateLimiter::new(budget, 3600)),
        GatewayRuntimeConfig::from_env(),
    );
    create_router(state)
}

// =============================================================================
// Request helpers
// =============================================================================

async fn post_json(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    read_response(response).await
}

const BOUNDARY: &str = "gateway-test-boundary";

fn multipart_body(images: &[&[u8]], model: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(model) = model {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"model\"\r\n\r\n{model}\r\n"
            )
            .as_bytes(),
        );
    }
    for (i, image) in images.iter().enumerate() {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"img{i}.png\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(image);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn post_images(
    app: &Router,
    images: &[&[u8]],
    model: Option<&str>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/vision/process-image")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::from(multipart_body(images, model))).unwrap())
        .await
        .unwrap();

    read_response(response).await
}

async fn read_response(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn signup_payload() -> Value {
    json!({
        "firstname": "John",
        "lastname": "Kowalski",
        "email": "example@gmail.com",
        "password": "StrongPassword123!",
    })
}

// =============================================================================
// Auth surface
// =============================================================================

#[tokio::test]
async fn signup_with_a_malformed_email_is_400() {
    let app = app(StubBroker::default(), 3);

    let mut payload = signup_payload();
    payload["email"] = json!("not-an-email");
    let (status, _) = post_json(&app, "/auth/signup", payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signup_with_a_numeric_name_is_400() {
    let app = app(StubBroker::default(), 3);

    let mut payload = signup_payload();
    payload["firstname"] = json!("J0hn");
    let (status, _) = post_json(&app, "/auth/signup", payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signup_conflict_reply_maps_to_409() {
    let broker = StubBroker {
        sign_up: json!({
            "status": "error",
            "code": "CONFLICT",
            "message": "User with such email already exists",
        }),
        ..Default::default()
    };
    let app = app(broker, 3);

    let (status, body) = post_json(&app, "/auth/signup", signup_payload()).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User with such email already exists");
}

#[tokio::test]
async fn signup_success_passes_the_reply_through() {
    let broker = StubBroker {
        sign_up: json!({"status": "success", "message": "registered; verify via email"}),
        ..Default::default()
    };
    let app = app(broker, 3);

    let (status, body) = post_json(&app, "/auth/signup", signup_payload()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
}

#[tokio::test]
async fn signin_returns_the_token_pair() {
    let broker = StubBroker {
        sign_in: json!({"access_token": "A1", "refresh_token": "R1"}),
        ..Default::default()
    };
    let app = app(broker, 3);

    let (status, body) = post_json(
        &app,
        "/auth/signin",
        json!({"email": "example@gmail.com", "password": "StrongPassword123!"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["access_token"], "A1");
    assert_eq!(body["refresh_token"], "R1");
}

#[tokio::test]
async fn refresh_failures_stay_200_with_an_in_band_body() {
    let broker = StubBroker {
        refresh: json!({"is_valid": false, "message": "Provided token is not a refresh token"}),
        ..Default::default()
    };
    let app = app(broker, 3);

    let (status, body) = post_json(&app, "/auth/refresh", json!({"token": "stale"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid"], false);
    assert_eq!(body["message"], "Provided token is not a refresh token");
}

#[tokio::test]
async fn verify_reads_the_key_from_the_query_string() {
    let broker = StubBroker {
        verify: json!({"status": "success", "message": "User has been verified"}),
        ..Default::default()
    };
    let app = app(broker, 3);

    let (status, body) = post_json(&app, "/auth/verify?key=some-key", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User has been verified");
}

// =============================================================================
// Admission guard + vision surface
// =============================================================================

#[tokio::test]
async fn anonymous_vision_requests_exhaust_the_budget_at_the_fourth_call() {
    let app = app(StubBroker::default(), 3);
    let image: &[u8] = b"png-bytes";

    for _ in 0..3 {
        let (status, _) = post_images(&app, &[image], None, &[]).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = post_images(&app, &[image], None, &[]).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // A different source still has its own budget.
    let (status, _) =
        post_images(&app, &[image], None, &[("X-Forwarded-For", "203.0.113.9")]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn a_valid_token_bypasses_the_anonymous_budget() {
    let broker = StubBroker {
        validate: json!({"is_valid": true, "is_verified": true, "message": "Token is valid"}),
        ..Default::default()
    };
    let app = app(broker, 0);

    let (status, body) = post_images(&app, &[b"png-bytes"], None, &[("token", "A1")]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "an image of 9 bytes");
}

#[tokio::test]
async fn an_invalid_token_is_rejected_outright() {
    let broker = StubBroker {
        validate: json!({"is_valid": false, "message": "Invalid token"}),
        ..Default::default()
    };
    let app = app(broker, 3);

    let (status, _) = post_images(&app, &[b"png-bytes"], None, &[("token", "bogus")]).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn an_upload_with_no_files_is_400() {
    let app = app(StubBroker::default(), 3);

    let (status, _) = post_images(&app, &[], Some("BLIP"), &[]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn an_unknown_model_is_400() {
    let app = app(StubBroker::default(), 3);

    let (status, _) = post_images(&app, &[b"png-bytes"], Some("RESNET"), &[]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn a_single_image_yields_one_description() {
    let app = app(StubBroker::default(), 3);

    let (status, body) = post_images(&app, &[b"png-bytes"], Some("BLIP"), &[]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "an image of 9 bytes");
}

#[tokio::test]
async fn a_batch_yields_descriptions_in_input_order() {
    let app = app(StubBroker::default(), 3);

    let (status, body) = post_images(&app, &[b"first", b"second!"], Some("BLIP_QUANTIZED"), &[]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!(["an image of 5 bytes", "an image of 7 bytes"])
    );
}
