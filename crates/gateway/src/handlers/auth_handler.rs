//! Auth endpoints: each packages its validated payload into a broker request,
//! awaits the identity service's reply, and translates the result to HTTP.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use common::{status_for_code, AppResult};
use domain::TokenPair;

use crate::broker_client::BrokerClient;
use crate::extractors::ValidatedJson;
use crate::state::AppState;

/// Sign-up request body.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignUpRequest {
    #[validate(length(min = 1, max = 64, message = "Invalid firstname"), custom(function = "validate_alphabetic", message = "Names must contain only letters"))]
    #[schema(example = "Ada")]
    pub firstname: String,
    #[validate(length(min = 1, max = 64, message = "Invalid lastname"), custom(function = "validate_alphabetic", message = "Names must contain only letters"))]
    #[schema(example = "Lovelace")]
    pub lastname: String,
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    #[schema(example = "correcthorsebattery", min_length = 8)]
    pub password: String,
}

/// Names are bounded alphabetic strings — no digits, symbols, or whitespace.
fn validate_alphabetic(value: &str) -> Result<(), validator::ValidationError> {
    if value.chars().all(|c| c.is_alphabetic()) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("alphabetic"))
    }
}

/// Sign-in request body.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignInRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh-token request body.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

/// Query string for `POST /auth/verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub key: String,
}

/// Create auth routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/signin", post(sign_in))
        .route("/refresh", post(refresh))
        .route("/verify", post(verify))
}

/// Register a new account and send a verification email.
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "Authentication",
    request_body = SignUpRequest,
    responses((status = 200, description = "Registered"), (status = 409, description = "Email already registered"))
)]
pub async fn sign_up(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<SignUpRequest>,
) -> AppResult<Response> {
    let reply = state
        .broker
        .sign_up(body.firstname, body.lastname, body.email, body.password)
        .await?;

    Ok(outcome_response(reply))
}

/// Exchange credentials for an access/refresh token pair.
#[utoipa::path(
    post,
    path = "/auth/signin",
    tag = "Authentication",
    request_body = SignInRequest,
    responses((status = 200, description = "Token pair", body = TokenPair), (status = 409, description = "Bad credentials"))
)]
pub async fn sign_in(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<SignInRequest>,
) -> AppResult<Response> {
    let reply = state.broker.sign_in(body.email, body.password).await?;
    Ok(outcome_response(reply))
}

/// Rotate a refresh token for a fresh pair. Token failures are carried in the
/// 200 body as `{is_valid:false, message}`, never as an error status.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Authentication",
    request_body = RefreshRequest,
    responses((status = 200, description = "Token pair or is_valid:false", body = TokenPair))
)]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RefreshRequest>,
) -> AppResult<Json<serde_json::Value>> {
    Ok(Json(state.broker.refresh_token(body.token).await?))
}

/// Confirm a verification link. Idempotent: a consumed key returns the
/// "already verified" message rather than an error.
#[utoipa::path(
    post,
    path = "/auth/verify",
    tag = "Authentication",
    params(("key" = String, Query, description = "Verification key")),
    responses((status = 200, description = "Verification outcome"))
)]
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> AppResult<Json<serde_json::Value>> {
    Ok(Json(state.broker.verify_user(query.key).await?))
}

/// Sign-up/sign-in replies carry `{status:"error", code, message}` on
/// failure; translate that into the matching HTTP status, otherwise pass the
/// success body through as-is at 200.
fn outcome_response(reply: serde_json::Value) -> Response {
    let is_error = reply.get("status").and_then(|v| v.as_str()) == Some("error");
    if !is_error {
        return (StatusCode::OK, Json(reply)).into_response();
    }

    let status = reply
        .get("code")
        .and_then(|v| v.as_str())
        .map(status_for_code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (status, Json(reply)).into_response()
}
