//! Admission guard: either a bearer token resolves to a valid identity, or
//! the request is charged against the process-local anonymous rate limit.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

use common::AppError;
use domain::ADMISSION_TOKEN_HEADER;

use crate::broker_client::BrokerClient;
use crate::middleware::rate_limit::{client_ip, RateLimiter};
use crate::state::AppState;

/// Runs on every gated route. A present `token` header must validate via the
/// identity service; otherwise the caller draws from the anonymous budget.
pub async fn admission_guard(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(ADMISSION_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let source = client_ip(&request, connect_info);

    admit(state.broker.as_ref(), &state.rate_limiter, token, &source).await?;

    Ok(next.run(request).await)
}

/// The admission decision itself, split out from the `axum` plumbing above so
/// it can be exercised directly against a mocked broker.
async fn admit(
    broker: &dyn BrokerClient,
    rate_limiter: &RateLimiter,
    token: Option<String>,
    source: &str,
) -> Result<(), AppError> {
    match token {
        Some(token) => {
            let reply = broker.validate_token(token).await?;
            let is_valid = reply.get("is_valid").and_then(|v| v.as_bool()).unwrap_or(false);
            if !is_valid {
                return Err(AppError::InvalidCredentials);
            }
        }
        None => {
            if !rate_limiter.try_consume(source) {
                return Err(AppError::RateLimited);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn valid_token_admits_without_touching_the_rate_limiter() {
        let mut broker = crate::broker_client::MockBrokerClient::new();
        broker
            .expect_validate_token()
            .withf(|token| token == "good-token")
            .returning(|_| Ok(json!({"is_valid": true})));
        let limiter = RateLimiter::new(0, 3600);

        let result = admit(&broker, &limiter, Some("good-token".to_string()), "1.2.3.4").await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn invalid_token_is_rejected() {
        let mut broker = crate::broker_client::MockBrokerClient::new();
        broker
            .expect_validate_token()
            .returning(|_| Ok(json!({"is_valid": false})));
        let limiter = RateLimiter::new(10, 3600);

        let result = admit(&broker, &limiter, Some("bad-token".to_string()), "1.2.3.4").await;

        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn missing_token_draws_from_the_anonymous_budget() {
        let broker = crate::broker_client::MockBrokerClient::new();
        let limiter = RateLimiter::new(1, 3600);

        assert!(admit(&broker, &limiter, None, "1.2.3.4").await.is_ok());
        assert!(matches!(
            admit(&broker, &limiter, None, "1.2.3.4").await,
            Err(AppError::RateLimited)
        ));
    }
}
