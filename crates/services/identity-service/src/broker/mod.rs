//! Broker transport: consumes identity commands over a named AMQP queue and
//! publishes replies to each message's `reply_to` queue, correlated by
//! `correlation_id`.

use std::sync::Arc;

use futures::StreamExt;
use lapin::{
    options::{BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Connection, ConnectionProperties,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use common::BrokerConfig;

use crate::service::IdentityService;

/// The command discriminator carried on every request message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    SignUp,
    SignIn,
    RefreshToken,
    ValidateToken,
    VerifyUser,
}

/// Envelope wrapping a command and its JSON payload, matching the HTTP body
/// shape for the same operation.
#[derive(Debug, Deserialize)]
struct Request {
    command: Command,
    payload: Value,
}

/// Connect to the broker and run the consume loop until the connection
/// closes. Each message is handled and acked only after its reply has been
/// published, so a crash mid-handling redelivers the command.
pub async fn run(config: BrokerConfig, service: Arc<dyn IdentityService>) -> Result<(), lapin::Error> {
    let connection = Connection::connect(&config.amqps_uri(), ConnectionProperties::default()).await?;
    let channel = connection.create_channel().await?;

    channel
        .queue_declare(
            &config.queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    let mut consumer = channel
        .basic_consume(
            &config.queue,
            "identity-service",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    tracing::info!(queue = %config.queue, "Identity broker consumer started");

    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::error!(error = %e, "Broker delivery error");
                continue;
            }
        };

        let reply_to = delivery
            .properties
            .reply_to()
            .as_ref()
            .map(|s| s.to_string());
        let correlation_id = delivery
            .properties
            .correlation_id()
            .as_ref()
            .map(|s| s.to_string());

        let body = handle_delivery(&service, &delivery.data).await;

        if let (Some(reply_to), Some(correlation_id)) = (reply_to, correlation_id) {
            let properties = BasicProperties::default().with_correlation_id(correlation_id.into());
            if let Err(e) = channel
                .basic_publish(
                    "",
                    &reply_to,
                    BasicPublishOptions::default(),
                    &body,
                    properties,
                )
                .await
            {
                tracing::error!(error = %e, "Failed to publish broker reply");
            }
        }

        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
            tracing::error!(error = %e, "Failed to ack broker delivery");
        }
    }

    Ok(())
}

async fn handle_delivery(service: &Arc<dyn IdentityService>, data: &[u8]) -> Vec<u8> {
    let request: Request = match serde_json::from_slice(data) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(error = %e, "Malformed broker request");
            return json!({"status": "error", "message": "malformed request"})
                .to_string()
                .into_bytes();
        }
    };

    let response = dispatch(service, request).await;
    response.to_string().into_bytes()
}

async fn dispatch(service: &Arc<dyn IdentityService>, request: Request) -> Value {
    match request.command {
        Command::SignUp => {
            let firstname = field(&request.payload, "firstname");
            let lastname = field(&request.payload, "lastname");
            let email = field(&request.payload, "email");
            let password = field(&request.payload, "password");

            match service.sign_up(firstname, lastname, email, password).await {
                Ok(outcome) => json!({"status": outcome.status, "message": outcome.message}),
                Err(e) => json!({"status": "error", "code": e.code(), "message": e.user_message()}),
            }
        }
        Command::SignIn => {
            let email = field(&request.payload, "email");
            let password = field(&request.payload, "password");

            match service.sign_in(email, password).await {
                Ok(pair) => json!({"access_token": pair.access_token, "refresh_token": pair.refresh_token}),
                Err(e) => json!({"status": "error", "code": e.code(), "message": e.user_message()}),
            }
        }
        Command::RefreshToken => {
            let token = field(&request.payload, "token");

            match service.refresh_token(token).await {
                Ok(pair) => json!({"access_token": pair.access_token, "refresh_token": pair.refresh_token}),
                Err(e) => json!({"is_valid": false, "message": e.token_message()}),
            }
        }
        Command::ValidateToken => {
            let token = field(&request.payload, "token");

            match service.validate_token(token).await {
                Ok(validation) => json!({
                    "is_valid": validation.is_valid,
                    "is_verified": validation.is_verified,
                    "message": validation.message,
                }),
                Err(e) => json!({
                    "is_valid": false,
                    "is_verified": false,
                    "message": e.token_message(),
                }),
            }
        }
        Command::VerifyUser => {
            let key = field(&request.payload, "key");

            match service.verify_user(key).await {
                Ok(outcome) => json!({"status": outcome.status, "message": outcome.message}),
                Err(e) => json!({"status": "error", "message": e.user_message()}),
            }
        }
    }
}

fn field(payload: &Value, name: &str) -> String {
    payload
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::service::{SignUpOutcome, TokenValidation, VerifyOutcome};
    use common::{AppError, AppResult};
    use domain::{DomainError, DomainResult, TokenPair};

    struct StubService;

    #[async_trait]
    impl IdentityService for StubService {
        async fn sign_up(
            &self,
            _firstname: String,
            _lastname: String,
            email: String,
            _password: String,
        ) -> AppResult<SignUpOutcome> {
            if email == "taken@example.com" {
                return Err(AppError::conflict("User with such email already exists"));
            }
            Ok(SignUpOutcome {
                status: "success".to_string(),
                message: "registered; verify via email".to_string(),
            })
        }

        async fn verify_user(&self, _key: String) -> AppResult<VerifyOutcome> {
            Ok(VerifyOutcome {
                status: "success".to_string(),
                message: "User has been verified".to_string(),
            })
        }

        async fn sign_in(&self, _email: String, _password: String) -> AppResult<TokenPair> {
            Ok(TokenPair {
                access_token: "A1".to_string(),
                refresh_token: "R1".to_string(),
            })
        }

        async fn refresh_token(&self, token: String) -> DomainResult<TokenPair> {
            if token == "stale" {
                return Err(DomainError::NotRefreshToken);
            }
            Ok(TokenPair {
                access_token: "A2".to_string(),
                refresh_token: "R2".to_string(),
            })
        }

        async fn validate_token(&self, token: String) -> DomainResult<TokenValidation> {
            if token == "expired" {
                return Err(DomainError::TokenExpired);
            }
            Ok(TokenValidation {
                is_valid: true,
                is_verified: false,
                message: "Token is valid".to_string(),
            })
        }
    }

    fn service() -> Arc<dyn IdentityService> {
        Arc::new(StubService)
    }

    fn request(command: &str, payload: Value) -> Request {
        serde_json::from_value(json!({"command": command, "payload": payload})).unwrap()
    }

    #[test]
    fn command_discriminators_are_kebab_case() {
        let parsed: Command = serde_json::from_str("\"refresh-token\"").unwrap();
        assert_eq!(parsed, Command::RefreshToken);
        assert_eq!(serde_json::to_string(&Command::SignUp).unwrap(), "\"sign-up\"");
    }

    #[tokio::test]
    async fn sign_up_conflict_reply_carries_the_error_code() {
        let reply = dispatch(
            &service(),
            request("sign-up", json!({"email": "taken@example.com"})),
        )
        .await;

        assert_eq!(reply["status"], "error");
        assert_eq!(reply["code"], "CONFLICT");
        assert_eq!(reply["message"], "User with such email already exists");
    }

    #[tokio::test]
    async fn sign_in_reply_is_the_bare_token_pair() {
        let reply = dispatch(
            &service(),
            request("sign-in", json!({"email": "a@b.com", "password": "pw"})),
        )
        .await;

        assert_eq!(reply["access_token"], "A1");
        assert_eq!(reply["refresh_token"], "R1");
    }

    #[tokio::test]
    async fn refresh_failure_is_returned_in_band() {
        let reply = dispatch(&service(), request("refresh-token", json!({"token": "stale"}))).await;

        assert_eq!(reply["is_valid"], false);
        assert_eq!(reply["message"], "Provided token is not a refresh token");
    }

    #[tokio::test]
    async fn validate_failure_is_returned_in_band() {
        let reply =
            dispatch(&service(), request("validate-token", json!({"token": "expired"}))).await;

        assert_eq!(reply["is_valid"], false);
        assert_eq!(reply["is_verified"], false);
        assert_eq!(reply["message"], "Token expired");
    }

    #[tokio::test]
    async fn malformed_request_bytes_get_an_error_reply() {
        let reply = handle_delivery(&service(), b"not json").await;
        let reply: Value = serde_json::from_slice(&reply).unwrap();

        assert_eq!(reply["status"], "error");
        assert_eq!(reply["message"], "malformed request");
    }
}
