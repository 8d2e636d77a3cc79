//! Broker RPC client: publishes identity commands and awaits their correlated
//! reply. Mirrors the connect/clone-per-call shape the gRPC clients used to
//! have, but the transport underneath is AMQP request/reply rather than a
//! tonic channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    options::{BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Connection, ConnectionProperties,
};
use serde_json::{json, Value};
use tokio::sync::{oneshot, Mutex};
use uuid::Uuid;

use common::{AppError, AppResult};

/// Per-request deadline for a broker round-trip.
const BROKER_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// The five identity operations, reached as broker request/reply calls.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn sign_up(&self, firstname: String, lastname: String, email: String, password: String) -> AppResult<Value>;
    async fn sign_in(&self, email: String, password: String) -> AppResult<Value>;
    async fn refresh_token(&self, token: String) -> AppResult<Value>;
    async fn validate_token(&self, token: String) -> AppResult<Value>;
    async fn verify_user(&self, key: String) -> AppResult<Value>;
}

#[async_trait]
impl BrokerClient for AmqpBrokerClient {
    async fn sign_up(&self, firstname: String, lastname: String, email: String, password: String) -> AppResult<Value> {
        self.call("sign-up", json!({"firstname": firstname, "lastname": lastname, "email": email, "password": password}))
            .await
    }

    async fn sign_in(&self, email: String, password: String) -> AppResult<Value> {
        self.call("sign-in", json!({"email": email, "password": password}))
            .await
    }

    async fn refresh_token(&self, token: String) -> AppResult<Value> {
        self.call("refresh-token", json!({"token": token})).await
    }

    async fn validate_token(&self, token: String) -> AppResult<Value> {
        self.call("validate-token", json!({"token": token})).await
    }

    async fn verify_user(&self, key: String) -> AppResult<Value> {
        self.call("verify-user", json!({"key": key})).await
    }
}

type PendingReplies = Arc<Mutex<HashMap<String, oneshot::Sender<Vec<u8>>>>>;

/// AMQP-backed `BrokerClient`. Holds one channel, one exclusive reply queue,
/// and a background task draining that queue into pending `oneshot`s keyed by
/// `correlation_id`.
pub struct AmqpBrokerClient {
    channel: lapin::Channel,
    command_queue: String,
    reply_queue: String,
    pending: PendingReplies,
}

impl AmqpBrokerClient {
    /// Connect to the broker, declare a private reply queue, and spawn the
    /// consumer task that demultiplexes replies by `correlation_id`.
    pub async fn connect(uri: &str, command_queue: &str) -> Result<Self, lapin::Error> {
        let connection = Connection::connect(uri, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        let reply_queue_decl = channel
            .queue_declare(
                "",
                QueueDeclareOptions {
                    exclusive: true,
                    auto_delete: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        let reply_queue = reply_queue_decl.name().to_string();

        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));

        let mut consumer = channel
            .basic_consume(
                &reply_queue,
                "gateway-broker-client",
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        let consumer_pending = pending.clone();
        tokio::spawn(async move {
            while let Some(delivery) = consumer.next().await {
                let Ok(delivery) = delivery else { continue };
                let Some(correlation_id) = delivery.properties.correlation_id().as_ref().map(|c| c.to_string()) else {
                    continue;
                };
                let mut pending = consumer_pending.lock().await;
                if let Some(sender) = pending.remove(&correlation_id) {
                    let _ = sender.send(delivery.data);
                }
            }
        });

        Ok(Self {
            channel,
            command_queue: command_queue.to_string(),
            reply_queue,
            pending,
        })
    }

    async fn call(&self, command: &str, payload: Value) -> AppResult<Value> {
        let correlation_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(correlation_id.clone(), tx);

        let body = json!({"command": command, "payload": payload}).to_string();
        let properties = BasicProperties::default()
            .with_reply_to(self.reply_queue.clone().into())
            .with_correlation_id(correlation_id.clone().into());

        if let Err(e) = self
            .channel
            .basic_publish(
                "",
                &self.command_queue,
                BasicPublishOptions::default(),
                body.as_bytes(),
                properties,
            )
            .await
        {
            self.pending.lock().await.remove(&correlation_id);
            return Err(AppError::upstream_unavailable(format!("identity service: {e}")));
        }

        let reply = tokio::time::timeout(BROKER_CALL_TIMEOUT, rx).await;
        match reply {
            Ok(Ok(bytes)) => serde_json::from_slice(&bytes)
                .map_err(|e| AppError::internal(format!("malformed broker reply: {e}"))),
            Ok(Err(_)) => Err(AppError::internal("broker reply channel closed")),
            Err(_) => {
                self.pending.lock().await.remove(&correlation_id);
                Err(AppError::upstream_unavailable("identity service"))
            }
        }
    }
}
