//! gRPC client for the vision backend.

use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use common::{AppError, AppResult};
use proto::vision::computer_vision_client::ComputerVisionClient as ProtoVisionClient;
use proto::vision::{ImgProcRequest, Model};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Per-request deadline. Batch uploads share it; inference on a large batch
/// that overruns is abandoned, per the gateway's no-retry contract.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// One image awaiting a description, paired with the model it was requested
/// against.
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub bytes: Vec<u8>,
    pub model: Model,
}

/// The vision backend's two RPCs, behind a trait so handlers can be exercised
/// against a double.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Describe a single image.
    async fn process_image(&self, job: ImageJob) -> AppResult<String>;

    /// Describe a batch of images, returning descriptions in input order.
    async fn process_image_batch(&self, jobs: Vec<ImageJob>) -> AppResult<Vec<String>>;
}

/// gRPC client wrapper for the vision backend.
pub struct VisionClient {
    client: ProtoVisionClient<Channel>,
}

impl VisionClient {
    /// Connect to the vision backend.
    pub async fn connect(endpoint: &str) -> Result<Self, tonic::transport::Error> {
        debug!("Connecting to vision backend at {}", endpoint);
        let channel = Endpoint::from_shared(endpoint.to_string())?
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .connect()
            .await?;
        Ok(Self {
            client: ProtoVisionClient::new(channel),
        })
    }
}

#[async_trait]
impl VisionBackend for VisionClient {
    async fn process_image(&self, job: ImageJob) -> AppResult<String> {
        let request = tonic::Request::new(ImgProcRequest {
            image: job.bytes,
            model: job.model as i32,
        });

        let mut client = self.client.clone();
        let response = client.process_image(request).await.map_err(AppError::from)?;
        Ok(response.into_inner().description)
    }

    async fn process_image_batch(&self, jobs: Vec<ImageJob>) -> AppResult<Vec<String>> {
        let requests = jobs.into_iter().map(|job| ImgProcRequest {
            image: job.bytes,
            model: job.model as i32,
        });
        let outbound = futures::stream::iter(requests);

        let mut client = self.client.clone();
        let response = client
            .process_image_batch(outbound)
            .await
            .map_err(AppError::from)?;

        let mut inbound = response.into_inner();
        let mut descriptions = Vec::new();
        while let Some(message) = inbound.message().await.map_err(AppError::from)? {
            descriptions.push(message.description);
        }

        Ok(descriptions)
    }
}
