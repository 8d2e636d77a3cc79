//! gRPC clients for calling the vision backend.

mod vision_client;

pub use vision_client::{ImageJob, VisionBackend, VisionClient};

#[cfg(any(test, feature = "test-utils"))]
pub use vision_client::MockVisionBackend;
