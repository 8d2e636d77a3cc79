//! gRPC protocol buffer definitions.
//!
//! This crate contains the generated client stub for the vision backend's
//! `ComputerVision` service. The gateway is the only consumer; the backend
//! itself is an external collaborator this workspace does not implement.

/// Vision service definitions.
pub mod vision {
    tonic::include_proto!("vision");
}

pub use vision::computer_vision_client::ComputerVisionClient;
pub use vision::{ImgProcRequest, ImgProcResponse, Model};
