//! HTTP request handlers.

pub mod auth_handler;
pub mod health_handler;
pub mod vision_handler;

pub use auth_handler::{auth_routes, RefreshRequest, SignInRequest, SignUpRequest};
pub use health_handler::health_routes;
pub use vision_handler::vision_routes;
