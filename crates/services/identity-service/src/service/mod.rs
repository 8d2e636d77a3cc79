mod identity_service;

pub use identity_service::{IdentityOrchestrator, IdentityService, SignUpOutcome, TokenValidation, VerifyOutcome};
