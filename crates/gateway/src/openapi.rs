//! OpenAPI documentation.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use domain::TokenPair;

use crate::handlers::{RefreshRequest, SignInRequest, SignUpRequest};

/// API documentation struct.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::auth_handler::sign_up,
        crate::handlers::auth_handler::sign_in,
        crate::handlers::auth_handler::refresh,
        crate::handlers::auth_handler::verify,
        crate::handlers::vision_handler::process_image,
    ),
    components(
        schemas(SignUpRequest, SignInRequest, RefreshRequest, TokenPair)
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Sign-up, sign-in, token refresh, and email verification"),
        (name = "Vision", description = "Admission-guarded image description endpoint"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
