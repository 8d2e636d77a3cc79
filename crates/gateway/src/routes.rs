//! Route configuration.

use axum::{middleware, Router};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{auth_routes, health_routes, vision_routes};
use crate::middleware::admission_guard;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (ungated)
        .nest("/health", health_routes())
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Auth routes (ungated per §6 — signup/signin/refresh/verify carry no
        // admission guard of their own)
        .nest("/auth", auth_routes())
        // Vision routes (admission guard: bearer token or rate-limit budget)
        .nest(
            "/vision",
            vision_routes().route_layer(middleware::from_fn_with_state(state.clone(), admission_guard)),
        )
        .with_state(state)
}
