//! Vision endpoint: accepts one or more images over multipart, routes to the
//! vision backend's unary or streaming RPC by upload cardinality.

use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde_json::json;

use common::{AppError, AppResult};
use proto::vision::Model;

use crate::clients::{ImageJob, VisionBackend};
use crate::state::AppState;

/// Create vision routes.
pub fn vision_routes() -> Router<AppState> {
    Router::new().route("/process-image", post(process_image))
}

/// Describe the uploaded image(s). Exactly one file takes the unary RPC;
/// two or more take the bidi-streaming RPC. Zero files is a bad request.
#[utoipa::path(
    post,
    path = "/vision/process-image",
    tag = "Vision",
    responses(
        (status = 200, description = "Description, or an array of descriptions for a batch upload"),
        (status = 400, description = "No image uploaded")
    )
)]
pub async fn process_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut model = Model::Blip;
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "model" => {
                let value = field.text().await.map_err(|e| AppError::BadRequest(e.to_string()))?;
                model = parse_model(&value)?;
            }
            "image" | "images" | "file" | "files" => {
                let bytes = field.bytes().await.map_err(|e| AppError::BadRequest(e.to_string()))?;
                images.push(bytes.to_vec());
            }
            _ => {}
        }
    }

    let jobs: Vec<ImageJob> = images.into_iter().map(|bytes| ImageJob { bytes, model }).collect();

    match jobs.len() {
        0 => Err(AppError::BadRequest("at least one image is required".to_string())),
        1 => {
            let description = state.vision.process_image(jobs.into_iter().next().unwrap()).await?;
            Ok(Json(json!({ "description": description })).into_response())
        }
        _ => {
            let descriptions = state.vision.process_image_batch(jobs).await?;
            Ok(Json(descriptions).into_response())
        }
    }
}

fn parse_model(value: &str) -> AppResult<Model> {
    match value.to_ascii_uppercase().as_str() {
        "BLIP" => Ok(Model::Blip),
        "BLIP_QUANTIZED" => Ok(Model::BlipQuantized),
        other => Err(AppError::BadRequest(format!("unknown model '{other}'"))),
    }
}
