//! JSON extractor that runs the payload through its `Validate` rules before
//! a handler ever sees it.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use common::AppError;

/// Rejects malformed JSON and field-rule violations as `Validation` errors,
/// so handlers only receive payloads that already satisfy the field contract.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;

        payload
            .validate()
            .map_err(|violations| AppError::validation(first_violation(&violations)))?;

        Ok(ValidatedJson(payload))
    }
}

/// One actionable message from the violation set. The request DTOs declare a
/// `message` on every rule, so the field-name fallback rarely shows.
fn first_violation(violations: &validator::ValidationErrors) -> String {
    for (field, errors) in violations.field_errors() {
        if let Some(error) = errors.first() {
            return match &error.message {
                Some(message) => message.to_string(),
                None => format!("Invalid value for '{field}'"),
            };
        }
    }
    "Validation failed".to_string()
}
