use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Json, Request, rejection::JsonRejection},
};
use serde_json::{Map, Value};

use crate::errors::ApiError;

/// JSON write payload. An empty (or whitespace-only) body becomes `{}` so it
/// reaches validation and fails there with per-field "required" messages;
/// anything else goes through axum's `Json` content-type and syntax checks.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonBody(pub Value);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let headers = req.headers().clone();
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(JsonRejection::from)?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(Value::Object(Map::new())));
        }

        let mut rebuilt = Request::new(Body::from(bytes));
        *rebuilt.headers_mut() = headers;

        let Json(value) = Json::<Value>::from_request(rebuilt, state).await?;
        Ok(JsonBody(value))
    }
}
