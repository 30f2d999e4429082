//! Mapping from relay errors to HTTP responses.

use super::types::ErrorBody;
use crate::error::RelayError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// A relay error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(RelayError::Validation(format!(
            "invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(RelayError::Validation(format!(
            "invalid query: {}",
            rejection.body_text()
        )))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RelayError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RelayError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            RelayError::UpstreamFetch { .. }
            | RelayError::Authentication(_)
            | RelayError::PushDelivery { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.0.kind().to_string(),
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
