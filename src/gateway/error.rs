use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::pipeline::{ANSWER_SOURCE_HEADER, ResolveError};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("knowledge bank unavailable: {0}")]
    Upstream(String),

    #[error("timed out: {0}")]
    Timeout(String),
}

impl From<ResolveError> for GatewayError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::InvalidInput { .. } => GatewayError::InvalidRequest(err.to_string()),
            ResolveError::Upstream(_) => GatewayError::Upstream(err.to_string()),
            ResolveError::BudgetExceeded { .. } => GatewayError::Timeout(err.to_string()),
        }
    }
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        };

        let mut headers = HeaderMap::new();
        headers.insert(ANSWER_SOURCE_HEADER, HeaderValue::from_static("error"));

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, headers, body).into_response()
    }
}
