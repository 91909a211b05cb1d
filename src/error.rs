use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum AtlasError {
    #[error("unrecognized state: {0:?}")]
    InvalidState(String),

    #[error("malformed baseline record: {0}")]
    MalformedBaseline(String),

    #[error("invalid financial record: {0}")]
    InvalidRecord(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{count} municipalities named {name:?} in {state}; use the municipality id")]
    AmbiguousMunicipality {
        name: String,
        state: String,
        count: usize,
    },

    #[error("missing or invalid bearer token")]
    Unauthorized,

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("image service is not configured")]
    ImageServiceUnavailable,

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),
}

impl IntoResponse for AtlasError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            AtlasError::InvalidState(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_STATE", self.to_string())
            }
            AtlasError::InvalidRecord(_) | AtlasError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", self.to_string())
            }
            AtlasError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            AtlasError::AmbiguousMunicipality { .. } => {
                (StatusCode::CONFLICT, "AMBIGUOUS", self.to_string())
            }
            AtlasError::Unauthorized | AtlasError::Jwt(_) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication error.".to_string(),
            ),
            AtlasError::MalformedBaseline(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "MALFORMED_BASELINE",
                self.to_string(),
            ),
            AtlasError::ImageServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                self.to_string(),
            ),
            AtlasError::Reqwest(_) | AtlasError::UrlParse(_) | AtlasError::UpstreamStatus(_) => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "Upstream service is unavailable.".to_string(),
            ),
            AtlasError::Json(_) | AtlasError::Io(_) | AtlasError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.".to_string(),
            ),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ApiErrorBody {
            code: code.to_string(),
            message,
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
