use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Signature verification failed")]
    SignatureInvalid,
    #[error("Malformed message payload: {0}")]
    Decode(#[from] quick_xml::DeError),
    #[error("Failed to serialize reply: {0}")]
    Encode(#[from] quick_xml::SeError),
    #[error("Verification code not found")]
    CodeNotFound,
    #[error("Verification code already used")]
    CodeAlreadyUsed,
    #[error("Verification code expired")]
    CodeExpired,
    #[error("User has not subscribed to the account")]
    NotSubscribed,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Platform API error: {0}")]
    Platform(String),
    #[error("Internal server error")]
    Internal,
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::SignatureInvalid => {
                tracing::debug!("Rejected request with invalid signature");
                (StatusCode::FORBIDDEN, "Signature verification failed".to_string())
            }
            Self::Decode(e) => {
                tracing::error!(error = %e, "Failed to decode inbound message");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to parse message".to_string())
            }
            Self::Encode(e) => {
                tracing::error!(error = %e, "Failed to serialize reply");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate reply".to_string())
            }
            Self::CodeNotFound => {
                tracing::debug!("Verification code not found");
                (StatusCode::NOT_FOUND, "Verification code not found".to_string())
            }
            Self::CodeAlreadyUsed => {
                tracing::debug!("Verification code already used");
                (StatusCode::CONFLICT, "Verification code already used".to_string())
            }
            Self::CodeExpired => {
                tracing::debug!("Verification code expired");
                (StatusCode::GONE, "Verification code expired".to_string())
            }
            Self::NotSubscribed => {
                tracing::debug!("Profile lookup for unsubscribed user");
                (StatusCode::FORBIDDEN, "User has not subscribed to the account".to_string())
            }
            Self::BadRequest(msg) => {
                tracing::debug!(message = %msg, "Bad request");
                (StatusCode::BAD_REQUEST, msg)
            }
            Self::Platform(msg) => {
                tracing::error!(message = %msg, "Platform API error");
                (StatusCode::BAD_GATEWAY, "Platform API error".to_string())
            }
            Self::Internal => {
                tracing::error!("Internal server error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
