use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sharedspace_types::api::ErrorResponse;
use thiserror::Error;

use crate::images::TranscodeError;
use crate::storage::StorageError;

/// Public message for every failure the client is not told about in detail.
pub const GENERIC_ERROR_MESSAGE: &str = "There was a problem on the server";

const INCORRECT_CREDENTIALS_MESSAGE: &str = "Incorrect username or password";

/// Application error type.
///
/// `Display` is the internal diagnostic that goes to the logs;
/// [`AppError::public_message`] is the only text a client ever sees.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid id")]
    InvalidId,

    #[error("Wrong image format: {0}")]
    InvalidImageFormat(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(#[from] TranscodeError),

    #[error("Origin {0} not allowed by CORS")]
    NotAllowedByCors(String),

    #[error("No token provided")]
    NoToken,

    #[error("Missing Bearer in token")]
    MissingBearer,

    #[error("Incorrect credentials: {0}")]
    IncorrectCredentials(&'static str),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Location not found")]
    LocationNotFound,

    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("User already exists")]
    AlreadyRegistered,

    #[error("Upload exceeds the maximum size")]
    PayloadTooLarge,

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Database error: {0}")]
    Database(anyhow::Error),

    #[error("Object storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvalidId
            | AppError::InvalidImageFormat(_)
            | AppError::ImageProcessing(_)
            | AppError::NotAllowedByCors(_) => StatusCode::BAD_REQUEST,
            AppError::NoToken | AppError::MissingBearer | AppError::IncorrectCredentials(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::LocationNotFound | AppError::UnknownEndpoint(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyRegistered => StatusCode::CONFLICT,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Token(_)
            | AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Io(_)
            | AppError::TaskJoin(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn public_message(&self) -> &str {
        match self {
            AppError::Validation(msg) => msg,
            AppError::InvalidId => "You provided an invalid id",
            AppError::InvalidImageFormat(_) => {
                "Wrong image format. Accepted formats: png, jpg, jpeg, avif and webp"
            }
            AppError::ImageProcessing(_) => "The image could not be processed",
            AppError::NotAllowedByCors(_) => "Not allowed by CORS",
            AppError::NoToken => "No token provided",
            AppError::MissingBearer => "Bad token",
            AppError::IncorrectCredentials(_) => INCORRECT_CREDENTIALS_MESSAGE,
            AppError::Forbidden(_) => "That action is forbidden",
            AppError::LocationNotFound => "Location not found",
            AppError::UnknownEndpoint(_) => "Unknown Endpoint",
            AppError::AlreadyRegistered => "That username is taken",
            AppError::PayloadTooLarge => "The image is too large",
            AppError::Token(_)
            | AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Io(_)
            | AppError::TaskJoin(_)
            | AppError::Internal(_) => GENERIC_ERROR_MESSAGE,
        }
    }
}

/// Implement IntoResponse to convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("There was an error: {}", self);
        } else {
            tracing::warn!("Request rejected ({}): {}", status.as_u16(), self);
        }

        let body = Json(ErrorResponse {
            error: self.public_message().to_string(),
        });

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::Validation(format!("Invalid form data: {}", err.body_text()))
        }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Validation(format!("Invalid form data: {}", rejection.body_text()))
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_client_errors_expose_public_message() {
        let (status, body) = response_parts(AppError::Forbidden("owner mismatch".into())).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "That action is forbidden");
    }

    #[tokio::test]
    async fn test_server_errors_hide_internal_detail() {
        let err = AppError::Database(anyhow::anyhow!("disk I/O error at page 42"));
        let (status, body) = response_parts(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], GENERIC_ERROR_MESSAGE);
        assert_eq!(body.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_login_failures_share_public_message() {
        let unknown = AppError::IncorrectCredentials("Username not found");
        let wrong = AppError::IncorrectCredentials("Incorrect password");

        assert_ne!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.public_message(), wrong.public_message());
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_validation_message_is_passed_through() {
        let err = AppError::Validation("Username is required\nPassword is required".into());

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Username is required\nPassword is required");
    }
}
