//! Error types for the server

use crate::error::StressError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Classifier(#[from] StressError),
}

impl ServerError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            }
            ServerError::Classifier(err) => match err {
                StressError::ModelNotReady | StressError::InvalidInput(_) => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                StressError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                StressError::SchemaError(_) | StressError::InsufficientData(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
                }
                StressError::DataUnavailable(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
                StressError::CorruptSnapshot(_)
                | StressError::Io(_)
                | StressError::Serialization(_) => {
                    tracing::error!(detail = %err, "Classifier error");
                    (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
                }
            },
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
