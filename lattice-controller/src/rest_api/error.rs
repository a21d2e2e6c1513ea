use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Errors that can occur while running the control plane server.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to bind the control plane listener to the configured address.
    #[error("Failed to bind control plane listener: {0}")]
    Bind(io::Error),

    /// Failed to serve the control plane.
    #[error("Failed to serve control plane: {0}")]
    Serve(io::Error),
}

/// Store failure inside a handler; renders as a bare 500.
pub(crate) struct ApiError(sqlx::Error);

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Control plane store failure: {}", self.0);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}
