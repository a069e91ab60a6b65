use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use simulpret_core::SimulationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    fn kind(&self) -> &'static str {
        match self {
            ServerError::Simulation(e) => e.kind(),
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::Config(_) => "config",
            ServerError::Internal(_) => "internal",
        }
    }
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::Simulation(SimulationError::InvalidInput { .. })
            | ServerError::Simulation(SimulationError::Serialization(_))
            | ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Simulation(SimulationError::Infeasible(_))
            | ServerError::Simulation(SimulationError::InsufficientData(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}
