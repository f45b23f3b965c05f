use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::reports::{
    ReportImportError, RepositoryError, StateServiceError, TransmissionError,
};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Import(ReportImportError),
    Workflow(StateServiceError),
    Transmission(TransmissionError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Import(err) => write!(f, "report import error: {}", err),
            AppError::Workflow(err) => write!(f, "report workflow error: {}", err),
            AppError::Transmission(err) => write!(f, "transmission error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Workflow(err) => Some(err),
            AppError::Transmission(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Import(_) => StatusCode::BAD_REQUEST,
            AppError::Workflow(StateServiceError::Invalid(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Workflow(StateServiceError::Transition(_))
            | AppError::Workflow(StateServiceError::Repository(RepositoryError::Stale { .. }))
            | AppError::Transmission(TransmissionError::Repository(RepositoryError::Stale { .. }))
            | AppError::Transmission(TransmissionError::Empty)
            | AppError::Transmission(TransmissionError::Intransmissible { .. }) => {
                StatusCode::CONFLICT
            }
            AppError::Workflow(_) | AppError::Transmission(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ReportImportError> for AppError {
    fn from(value: ReportImportError) -> Self {
        Self::Import(value)
    }
}

impl From<StateServiceError> for AppError {
    fn from(value: StateServiceError) -> Self {
        Self::Workflow(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Workflow(StateServiceError::Repository(value))
    }
}

impl From<TransmissionError> for AppError {
    fn from(value: TransmissionError) -> Self {
        Self::Transmission(value)
    }
}
