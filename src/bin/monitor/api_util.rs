use crate::state_actor::ServiceNotFoundError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::{error::Error, fmt::Display};

#[derive(Debug, Clone, Copy)]
pub enum ApiError {
    ServiceNotFoundError,
}

impl From<ServiceNotFoundError> for ApiError {
    fn from(_: ServiceNotFoundError) -> Self {
        Self::ServiceNotFoundError
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceNotFoundError => ServiceNotFoundError.fmt(f),
        }
    }
}

impl Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::ServiceNotFoundError => (StatusCode::NOT_FOUND, ServiceNotFoundError.to_string()),
        }
        .into_response()
    }
}
