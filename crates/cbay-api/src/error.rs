use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use cbay_db::{Conflict, NotFound};
use cbay_types::api::ErrorBody;
use cbay_types::filter::FilterError;
use cbay_types::validation::ValidationError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidArgument(#[from] FilterError),

    /// Body, path or query that could not be decoded at all.
    #[error("{0}")]
    Malformed(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error(transparent)]
    Conflict(#[from] Conflict),

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) | Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) | Self::Malformed(_) => "invalid_argument",
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }
}

/// Store errors carry their classification inside the `anyhow::Error`.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<NotFound>() {
            Ok(e) => return Self::NotFound(e),
            Err(err) => err,
        };
        let err = match err.downcast::<ValidationError>() {
            Ok(e) => return Self::Validation(e),
            Err(err) => err,
        };
        match err.downcast::<Conflict>() {
            Ok(e) => Self::Conflict(e),
            Err(err) => Self::Internal(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: self.kind().to_string(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_their_classification() {
        let err = ApiError::from(anyhow::Error::new(NotFound::new("user", "42")));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = ApiError::from(anyhow::Error::new(ValidationError::TooFewMembers));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ApiError::from(anyhow::Error::new(Conflict::new("user", "a@tamu.edu")));
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err = ApiError::from(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
