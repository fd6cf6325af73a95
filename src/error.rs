use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// ApiError
///
/// The single error type flowing out of the repository, the service layer and the handlers.
/// Every variant carries enough information for the `IntoResponse` implementation below,
/// which is the only place where an error is turned into an HTTP status and JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Generic 400 with a message. Used by the single-review lookup for a missing id.
    #[error("{0}")]
    BadRequest(String),

    /// The bootcamp referenced by a new review does not exist. Reported without a message.
    #[error("bootcamp not found")]
    BootcampNotFound,

    /// Path segment, query string or JSON body could not be parsed.
    #[error("{0}")]
    MalformedRequest(String),

    /// Payload failed field validation (title/text/rating).
    #[error("{0}")]
    Validation(String),

    /// A review for the same (bootcamp, user) pair already exists.
    #[error("Duplicate field value entered")]
    Duplicate,

    #[error("{0}")]
    NotFound(String),

    /// Caller is neither the owner of the review nor an administrator.
    #[error("{0}")]
    Forbidden(String),

    /// Caller's role is outside the set allowed on a route.
    #[error("User role {0} is not authorized to access this route")]
    RoleNotAuthorized(String),

    /// Missing, malformed or expired credentials.
    #[error("Not authorized to access this route")]
    Unauthorized,

    #[error("Server Error")]
    Database(#[source] sqlx::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::BootcampNotFound
            | ApiError::MalformedRequest(_)
            | ApiError::Validation(_)
            | ApiError::Duplicate => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            // Ownership failures share the 401 status of the authentication layer.
            ApiError::Forbidden(_) | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::RoleNotAuthorized(_) => StatusCode::FORBIDDEN,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message exposed to the client. `None` renders a bare `{"success": false}`.
    fn public_message(&self) -> Option<String> {
        match self {
            ApiError::BootcampNotFound => None,
            other => Some(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    /// Maps constraint violations onto their domain meaning; anything else is a 500.
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return ApiError::Duplicate;
            }
            if db_err.is_foreign_key_violation()
                && db_err
                    .constraint()
                    .is_some_and(|name| name.contains("bootcamp"))
            {
                return ApiError::BootcampNotFound;
            }
        }
        ApiError::Database(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::MalformedRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::MalformedRequest(rejection.body_text())
    }
}

/// ErrorBody
///
/// Uniform JSON error envelope: `{"success": false, "error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::Database(e) => tracing::error!(error = ?e, "persistence failure"),
            other => tracing::debug!(status = %status, error = %other, "request rejected"),
        }

        let body = ErrorBody {
            success: false,
            error: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}
