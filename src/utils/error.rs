use axum::{
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::error::{ErrorKind as DriverErrorKind, WriteFailure};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::ValidationErrors;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// MongoDB server code for a unique index violation.
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// Error categories understood by the normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    NotFound,
    Validation,
    Duplicate,
    Unauthorized,
    Forbidden,
    Upload,
    BadRequest,
    PayloadTooLarge,
    Internal,
}

/// API error, rendered as `{ "success": false, "error": <message> }`
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

/// Wire shape of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = ?self.kind, "{}", self.message);
        } else {
            tracing::warn!(kind = ?self.kind, status = status.as_u16(), "{}", self.message);
        }

        let body = ErrorBody {
            success: false,
            error: if self.message.is_empty() {
                "Server Error".to_string()
            } else {
                self.message
            },
        };

        (status, Json(body)).into_response()
    }
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ApiErrorKind::NotFound | ApiErrorKind::Upload => StatusCode::NOT_FOUND,
            ApiErrorKind::Validation | ApiErrorKind::Duplicate | ApiErrorKind::BadRequest => {
                StatusCode::BAD_REQUEST
            }
            ApiErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, message)
    }

    /// A path identifier that is not a well-formed ObjectId
    pub fn cast_error() -> Self {
        Self::not_found_error("Resource not found")
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Validation, message)
    }

    pub fn duplicate_error() -> Self {
        Self::new(ApiErrorKind::Duplicate, "Duplicate field value entered")
    }

    pub fn authentication_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Unauthorized, message)
    }

    pub fn not_authorized() -> Self {
        Self::authentication_error("Not authorized to access this route")
    }

    pub fn authorization_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Forbidden, message)
    }

    pub fn upload_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Upload, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::BadRequest, message)
    }

    pub fn payload_too_large() -> Self {
        Self::new(ApiErrorKind::PayloadTooLarge, "Request body too large")
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Internal, message)
    }

    pub fn server_error() -> Self {
        Self::internal_error("Server Error")
    }
}

/// Whether a driver error is a unique index violation
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        DriverErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        DriverErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        DriverErrorKind::InsertMany(insert_error) => insert_error
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|e| e.code == DUPLICATE_KEY_CODE)),
        _ => false,
    }
}

/// Flatten validator output into the field messages, ordered by field name
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field))
            })
        })
        .collect()
}

// From implementations for common error types
impl From<mongodb::error::Error> for ApiError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            return Self::duplicate_error();
        }
        tracing::error!("Database error: {}", err);
        Self::server_error()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation_error(validation_messages(&errors).join(", "))
    }
}

impl From<mongodb::bson::oid::Error> for ApiError {
    fn from(_: mongodb::bson::oid::Error) -> Self {
        Self::cast_error()
    }
}

impl From<mongodb::bson::ser::Error> for ApiError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        tracing::error!("BSON serialization error: {}", err);
        Self::server_error()
    }
}

impl From<mongodb::bson::de::Error> for ApiError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        tracing::error!("BSON deserialization error: {}", err);
        Self::server_error()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Internal error: {}", err);
        Self::server_error()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("HTTP client error: {}", err);
        Self::internal_error("External service error")
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::bad_request(err.body_text())
    }
}
