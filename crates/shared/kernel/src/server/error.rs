use crate::render::RenderError;
use crate::security::identity::IdentityError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use expdj_database::DatabaseError;
use expdj_storage::StorageError;
use serde_json::json;
use std::borrow::Cow;
use tracing::{error, warn};

pub type ApiResult<T> = Result<T, ApiError>;

/// Handler-facing error. Rendered as `{"status": <code>, "error": "<message>"}`.
#[expdj_derive::expdj_error]
pub enum ApiError {
    #[http(status = 404)]
    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[http(status = 403)]
    #[error("Forbidden{}: {message}", format_context(.context))]
    Forbidden { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[http(status = 401)]
    #[error("Unauthorized{}: {message}", format_context(.context))]
    Unauthorized { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[http(status = 401)]
    #[error("Unauthorized{}: {source}", format_context(.context))]
    Identity { source: IdentityError, context: Option<Cow<'static, str>> },

    #[http(status = 400)]
    #[error("Bad request{}: {message}", format_context(.context))]
    BadRequest { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    // Extractor rejection carrying the status axum chose.
    #[error("Rejected request{}: {message}", format_context(.context))]
    Rejected { message: Cow<'static, str>, status: u16, context: Option<Cow<'static, str>> },

    #[error("Database error{}: {source}", format_context(.context))]
    Database { source: DatabaseError, context: Option<Cow<'static, str>> },

    #[error("Storage error{}: {source}", format_context(.context))]
    Storage { source: StorageError, context: Option<Cow<'static, str>> },

    #[error("Render error{}: {source}", format_context(.context))]
    Render { source: RenderError, context: Option<Cow<'static, str>> },

    #[error("Experiment library error{}: {message}", format_context(.context))]
    Library { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ApiError {
    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into(), context: None }
    }

    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Forbidden { message: message.into(), context: None }
    }

    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Unauthorized { message: message.into(), context: None }
    }

    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest { message: message.into(), context: None }
    }

    /// HTTP status of the response. Record store errors keep their own status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        let code = match self {
            Self::Rejected { status, .. } => *status,
            Self::Database { source, .. } => source.status_code(),
            _ => self.status_code(),
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(json!({ "status": status.as_u16(), "error": self.to_string() })))
            .into_response()
    }
}
