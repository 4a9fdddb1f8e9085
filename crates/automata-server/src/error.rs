//! Error types for the transport layer.
//!
//! [`ApiError`] unifies service failures and request-decoding failures and
//! converts into an Axum response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. The body
//! is always an [`Ack`] carrying the [`ErrorKind`].

use automata_core::SessionError;
use automata_types::{Ack, ErrorKind};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The service rejected or failed the operation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The request body or query string could not be decoded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A session identifier could not be parsed from the request path.
    #[error("invalid session id: {0}")]
    InvalidId(String),
}

impl ApiError {
    /// The wire-level kind of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Session(err) => err.kind(),
            Self::InvalidRequest(_) | Self::InvalidId(_) => ErrorKind::InvalidRequest,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

/// HTTP status for an error kind.
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::SessionNotFound => StatusCode::NOT_FOUND,
        ErrorKind::SessionBusy => StatusCode::CONFLICT,
        ErrorKind::InvalidRequest | ErrorKind::IndexOutOfRange => StatusCode::BAD_REQUEST,
        ErrorKind::InvalidDimensions
        | ErrorKind::InvalidRuleSpecification
        | ErrorKind::IncompleteRuleSpecification
        | ErrorKind::InvalidStepCount
        | ErrorKind::InvalidInitialState => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::InternalComputationFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            error!(%kind, error = %self, "Request failed");
        } else {
            debug!(%kind, error = %self, "Request rejected");
        }
        (status, Json(Ack::error(kind, self.to_string()))).into_response()
    }
}
