//! Pipeline errors
//!
//! Every failure a request can hit ends up as an [`AppError`], which the
//! response writer turns into a structured JSON body with a fixed status.

use hyper::{Method, StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::point::DomainError;
use crate::validation::FieldError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no route for {method} {path}")]
    NotFound { method: Method, path: String },

    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation failed: {} error(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("server is at its limit of {max} connections")]
    Overloaded { max: u64 },
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub status: &'static str,
    pub error_detail: ErrorDetail<'a>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail<'a> {
    pub code: u16,
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<&'a [FieldError]>,
}

impl AppError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Domain(e) => match e {
                DomainError::InvalidAmount { .. } => StatusCode::BAD_REQUEST,
                DomainError::UserNotFound { .. } | DomainError::HistoryNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                DomainError::InsufficientPoint { .. } => StatusCode::CONFLICT,
                DomainError::BalanceLimitExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Overloaded { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable error kind
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::MethodNotAllowed { .. } => "method_not_allowed",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::BadRequest(_) => "bad_request",
            Self::Validation(_) => "validation",
            Self::Domain(e) => match e {
                DomainError::UserNotFound { .. } => "user_not_found",
                DomainError::HistoryNotFound { .. } => "history_not_found",
                DomainError::InvalidAmount { .. } => "invalid_amount",
                DomainError::InsufficientPoint { .. } => "insufficient_point",
                DomainError::BalanceLimitExceeded { .. } => "balance_limit_exceeded",
                DomainError::Storage(_) => "internal",
            },
            Self::Overloaded { .. } => "overloaded",
        }
    }

    /// Server-side failures; their details stay in the log
    pub fn is_internal(&self) -> bool {
        self.status() == StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn body(&self) -> ErrorBody<'_> {
        let message = if self.is_internal() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        let fields = match self {
            Self::Validation(errors) => Some(errors.as_slice()),
            _ => None,
        };

        ErrorBody {
            status: "error",
            error_detail: ErrorDetail {
                code: self.status().as_u16(),
                kind: self.kind(),
                message,
                fields,
            },
        }
    }
}
