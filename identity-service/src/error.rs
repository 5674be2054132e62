use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common_auth::{AuthError, GuardError};
use serde::Serialize;
use thiserror::Error;

pub type IdentityResult<T> = Result<T, IdentityError>;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("argument is empty or invalid: {0}")]
    ArgumentInvalid(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0} already exists")]
    AlreadyExists(&'static str),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("token issued by '{0}' is not trusted")]
    WrongIssuer(String),
    #[error("wrong token kind: expected {expected}, got {actual}")]
    WrongTokenKind {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("operation cancelled")]
    Cancelled,
    #[error("credential hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Token(AuthError),
    #[error("{0}")]
    Forbidden(String),
    #[error("{} of the requested deletions failed: {}", .0.len(), .0.join("; "))]
    Aggregate(Vec<String>),
}

impl From<AuthError> for IdentityError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::WrongIssuer(issuer) => IdentityError::WrongIssuer(issuer),
            AuthError::WrongTokenKind { expected, actual } => {
                IdentityError::WrongTokenKind { expected, actual }
            }
            other => IdentityError::Token(other),
        }
    }
}

impl From<GuardError> for IdentityError {
    fn from(value: GuardError) -> Self {
        let (_, message) = value.into_response();
        IdentityError::Forbidden(message)
    }
}

impl IdentityError {
    pub fn status(&self) -> StatusCode {
        match self {
            IdentityError::ArgumentInvalid(_) => StatusCode::BAD_REQUEST,
            IdentityError::NotFound(_) => StatusCode::NOT_FOUND,
            IdentityError::AlreadyExists(_) => StatusCode::CONFLICT,
            IdentityError::InvalidCredentials
            | IdentityError::WrongIssuer(_)
            | IdentityError::WrongTokenKind { .. } => StatusCode::UNAUTHORIZED,
            IdentityError::Token(AuthError::Signing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            IdentityError::Token(_) => StatusCode::UNAUTHORIZED,
            IdentityError::Forbidden(_) => StatusCode::FORBIDDEN,
            // client closed request
            IdentityError::Cancelled => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::SERVICE_UNAVAILABLE)
            }
            IdentityError::Hashing(_) | IdentityError::Aggregate(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            IdentityError::ArgumentInvalid(_) => "ARGUMENT_INVALID",
            IdentityError::NotFound(_) => "NOT_FOUND",
            IdentityError::AlreadyExists(_) => "ALREADY_EXISTS",
            IdentityError::InvalidCredentials => "INVALID_CREDENTIALS",
            IdentityError::WrongIssuer(_) => "WRONG_ISSUER",
            IdentityError::WrongTokenKind { .. } => "WRONG_TOKEN_KIND",
            IdentityError::Cancelled => "CANCELLED",
            IdentityError::Hashing(_) => "HASHING_FAILED",
            IdentityError::Token(_) => "TOKEN_INVALID",
            IdentityError::Forbidden(_) => "FORBIDDEN",
            IdentityError::Aggregate(_) => "PARTIAL_FAILURE",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            IdentityError::InvalidCredentials => {
                "Invalid credentials. Please try again.".to_string()
            }
            IdentityError::Hashing(_) | IdentityError::Token(AuthError::Signing(_)) => {
                "Unable to complete the request.".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorResponse {
            code: self.code(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
