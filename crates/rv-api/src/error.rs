//! HTTP mapping for `AppError`.

use std::fmt;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use rv_core::error::AppError;

/// `AppError` as an actix response. Infrastructure detail is logged, never returned.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl ApiError {
    /// The message the caller gets to see.
    pub fn public_message(&self) -> String {
        match &self.0 {
            AppError::ValidationError(msg) | AppError::Conflict(msg) => msg.clone(),
            AppError::NotFound(kind, _) => format!("{} not found", kind),
            AppError::Unauthorized(_) => "authentication required".into(),
            AppError::AccountDisabled => "account is disabled".into(),
            AppError::InvalidCredentials => "invalid email or password".into(),
            AppError::UpstreamFailure(_) | AppError::Internal(_) => "internal server error".into(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            AppError::ValidationError(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) | AppError::AccountDisabled | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::UpstreamFailure(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("request failed: {}", self.0);
        } else {
            log::debug!("request rejected ({}): {}", status, self.0);
        }
        HttpResponse::build(status).json(serde_json::json!({ "error": self.public_message() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::validation("rating"), StatusCode::BAD_REQUEST),
            (AppError::Conflict("dup".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("no token".into()), StatusCode::UNAUTHORIZED),
            (AppError::AccountDisabled, StatusCode::UNAUTHORIZED),
            (AppError::not_found("Post", 9), StatusCode::NOT_FOUND),
            (AppError::upstream("disk full"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status_code(), status);
        }
    }

    #[test]
    fn test_upstream_detail_is_hidden() {
        let err = ApiError(AppError::upstream("sqlite: database is locked at /var/db"));
        assert_eq!(err.public_message(), "internal server error");

        let err = ApiError(AppError::Unauthorized("invalid session token: ExpiredSignature".into()));
        assert_eq!(err.public_message(), "authentication required");
    }
}
