//! rusty-reviews/crates/rv-api/src/middleware.rs Middleware
//!
//! Request logging, CORS, security headers and the per-request session
//! enrichment step.

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::HttpRequest;
use rv_core::error::AppError;
use rv_core::models::SessionUser;

use crate::error::ApiError;
use crate::handlers::AppState;

/// Name of the cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "session";

// Returns a standard set of middleware for the Rusty-Reviews API.
pub fn standard_middleware() -> Logger {
    // remote-ip "request-line" status-code response-size "referrer" "user-agent"
    Logger::default()
}

// Configures CORS (Cross-Origin Resource Sharing)
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600)
}

pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .add((header::REFERRER_POLICY, "strict-origin-when-cross-origin"))
        .add((
            header::CONTENT_SECURITY_POLICY,
            "default-src 'self'; img-src 'self' data:; object-src 'none'; frame-ancestors 'none'",
        ))
}

/// `Authorization: Bearer <jwt>`, falling back to the session cookie.
pub fn session_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        req.cookie(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// The caller's session rebuilt from the live user row, if any.
/// A bad or stale token reads as anonymous.
pub async fn optional_session(req: &HttpRequest, state: &AppState) -> Option<SessionUser> {
    let token = session_token(req)?;
    match state.sessions.materialize(&token).await {
        Ok(user) => Some(user),
        Err(e) => {
            log::debug!("ignoring session: {}", e);
            None
        }
    }
}

/// Like [`optional_session`], but a missing session is an error.
pub async fn require_session(req: &HttpRequest, state: &AppState) -> Result<SessionUser, ApiError> {
    let token = session_token(req)
        .ok_or_else(|| AppError::Unauthorized("no session token".into()))?;
    Ok(state.sessions.materialize(&token).await?)
}
