//! Request middleware: session cookie and bearer authentication

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::state::SharedState;

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "oven_session";

/// Session the request belongs to; one session owns one oven
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

/// Attach a [`SessionId`] to every request, issuing a new cookie when the
/// client has none.
pub async fn session(mut req: Request, next: Next) -> Response {
    let existing = req
        .headers()
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(session_from_cookies);

    let (id, is_new) = match existing {
        Some(id) => (id, false),
        None => (uuid::Uuid::new_v4().to_string(), true),
    };

    req.extensions_mut().insert(SessionId(id.clone()));
    let mut response = next.run(req).await;

    if is_new {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!("Could not build session cookie: {}", e),
        }
    }

    response
}

/// Reject requests without a valid `Authorization: Bearer` token.
/// The token's claims are available to handlers as an extension.
pub async fn require_auth(
    State(state): State<SharedState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| {
            tracing::debug!("Missing bearer token for {} {}", req.method(), req.uri());
            ApiError::Unauthorized("Authentication token not provided")
        })?;

    let claims = state.auth.validate_token(token).ok_or_else(|| {
        tracing::warn!("Rejected token for {} {}", req.method(), req.uri());
        ApiError::Unauthorized("Invalid or expired token")
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Token from a `Bearer <token>` header value
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty() && !token.contains(char::is_whitespace)).then_some(token)
}

/// Session id from a `Cookie` header value
fn session_from_cookies(cookies: &str) -> Option<String> {
    cookies
        .split(';')
        .filter_map(|c| c.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|v| !v.is_empty())
}
