//! Authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use common::{AppError, AppResult};

use crate::state::AppState;

/// Session profile the bearer token belongs to.
///
/// Only the id is trusted; services re-read the profile before acting.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: Uuid,
}

/// Authentication middleware that validates session tokens.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&request)?;

    let claims = state.sessions.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        AppError::Unauthorized
    })?;

    request
        .extensions_mut()
        .insert(CurrentUser { id: claims.sub });

    Ok(next.run(request).await)
}

/// Extract bearer token from Authorization header.
fn extract_token(request: &Request<Body>) -> AppResult<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)
}
