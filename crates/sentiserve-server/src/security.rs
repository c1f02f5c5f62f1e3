//! Request authentication

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::routes::ApiError;
use crate::state::AppState;

/// Header carrying the API token
pub const TOKEN_HEADER: &str = "x-token";

/// Compare a presented token with the expected one in constant time
pub fn token_matches(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Middleware rejecting requests without the configured token
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorized = request
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map_or(false, |token| token_matches(&state.config.auth_token, token));

    if authorized {
        Ok(next.run(request).await)
    } else {
        warn!(path = %request.uri().path(), "Rejected request with invalid or missing token");
        Err(ApiError::Unauthorized)
    }
}
