use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use shared::AppError;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::state::AppState;

/// Identity taken from a validated bearer token. Whether the user exists,
/// is active, and may perform the action is decided by the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: String,
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing Authorization header");
            AppError::authentication(
                "Authentication required. Please provide a valid Bearer token.",
            )
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| {
            warn!("Invalid Authorization header format");
            AppError::authentication("Authorization header must be in format: Bearer <token>")
        })?
        .trim();

    if token.is_empty() {
        warn!("Empty JWT token");
        return Err(AppError::authentication("Please provide a valid JWT token."));
    }

    Ok(token)
}

/// Validate the bearer token and put the `CurrentUser` into the request
/// extensions for the handlers.
pub async fn extract_current_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = {
        let token = bearer_token(request.headers())?;
        state.tokens.validate_token(token).map_err(|e| {
            warn!("JWT validation failed: {}", e);
            e
        })?
    };

    debug!(
        user_id = %claims.sub,
        token_id = ?claims.jti,
        "JWT authentication successful"
    );

    let current_user = CurrentUser { user_id: claims.sub };

    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        let headers = headers("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header_rejected() {
        let err = bearer_token(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AppError::Authentication { .. }));
    }

    #[test]
    fn test_wrong_scheme_rejected() {
        assert!(bearer_token(&headers("Basic dXNlcjpwYXNz")).is_err());
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(bearer_token(&headers("Bearer    ")).is_err());
    }
}
