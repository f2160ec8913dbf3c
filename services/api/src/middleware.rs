//! Authentication middleware
//!
//! The bearer variant runs as a route layer: it parses the Authorization
//! header, verifies the token through the token service, and puts the
//! resolved [`User`] into the request extensions for handlers to pick up.
//! A missing or malformed header is a 400; a header that parses but does
//! not verify is a 401.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Bearer authentication middleware
pub async fn bearer_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    let token = extract_bearer(header)?.to_string();

    let user = state.token_service.verify(&token).await?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Pull the token out of an `Authorization: Bearer <token>` header value
pub fn extract_bearer(header: Option<&str>) -> ApiResult<&str> {
    let header =
        header.ok_or_else(|| ApiError::Validation("authorization header required".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Validation("malformed authorization header".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_ok() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header_is_validation_error() {
        assert!(matches!(extract_bearer(None), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_malformed_header_is_validation_error() {
        for bad in ["Basic dXNlcjpwYXNz", "Bearer", "Bearer ", "token abc"] {
            assert!(
                matches!(extract_bearer(Some(bad)), Err(ApiError::Validation(_))),
                "expected validation error for {:?}",
                bad
            );
        }
    }
}
