use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use shared::errors::AUTH_UNAUTHORIZED;
use shared::{with_locale, BusinessError, Localizer};
use std::sync::Arc;
use tracing::debug;

use crate::errors::ApiError;
use crate::AppState;

/// Verify the bearer token and require one of the configured admin roles.
/// The verified claims are stored in the request extensions.
pub async fn admin_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| {
            debug!("Missing or malformed authorization header");
            BusinessError::new(AUTH_UNAUTHORIZED)
        })?;

    let roles: Vec<&str> = state.config.admin_roles.iter().map(String::as_str).collect();
    let claims = state.verifier.verify(token, &roles).await?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Run the request in the locale negotiated from `Accept-Language`.
pub async fn locale_middleware(request: Request, next: Next) -> Response {
    let accept_language = request
        .headers()
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok());
    let locale = Localizer::shared().negotiate(accept_language);

    let mut response = with_locale(locale.clone(), next.run(request)).await;
    if let Ok(value) = HeaderValue::from_str(&locale) {
        response.headers_mut().insert(header::CONTENT_LANGUAGE, value);
    }
    response
}
