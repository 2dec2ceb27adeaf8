use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use shared::{with_locale, Localizer};

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
