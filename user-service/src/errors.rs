use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::{BusinessError, Localizer, SuccessResponse};
use thiserror::Error;

/// Business error rendered in the request locale.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub BusinessError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.to_body(&Localizer::shared()))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Success body in the request locale with the code's status.
pub fn success(response: SuccessResponse) -> (StatusCode, Json<serde_json::Value>) {
    let status = StatusCode::from_u16(response.status()).unwrap_or(StatusCode::OK);
    (status, Json(response.to_body(&Localizer::shared())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use shared::{errors, success as codes};

    fn lookup() -> ApiResult<()> {
        let found: Result<(), BusinessError> = Err(BusinessError::new(errors::USER_NOT_FOUND));
        Ok(found?)
    }

    #[tokio::test]
    async fn test_business_error_keeps_code_and_status() {
        let err = lookup().unwrap_err();
        assert_eq!(err.to_string(), "USER_NOT_FOUND");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "USER_NOT_FOUND");
    }

    #[test]
    fn test_success_uses_code_status() {
        let (status, Json(body)) = success(SuccessResponse::new(codes::ROLE_CREATED));

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
    }
}
