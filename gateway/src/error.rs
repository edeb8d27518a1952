use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use converters::error::ConvertError;

/// Wraps `ConvertError` plus the upload-stage errors that never reach the
/// orchestration layer, and maps every variant to an HTTP status code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("upload exceeds the configured size limit")]
    UploadTooLarge,

    #[error("malformed multipart request: {0}")]
    Validation(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::UploadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Convert(err) => match err {
                ConvertError::Validation(_) => StatusCode::BAD_REQUEST,
                ConvertError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                ConvertError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
                ConvertError::ConvertTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                ConvertError::ConvertError { .. } => StatusCode::BAD_GATEWAY,
                ConvertError::Overload => StatusCode::BAD_GATEWAY,
                ConvertError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        tracing::warn!(error = %self, "request failed");
        HttpResponse::build(self.status_code()).body(self.to_string())
    }
}
