use actix_web::{error::BlockingError, http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::helper::upload_helpers::UploadFormError;
use crate::storage::PersistenceError;
use crate::workflow::{UploadError, UNWRITABLE_REMEDIATION};

pub mod admin;
pub mod api;
pub mod public;

/// Failures of the JSON API. Every variant answers `{"error": ...}`; an
/// unwritable backend also carries the remediation text for the admin UI.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NoFile(&'static str),
    #[error("Not logged in.")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("Storage backend is not writable.")]
    Unwritable(String),
    #[error("Upload failed.")]
    UploadFailed(String),
    #[error("Failed to read content.")]
    ReadFailed,
    #[error("Failed to save content.")]
    WriteFailed,
    #[error("Not found.")]
    NotFound,
    #[error("Internal server error.")]
    Internal,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoFile(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Unwritable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::UploadFailed(_) | ApiError::ReadFailed | ApiError::WriteFailed | ApiError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Unwritable(_) => json!({ "error": self.to_string(), "remediation": UNWRITABLE_REMEDIATION }),
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<UploadFormError> for ApiError {
    fn from(e: UploadFormError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::NoFileSelected => ApiError::NoFile("No file uploaded"),
            UploadError::UnwritableBackend(detail) => {
                log::error!("Upload rejected, backend not writable: {}", detail);
                ApiError::Unwritable(detail)
            }
            UploadError::UploadFailed(detail) => {
                log::error!("Upload failed: {}", detail);
                ApiError::UploadFailed(detail)
            }
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(e: PersistenceError) -> Self {
        log::error!("{}", e);
        match e {
            PersistenceError::ReadFailed(_) => ApiError::ReadFailed,
            PersistenceError::WriteFailed(_) => ApiError::WriteFailed,
        }
    }
}

impl From<BlockingError> for ApiError {
    fn from(e: BlockingError) -> Self {
        log::error!("Blocking task failed: {}", e);
        ApiError::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BackendError, StorageError};
    use actix_web::body::to_bytes;

    async fn body_json(err: ApiError) -> serde_json::Value {
        let bytes = to_bytes(err.error_response().into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_web::test]
    async fn unwritable_backend_carries_remediation() {
        let err = ApiError::from(UploadError::from(StorageError::Unwritable("read-only".into())));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(err).await;
        assert_eq!(body["remediation"], UNWRITABLE_REMEDIATION);
    }

    #[actix_web::test]
    async fn missing_file_is_a_bad_request() {
        let err = ApiError::from(UploadError::NoFileSelected);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(err).await, json!({ "error": "No file uploaded" }));
    }

    #[test]
    fn persistence_errors_map_to_500() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let err = ApiError::from(PersistenceError::WriteFailed(BackendError::Io(io)));
        assert!(matches!(err, ApiError::WriteFailed));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
