//! Error type returned by every service handler.
//!
//! Validation failures are raised before any store call. Store and object
//! store failures are logged here, once, when they are turned into a
//! response.

use crate::objects::ObjectError;
use crate::store::StoreError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use common::model::document::UploadRejection;
use common::model::progress::{StatusError, Step};
use common::model::user::SessionError;
use serde_json::json;
use thiserror::Error;

fn step_labels(steps: &[Step]) -> String {
    steps
        .iter()
        .map(|step| step.label())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("Cannot approve application. Incomplete steps: {}", step_labels(.0))]
    IncompleteChecklist(Vec<Step>),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Storage(#[from] ObjectError),
    #[error("{0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }

    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) | ServiceError::IncompleteChecklist(_) => {
                "validation_error"
            }
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Store(StoreError::NotFound(_)) => "not_found",
            ServiceError::Store(StoreError::Constraint { .. }) => "conflict",
            ServiceError::Store(_) => "store_error",
            ServiceError::Storage(ObjectError::NotFound(_)) => "not_found",
            ServiceError::Storage(ObjectError::InvalidPath(_)) => "validation_error",
            ServiceError::Storage(ObjectError::InvalidSignature | ObjectError::Expired) => {
                "forbidden"
            }
            ServiceError::Storage(_) => "storage_error",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}

impl From<UploadRejection> for ServiceError {
    fn from(rejection: UploadRejection) -> Self {
        ServiceError::Validation(rejection.to_string())
    }
}

impl From<StatusError> for ServiceError {
    fn from(err: StatusError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self.code() {
            "validation_error" => StatusCode::BAD_REQUEST,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "not_found" => StatusCode::NOT_FOUND,
            "conflict" => StatusCode::CONFLICT,
            "storage_error" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            log::error!("{}: {}", self.code(), self);
            "The request could not be completed, please try again later".to_string()
        } else {
            self.to_string()
        };

        let mut body = json!({
            "code": self.code(),
            "message": message,
        });
        if let ServiceError::IncompleteChecklist(steps) = self {
            body["details"] = json!({ "missing": steps });
        }
        HttpResponse::build(status).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_checklist_lists_every_label() {
        let err = ServiceError::IncompleteChecklist(Step::CHECKLIST.to_vec());
        assert_eq!(
            err.to_string(),
            "Cannot approve application. Incomplete steps: Application Submitted, Document Uploaded, Payment Verified"
        );
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_not_found_maps_to_404() {
        let err = ServiceError::from(StoreError::NotFound("courses"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
