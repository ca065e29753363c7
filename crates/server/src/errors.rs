use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use tracing::error;

use service::errors::ServiceError;

/// HTTP error envelope: `{timestamp, status, message, code?, errors?}`.
/// The timestamp is stamped here, at the boundary, when the response is built.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, code: Option<String>) -> Self {
        Self { status, message: message.into(), code, errors: None }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, Some("VAL-400".to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({
            "timestamp": Utc::now(),
            "status": self.status.as_u16(),
            "message": self.message,
        });
        if let Some(code) = self.code {
            body["code"] = serde_json::json!(code);
        }
        if let Some(errors) = self.errors {
            body["errors"] = serde_json::json!(errors);
        }
        (self.status, Json(body)).into_response()
    }
}

/// Fixed kind-to-status table. Database failures stay generic so internals
/// never leak to clients.
impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let code = err.code();
        let message = err.to_string();
        match err {
            ServiceError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, message, code),
            ServiceError::Duplicate { .. } | ServiceError::InUse { .. } => {
                Self::new(StatusCode::CONFLICT, message, code)
            }
            ServiceError::Validation { violations, .. } if violations.len() > 1 => Self {
                status: StatusCode::BAD_REQUEST,
                message: "Validation Failed".to_string(),
                code,
                errors: Some(violations),
            },
            ServiceError::Validation { .. } => Self::new(StatusCode::BAD_REQUEST, message, code),
            ServiceError::Db(detail) => {
                error!(error = %detail, "unexpected database error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "An unexpected error occurred", None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service::errors::EntityKind;

    #[test]
    fn not_found_maps_to_404() {
        let api: ApiError = ServiceError::not_found(EntityKind::ClassRoom, 1).into();
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.code.as_deref(), Some("CLS-404"));
        assert_eq!(api.message, "Classroom not found with id: 1");
    }

    #[test]
    fn duplicate_and_in_use_map_to_409() {
        let api: ApiError =
            ServiceError::duplicate(EntityKind::Student, "A student with email x@y already exists").into();
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.code.as_deref(), Some("STD-409"));

        let api: ApiError =
            ServiceError::in_use(EntityKind::Course, "Cannot delete course with enrolled students").into();
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.code.as_deref(), Some("CRS-409"));
    }

    #[test]
    fn multi_violation_payload_keeps_the_full_list() {
        let api: ApiError = ServiceError::violations(
            EntityKind::Trainer,
            vec!["First name must be between 2 and 50 characters".into(), "Email must be valid".into()],
        )
        .into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.message, "Validation Failed");
        assert_eq!(api.errors.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn db_failure_maps_to_generic_500() {
        let api: ApiError = ServiceError::Db("connection reset".into()).into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message, "An unexpected error occurred");
        assert!(api.code.is_none());
    }
}
