use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use crate::error::{ServiceError, ViolationKind};

const WWW_AUTHENTICATE: &str = "Bearer realm=\"api\"";
const NOT_FOUND: &str = "Not found.";
const SERVER_ERROR: &str = "A server error occurred.";

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Violation(v) => match v.kind {
                ViolationKind::Unauthenticated => StatusCode::UNAUTHORIZED,
                ViolationKind::Forbidden => StatusCode::FORBIDDEN,
            },
            ServiceError::Invalid(_)
            | ServiceError::Credential { .. }
            | ServiceError::Malformed(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Hashing(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        match self {
            ServiceError::Violation(v) => {
                if v.kind == ViolationKind::Unauthenticated {
                    builder.insert_header((
                        header::WWW_AUTHENTICATE,
                        HeaderValue::from_static(WWW_AUTHENTICATE),
                    ));
                }
                builder.json(json!({ "detail": v.message }))
            }
            ServiceError::Invalid(errors) => builder.json(errors),
            ServiceError::Credential { field, message } => {
                let mut body = serde_json::Map::new();
                body.insert(field.to_string(), json!(message));
                builder.json(body)
            }
            ServiceError::Malformed(message) => builder.json(json!({ "detail": message })),
            ServiceError::NotFound => builder.json(json!({ "detail": NOT_FOUND })),
            ServiceError::Hashing(_) | ServiceError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                builder.json(json!({ "detail": SERVER_ERROR }))
            }
        }
    }
}
