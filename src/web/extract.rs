//! Maps an incoming request to the caller identity the policy works with.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::error::{ServiceError, Violation, ViolationKind};
use crate::request::{Method, Principal, RequestMeta, TargetRef};
use crate::service::SubjectError;

use super::AppState;

/// Header a client or proxy may use to supply its own request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const BEARER: &str = "bearer";
const NO_CREDENTIALS: &str = "Invalid Authorization header. No credentials provided.";
const SPACES: &str = "Invalid Authorization header. Credentials string should not contain spaces.";
const UNKNOWN_SUBJECT: &str = "Invalid signature.";

/// Who is calling, resolved from the `Authorization` header.
///
/// A missing header, or one with a scheme other than `Bearer`, yields an
/// anonymous caller. A bearer header that does not check out rejects the
/// request with 401 before the handler runs.
#[derive(Debug, Clone)]
pub struct Caller {
    request_id: String,
    principal: Principal,
    method: Method,
}

impl Caller {
    /// The request id, taken from `X-Request-Id` or freshly generated.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The resolved caller.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Policy input for a request against `target`.
    pub fn meta(&self, target: TargetRef) -> RequestMeta {
        RequestMeta {
            request_id: self.request_id.clone(),
            principal: self.principal.clone(),
            method: self.method,
            target,
        }
    }

    fn from_request_sync(req: &HttpRequest) -> Result<Self, ServiceError> {
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let method: Method = req
            .method()
            .as_str()
            .parse()
            .map_err(|_| ServiceError::Internal(format!("unrouted method {}", req.method())))?;

        let principal = match bearer_token(req)? {
            None => Principal::anonymous(),
            Some(token) => {
                let state = req
                    .app_data::<Data<AppState>>()
                    .ok_or_else(|| ServiceError::Internal("application state missing".to_string()))?;
                let claims = state.tokens.decode(token).map_err(|err| {
                    tracing::debug!(request_id = %request_id, error = %err, "bearer token rejected");
                    unauthenticated(err.to_string())
                })?;
                let user = state
                    .accounts
                    .subject(&claims)
                    .map_err(|err| unauthenticated(bearer_subject_message(err)))?;
                user.principal()
            }
        };

        Ok(Self {
            request_id,
            principal,
            method,
        })
    }
}

impl FromRequest for Caller {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::from_request_sync(req))
    }
}

/// Bearer auth does not say whether the account behind a token was deleted.
fn bearer_subject_message(err: SubjectError) -> String {
    match err {
        SubjectError::Missing => UNKNOWN_SUBJECT.to_string(),
        SubjectError::Disabled => err.to_string(),
    }
}

fn unauthenticated(message: String) -> ServiceError {
    Violation::new(ViolationKind::Unauthenticated, message).into()
}

/// Returns the token of a `Bearer` authorization header.
///
/// Other schemes are not ours to judge and are ignored.
fn bearer_token(req: &HttpRequest) -> Result<Option<&str>, ServiceError> {
    let Some(header) = req.headers().get(AUTHORIZATION) else {
        return Ok(None);
    };
    let Ok(header) = header.to_str() else {
        return Ok(None);
    };

    let mut parts = header.split_whitespace();
    match parts.next() {
        Some(scheme) if scheme.eq_ignore_ascii_case(BEARER) => {}
        _ => return Ok(None),
    }
    let Some(token) = parts.next() else {
        return Err(unauthenticated(NO_CREDENTIALS.to_string()));
    };
    if parts.next().is_some() {
        return Err(unauthenticated(SPACES.to_string()));
    }
    Ok(Some(token))
}
