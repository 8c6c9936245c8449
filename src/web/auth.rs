use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, ServiceError, NON_FIELD_ERRORS};
use crate::secret::Secret;

use super::{blocking, AppState};

const REQUIRED: &str = "This field is required.";

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<Secret<String>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenRequest {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
}

fn require<T>(errors: &mut FieldErrors, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.add(field, REQUIRED);
    }
    value
}

pub(super) async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ServiceError> {
    let LoginRequest { username, password } = body.into_inner();
    let mut errors = FieldErrors::new();
    let username = require(&mut errors, "username", username.filter(|u| !u.is_empty()));
    let password = require(&mut errors, "password", password);
    let (Some(username), Some(password)) = (username, password) else {
        return Err(errors.into());
    };

    let accounts = state.accounts.clone();
    let user = blocking(move || accounts.authenticate(&username, password.expose_secret())).await?;
    let token = state.tokens.issue(&user)?;

    tracing::info!(user_id = user.id, "token issued");
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

pub(super) async fn verify(
    state: web::Data<AppState>,
    body: web::Json<TokenRequest>,
) -> Result<HttpResponse, ServiceError> {
    let mut errors = FieldErrors::new();
    let Some(token) = require(&mut errors, "token", body.into_inner().token) else {
        return Err(errors.into());
    };

    let claims = state.tokens.decode(&token)?;
    state
        .accounts
        .subject(&claims)
        .map_err(|err| FieldErrors::single(NON_FIELD_ERRORS, err.to_string()))?;
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

pub(super) async fn refresh(
    state: web::Data<AppState>,
    body: web::Json<TokenRequest>,
) -> Result<HttpResponse, ServiceError> {
    let mut errors = FieldErrors::new();
    let Some(token) = require(&mut errors, "token", body.into_inner().token) else {
        return Err(errors.into());
    };

    let (claims, token) = state.tokens.refresh(&token)?;
    state
        .accounts
        .subject(&claims)
        .map_err(|err| FieldErrors::single(NON_FIELD_ERRORS, err.to_string()))?;

    tracing::debug!(user_id = claims.user_id, "token refreshed");
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}
