use actix_web::http::header;
use actix_web::{web, HttpResponse};

use crate::error::ServiceError;
use crate::policy::{Endpoint, COLLECTION_METHODS, RECORD_METHODS};
use crate::request::{Method, TargetRef};
use crate::user::{CreatePayload, UpdatePayload};

use super::{blocking, AppState, Caller};

fn target(pk: &str) -> TargetRef {
    TargetRef::parse(Some(pk))
}

fn allow_header(methods: &[Method]) -> String {
    methods
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(super) async fn list(
    state: web::Data<AppState>,
    caller: Caller,
) -> Result<HttpResponse, ServiceError> {
    let users = state.accounts.list(caller.meta(TargetRef::Collection))?;
    Ok(HttpResponse::Ok().json(users))
}

pub(super) async fn create(
    state: web::Data<AppState>,
    caller: Caller,
    payload: web::Json<CreatePayload>,
) -> Result<HttpResponse, ServiceError> {
    let accounts = state.accounts.clone();
    let meta = caller.meta(TargetRef::Collection);
    let payload = payload.into_inner();

    let user = blocking(move || accounts.create(meta, payload)).await?;
    Ok(HttpResponse::Created().json(user))
}

pub(super) async fn retrieve(
    state: web::Data<AppState>,
    caller: Caller,
    pk: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user = state.accounts.retrieve(caller.meta(target(&pk)))?;
    Ok(HttpResponse::Ok().json(user))
}

pub(super) async fn update(
    state: web::Data<AppState>,
    caller: Caller,
    pk: web::Path<String>,
    payload: web::Json<UpdatePayload>,
) -> Result<HttpResponse, ServiceError> {
    let accounts = state.accounts.clone();
    let meta = caller.meta(target(&pk));
    let payload = payload.into_inner();

    let user = blocking(move || accounts.update(meta, payload)).await?;
    Ok(HttpResponse::Ok().json(user))
}

pub(super) async fn destroy(
    state: web::Data<AppState>,
    caller: Caller,
    pk: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    state.accounts.delete(caller.meta(target(&pk)))?;
    Ok(HttpResponse::NoContent().finish())
}

pub(super) async fn collection_options(
    state: web::Data<AppState>,
    caller: Caller,
) -> Result<HttpResponse, ServiceError> {
    state
        .accounts
        .authorize(caller.meta(TargetRef::Collection), Endpoint::Collection)?;
    Ok(HttpResponse::Ok()
        .insert_header((header::ALLOW, allow_header(COLLECTION_METHODS)))
        .finish())
}

pub(super) async fn record_options(
    state: web::Data<AppState>,
    caller: Caller,
    pk: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    state
        .accounts
        .authorize(caller.meta(target(&pk)), Endpoint::Record)?;
    Ok(HttpResponse::Ok()
        .insert_header((header::ALLOW, allow_header(RECORD_METHODS)))
        .finish())
}
