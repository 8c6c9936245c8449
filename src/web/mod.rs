//! actix-web surface for the account service.
//!
//! Handlers only translate between HTTP and [`AccountService`]: they build a
//! [`RequestMeta`](crate::RequestMeta) from the [`Caller`] and the path, and
//! map [`ServiceError`](crate::ServiceError) back to a status code. All
//! access decisions happen in the service.

mod auth;
mod error;
mod extract;
mod users;

use std::sync::Arc;

use actix_web::web;

use crate::error::ServiceError;
use crate::service::AccountService;
use crate::token::TokenService;

pub use extract::{Caller, REQUEST_ID_HEADER};

/// Shared per-process state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Account operations
    pub accounts: AccountService,
    /// Token issuance and verification
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// Bundles the two services.
    pub fn new(accounts: AccountService, tokens: TokenService) -> Self {
        Self {
            accounts,
            tokens: Arc::new(tokens),
        }
    }
}

/// Mounts `/api/v1/users/` and `/api/auth/*`.
///
/// The caller registers `web::Data<AppState>` on the `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ServiceError::Malformed(format!("JSON parse error - {}", err)).into()
    }))
    .service(
        web::resource("/api/v1/users/")
            .route(web::get().to(users::list))
            .route(web::head().to(users::list))
            .route(web::method(actix_web::http::Method::OPTIONS).to(users::collection_options))
            .route(web::post().to(users::create)),
    )
    .service(
        web::resource("/api/v1/users/{pk}/")
            .route(web::get().to(users::retrieve))
            .route(web::head().to(users::retrieve))
            .route(web::method(actix_web::http::Method::OPTIONS).to(users::record_options))
            .route(web::put().to(users::update))
            .route(web::patch().to(users::update))
            .route(web::delete().to(users::destroy)),
    )
    .service(
        web::scope("/api/auth")
            .route("/login/", web::post().to(auth::login))
            .route("/refresh/", web::post().to(auth::refresh))
            .route("/verify/", web::post().to(auth::verify)),
    );
}

/// Runs CPU-bound work (password hashing) off the async workers.
async fn blocking<F, R>(f: F) -> Result<R, ServiceError>
where
    F: FnOnce() -> Result<R, ServiceError> + Send + 'static,
    R: Send + 'static,
{
    web::block(f)
        .await
        .map_err(|err| ServiceError::Internal(err.to_string()))?
}
