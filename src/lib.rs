//! User-account backend with staff/self access control.
//!
//! The crate enforces two rules around a single resource, user accounts:
//! - **Access policy**: staff may do anything, an authenticated user may
//!   only touch their own record, and anyone may register
//! - **Credential changes**: a password change has to name the current
//!   password, and the new one must be long enough, different and confirmed
//!
//! Every request passes through [`PolicyGate`], which resolves the `current`
//! sentinel and produces a [`Ctx`] holding the capability the request
//! earned. Record-level capabilities ([`RecordCap`]) are only granted once
//! the addressed record is loaded and checked.
//!
//! # Core Types
//!
//! - [`AccessPolicy`]: request-level and record-level decisions
//! - [`PolicyGate`]: builds a [`Ctx`] or reports a [`Violation`]
//! - [`CredentialValidator`](credential::CredentialValidator): password
//!   change and initial-password rules
//! - [`AccountService`]: list, create, retrieve, update and delete
//! - [`Secret<T>`]: wrapper that redacts passwords in logs
//!
//! # Examples
//!
//! ```
//! use account_policy::{AccessPolicy, Method, PolicyGate, Principal, RequestMeta, TargetRef};
//!
//! let policy = AccessPolicy::default();
//!
//! // A user addressing `current` gets their own record
//! let meta = RequestMeta {
//!     request_id: "req-123".to_string(),
//!     principal: Principal::user(2),
//!     method: Method::Put,
//!     target: TargetRef::Current,
//! };
//! let ctx = PolicyGate::new(meta, &policy).build().expect("self access");
//! assert_eq!(ctx.record_id(), Some(2));
//!
//! // ...but not anyone else's
//! let meta = RequestMeta {
//!     request_id: "req-124".to_string(),
//!     principal: Principal::user(2),
//!     method: Method::Get,
//!     target: TargetRef::Id(3),
//! };
//! assert!(PolicyGate::new(meta, &policy).build().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod capability;
pub mod config;
mod context;
pub mod credential;
mod error;
mod gate;
pub mod logging;
mod password;
pub mod policy;
mod request;
mod secret;
mod service;
pub mod store;
mod token;
mod user;
pub mod web;

pub use capability::{CreateCap, ListCap, RecordCap};
pub use config::Settings;
pub use context::Ctx;
pub use error::{FieldErrors, ServiceError, Violation, ViolationKind, NON_FIELD_ERRORS};
pub use gate::PolicyGate;
pub use logging::RequestLog;
pub use password::{Argon2Hasher, Argon2Params, HashError, PasswordHasher};
pub use policy::{AccessPolicy, Endpoint, PolicyConfig};
pub use request::{Method, Principal, RequestMeta, TargetRef, UserId, CURRENT_SENTINEL};
pub use secret::Secret;
pub use service::{AccountService, SubjectError};
pub use store::{MemoryStore, StoreError, UserStore};
pub use token::{Claims, TokenError, TokenService};
pub use user::{CreatePayload, NewUser, UpdatePayload, UserRecord, UserView};
