//! Account operations, each one routed through the [`PolicyGate`].
//!
//! Every operation follows the same order: request-level check, record
//! lookup, record-level check, validation, and only then a write. A failure
//! at any step returns before the store is touched.

use std::sync::Arc;

use thiserror::Error;

use crate::capability::RecordCap;
use crate::context::Ctx;
use crate::credential::{ChangeOutcome, CredentialValidator};
use crate::error::{FieldErrors, ServiceError, NON_FIELD_ERRORS};
use crate::gate::PolicyGate;
use crate::password::{HashError, PasswordHasher};
use crate::policy::{AccessPolicy, Endpoint};
use crate::request::{RequestMeta, TargetRef};
use crate::store::UserStore;
use crate::token::Claims;
use crate::user::{CreatePayload, NewUser, UpdatePayload, UserRecord, UserView};

const BAD_LOGIN: &str = "Unable to log in with provided credentials.";
const DUMMY_PASSWORD: &str = "dummy-password";

/// Why a token's subject cannot act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubjectError {
    /// The account was deleted after the token was issued
    #[error("User doesn't exist.")]
    Missing,
    /// The account is not active
    #[error("User account is disabled.")]
    Disabled,
}

/// The user-account service.
///
/// Cheap to clone; the store and hasher are shared.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    policy: AccessPolicy,
    // Verified against when a login names no account
    dummy_hash: Arc<str>,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl AccountService {
    /// Creates a service over `store`.
    ///
    /// Hashes a throwaway password up front so that logins for unknown
    /// usernames cost as much as logins for real ones.
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        policy: AccessPolicy,
    ) -> Result<Self, HashError> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?.into();
        Ok(Self {
            store,
            hasher,
            policy,
            dummy_hash,
        })
    }

    /// The policy requests are checked against.
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    fn gate(&self, meta: RequestMeta, endpoint: Endpoint) -> Result<Ctx, ServiceError> {
        Ok(PolicyGate::new(meta, &self.policy).endpoint(endpoint).build()?)
    }

    /// Loads the addressed record and runs the record-level check on it.
    ///
    /// Lookup comes first, so staff see 404 for a missing record while the
    /// request-level check has already turned everyone else away.
    fn load(&self, ctx: &Ctx) -> Result<(RecordCap, UserRecord), ServiceError> {
        let record = match ctx.target() {
            TargetRef::Id(id) => self.store.get(*id).ok_or(ServiceError::NotFound)?,
            _ => return Err(ServiceError::NotFound),
        };
        let cap = ctx.grant_record(record.id)?;
        Ok((cap, record))
    }

    fn persist(&self, cap: RecordCap, record: &UserRecord) -> Result<(), ServiceError> {
        if cap.id() != record.id {
            return Err(ServiceError::Internal(format!(
                "capability for {} used on record {}",
                cap.id(),
                record.id
            )));
        }
        Ok(self.store.save(record)?)
    }

    /// `GET /users/`: every account, ordered by id. Staff only.
    pub fn list(&self, meta: RequestMeta) -> Result<Vec<UserView>, ServiceError> {
        let ctx = self.gate(meta, Endpoint::Collection)?;
        ctx.list_cap()?;

        let users: Vec<UserView> = self.store.list().iter().map(UserView::from).collect();
        ctx.log().debug(format_args!("listed {} users", users.len()));
        Ok(users)
    }

    /// `POST /users/`: registers a new, inactive account.
    pub fn create(&self, meta: RequestMeta, payload: CreatePayload) -> Result<UserView, ServiceError> {
        let ctx = self.gate(meta, Endpoint::Collection)?;
        ctx.create_cap()?;

        payload.validate_fields(|username| self.store.find_by_username(username).is_some())?;

        let password_hash =
            CredentialValidator::new(self.hasher.as_ref()).validate_creation(&payload.credentials)?;
        let record = self.store.insert(payload.into_new_user(password_hash))?;

        ctx.log()
            .info(format_args!("created user {} ({})", record.id, record.username));
        Ok(UserView::from(&record))
    }

    /// `GET /users/{pk}/`.
    pub fn retrieve(&self, meta: RequestMeta) -> Result<UserView, ServiceError> {
        let ctx = self.gate(meta, Endpoint::Record)?;
        let (_cap, record) = self.load(&ctx)?;
        Ok(UserView::from(&record))
    }

    /// `PUT`/`PATCH /users/{pk}/`: profile fields plus an optional password
    /// change, applied all-or-nothing.
    pub fn update(&self, meta: RequestMeta, payload: UpdatePayload) -> Result<UserView, ServiceError> {
        let ctx = self.gate(meta, Endpoint::Record)?;
        let (cap, mut record) = self.load(&ctx)?;

        payload.validate_fields()?;
        let outcome = CredentialValidator::new(self.hasher.as_ref())
            .validate_change(&payload.credentials, &record.password_hash)
            .inspect_err(|err| {
                if let Some(field) = err.field_name() {
                    ctx.log()
                        .warn(format_args!("credential change rejected on {}", field));
                }
            })?;

        payload.apply_profile(&mut record);
        let password_changed = match outcome {
            ChangeOutcome::Replaced { password_hash } => {
                record.password_hash = password_hash;
                true
            }
            ChangeOutcome::Unchanged => false,
        };
        self.persist(cap, &record)?;

        ctx.log().info(format_args!(
            "updated user {} (password changed: {})",
            record.id, password_changed
        ));
        Ok(UserView::from(&record))
    }

    /// `DELETE /users/{pk}/`.
    pub fn delete(&self, meta: RequestMeta) -> Result<(), ServiceError> {
        let ctx = self.gate(meta, Endpoint::Record)?;
        let (cap, record) = self.load(&ctx)?;

        self.store.delete(cap.id())?;
        ctx.log().info(format_args!("deleted user {}", record.id));
        Ok(())
    }

    /// Checks a username and password for token issuance.
    ///
    /// The disabled-account message is only revealed to a caller who knows
    /// the password.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<UserRecord, ServiceError> {
        let Some(user) = self.store.find_by_username(username) else {
            self.hasher.verify(password, &self.dummy_hash)?;
            return Err(FieldErrors::single(NON_FIELD_ERRORS, BAD_LOGIN).into());
        };
        if !self.hasher.verify(password, &user.password_hash)? {
            tracing::debug!(username, "login rejected: wrong password");
            return Err(FieldErrors::single(NON_FIELD_ERRORS, BAD_LOGIN).into());
        }
        if !user.is_active {
            return Err(FieldErrors::single(NON_FIELD_ERRORS, SubjectError::Disabled.to_string()).into());
        }
        Ok(user)
    }

    /// Resolves the account a verified token speaks for.
    pub fn subject(&self, claims: &Claims) -> Result<UserRecord, SubjectError> {
        let user = self.store.get(claims.user_id).ok_or(SubjectError::Missing)?;
        if !user.is_active {
            return Err(SubjectError::Disabled);
        }
        Ok(user)
    }

    /// Creates an active staff account unless `username` already exists.
    ///
    /// Returns `true` when an account was created. An existing account is
    /// left untouched, password included.
    pub fn ensure_staff(&self, username: &str, password: &str, email: &str) -> Result<bool, ServiceError> {
        if self.store.find_by_username(username).is_some() {
            return Ok(false);
        }

        let user = self.store.insert(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: self.hasher.hash(password)?,
            is_active: true,
            is_staff: true,
        })?;
        tracing::warn!(user_id = user.id, username, "created bootstrap staff account");
        Ok(true)
    }

    /// Runs only the request-level check, for `OPTIONS`.
    pub fn authorize(&self, meta: RequestMeta, endpoint: Endpoint) -> Result<(), ServiceError> {
        self.gate(meta, endpoint).map(|_| ())
    }
}
