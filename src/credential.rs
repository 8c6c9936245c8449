//! Password-change and initial-password validation.
//!
//! Validation is split in two. The syntactic checks
//! ([`check_change`], [`check_creation`]) only look at the submitted text and
//! never touch a stored hash. The apply step
//! ([`CredentialValidator::apply_change`]) verifies the submitted current
//! password against the stored hash and produces the replacement hash.
//! Nothing is written unless every step succeeds.

use serde::Deserialize;
use thiserror::Error;

use crate::error::FieldErrors;
use crate::password::{HashError, PasswordHasher};
use crate::secret::Secret;

/// Shortest accepted new password, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Field name of the submitted current password.
pub const CURRENT_PASSWORD: &str = "current_password";
/// Field name of the new password.
pub const NEW_PASSWORD1: &str = "new_password1";
/// Field name of the new password confirmation.
pub const NEW_PASSWORD2: &str = "new_password2";

const TOO_SHORT: &str = "Your new password must be longer than 6 characters.";
const SAME_AS_CURRENT: &str = "Your new password has to be different from your existing password.";
const MISMATCH: &str = "Your new password entries do not match.";
const CURRENT_REQUIRED: &str = "You must enter your current password before you can change it.";
const WRONG_PASSWORD: &str = "You entered the wrong password.";
const PASSWORD_REQUIRED: &str = "You need to create a password.";

/// Why a credential change or initial password was refused.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// A password field is missing or malformed
    #[error("{field}: {message}")]
    Field {
        /// The offending field
        field: &'static str,
        /// Message shown to the client
        message: &'static str,
    },
    /// The submitted current password does not match the stored one
    #[error("{field}: {message}")]
    Auth {
        /// Always `current_password`
        field: &'static str,
        /// Message shown to the client
        message: &'static str,
    },
    /// Hashing or verification broke
    #[error(transparent)]
    Hashing(#[from] HashError),
}

impl CredentialError {
    fn field(field: &'static str, message: &'static str) -> Self {
        CredentialError::Field { field, message }
    }

    /// The field the error is reported against, if it is a client error.
    pub fn field_name(&self) -> Option<&'static str> {
        match self {
            CredentialError::Field { field, .. } | CredentialError::Auth { field, .. } => {
                Some(*field)
            }
            CredentialError::Hashing(_) => None,
        }
    }

    /// The message shown to the client, if it is a client error.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            CredentialError::Field { message, .. } | CredentialError::Auth { message, .. } => {
                Some(*message)
            }
            CredentialError::Hashing(_) => None,
        }
    }
}

/// The password-related part of an update payload.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialChange {
    /// The password the caller believes is current
    #[serde(default)]
    pub current_password: Option<Secret<String>>,
    /// Replacement password
    #[serde(default)]
    pub new_password1: Option<Secret<String>>,
    /// Replacement password, repeated
    #[serde(default)]
    pub new_password2: Option<Secret<String>>,
}

impl CredentialChange {
    /// Returns `true` when any password field was supplied.
    pub fn is_requested(&self) -> bool {
        self.current_password.is_some() || self.new_password1.is_some() || self.new_password2.is_some()
    }
}

/// The password part of a creation payload.
#[derive(Debug, Default, Deserialize)]
pub struct NewCredential {
    /// Initial password
    #[serde(default)]
    pub new_password1: Option<Secret<String>>,
    /// Initial password, repeated
    #[serde(default)]
    pub new_password2: Option<Secret<String>>,
}

/// A change that passed the syntactic checks and awaits verification.
///
/// Only [`check_change`] builds one.
#[derive(Debug)]
pub struct PendingChange<'a> {
    current: &'a str,
    new: &'a str,
}

/// Result of a validated update.
#[derive(Debug, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// No password fields were supplied
    Unchanged,
    /// The stored hash must be replaced with this one
    Replaced {
        /// Hash of the new password
        password_hash: String,
    },
}

fn expose(field: &Option<Secret<String>>) -> Option<&str> {
    field.as_ref().map(|s| s.expose_secret().as_str())
}

fn too_short(password: &str) -> bool {
    password.chars().count() < MIN_PASSWORD_LEN
}

/// Syntactic checks for a password change on update.
///
/// Returns `Ok(None)` when no change was requested. The "must differ" rule
/// compares the new password with the submitted current password text,
/// never with the stored hash.
pub fn check_change(change: &CredentialChange) -> Result<Option<PendingChange<'_>>, CredentialError> {
    let current = expose(&change.current_password);
    let new1 = expose(&change.new_password1);
    let new2 = expose(&change.new_password2);

    let Some(current) = current else {
        if new1.is_some() || new2.is_some() {
            return Err(CredentialError::field(CURRENT_PASSWORD, CURRENT_REQUIRED));
        }
        return Ok(None);
    };

    let new = match new1 {
        Some(new) if !too_short(new) => new,
        _ => return Err(CredentialError::field(NEW_PASSWORD1, TOO_SHORT)),
    };
    if new == current {
        return Err(CredentialError::field(NEW_PASSWORD1, SAME_AS_CURRENT));
    }
    if Some(new) != new2 {
        return Err(CredentialError::field(NEW_PASSWORD2, MISMATCH));
    }

    Ok(Some(PendingChange { current, new }))
}

/// Syntactic checks for the initial password on creation.
///
/// Absence is reported before length, unlike the update path where absence
/// means "no change".
pub fn check_creation(credential: &NewCredential) -> Result<&str, CredentialError> {
    let Some(new1) = expose(&credential.new_password1) else {
        return Err(CredentialError::field(NEW_PASSWORD1, PASSWORD_REQUIRED));
    };
    if too_short(new1) {
        return Err(CredentialError::field(NEW_PASSWORD1, TOO_SHORT));
    }
    if Some(new1) != expose(&credential.new_password2) {
        return Err(CredentialError::field(NEW_PASSWORD2, MISMATCH));
    }
    Ok(new1)
}

/// Validates and applies credential changes using a password hasher.
///
/// # Examples
///
/// ```
/// use account_policy::{Argon2Hasher, Argon2Params, PasswordHasher};
/// use account_policy::credential::{ChangeOutcome, CredentialChange, CredentialValidator};
///
/// let hasher = Argon2Hasher::new(Argon2Params { memory_kib: 1024, iterations: 1, parallelism: 1 }).unwrap();
/// let stored = hasher.hash("johnpassword").unwrap();
///
/// let change: CredentialChange = serde_json::from_str(r#"{
///     "current_password": "johnpassword",
///     "new_password1": "booyah",
///     "new_password2": "booyah"
/// }"#).unwrap();
///
/// let validator = CredentialValidator::new(&hasher);
/// match validator.validate_change(&change, &stored).unwrap() {
///     ChangeOutcome::Replaced { password_hash } => {
///         assert!(hasher.verify("booyah", &password_hash).unwrap());
///     }
///     ChangeOutcome::Unchanged => unreachable!(),
/// }
/// ```
pub struct CredentialValidator<'h> {
    hasher: &'h dyn PasswordHasher,
}

impl<'h> CredentialValidator<'h> {
    /// Creates a validator backed by `hasher`.
    pub fn new(hasher: &'h dyn PasswordHasher) -> Self {
        Self { hasher }
    }

    /// Verifies the current password and hashes the new one.
    pub fn apply_change(
        &self,
        pending: PendingChange<'_>,
        stored_password_hash: &str,
    ) -> Result<String, CredentialError> {
        if !self.hasher.verify(pending.current, stored_password_hash)? {
            return Err(CredentialError::Auth {
                field: CURRENT_PASSWORD,
                message: WRONG_PASSWORD,
            });
        }
        Ok(self.hasher.hash(pending.new)?)
    }

    /// Full update-path validation: syntactic checks, then the apply step.
    pub fn validate_change(
        &self,
        change: &CredentialChange,
        stored_password_hash: &str,
    ) -> Result<ChangeOutcome, CredentialError> {
        match check_change(change)? {
            None => Ok(ChangeOutcome::Unchanged),
            Some(pending) => Ok(ChangeOutcome::Replaced {
                password_hash: self.apply_change(pending, stored_password_hash)?,
            }),
        }
    }

    /// Full creation-path validation, returning the hash to store.
    pub fn validate_creation(&self, credential: &NewCredential) -> Result<String, CredentialError> {
        let password = check_creation(credential)?;
        Ok(self.hasher.hash(password)?)
    }
}

impl From<CredentialError> for crate::error::ServiceError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Field { field, message } => {
                crate::error::ServiceError::Invalid(FieldErrors::single(field, message))
            }
            CredentialError::Auth { field, message } => {
                crate::error::ServiceError::Credential { field, message }
            }
            CredentialError::Hashing(err) => crate::error::ServiceError::Hashing(err),
        }
    }
}
