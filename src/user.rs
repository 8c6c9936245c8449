use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::credential::{CredentialChange, NewCredential};
use crate::error::FieldErrors;
use crate::request::{Principal, UserId};

const USERNAME_MAX: usize = 30;
const NAME_MAX: usize = 30;
const EMAIL_MAX: usize = 254;

const REQUIRED: &str = "This field is required.";
const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers and @/./+/-/_ characters.";
const INVALID_EMAIL: &str = "Enter a valid email address.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern compiles"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@(localhost|[^\s@]+\.[^\s@.]+)$").expect("email pattern compiles")
});

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Store-assigned id
    pub id: UserId,
    /// Login name, immutable through the API
    pub username: String,
    /// Contact address, may be blank
    pub email: String,
    /// Given name, may be blank
    pub first_name: String,
    /// Family name, may be blank
    pub last_name: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Inactive accounts cannot obtain tokens
    pub is_active: bool,
    /// Staff accounts may operate on any record
    pub is_staff: bool,
}

impl UserRecord {
    /// The identity a verified token for this account resolves to.
    pub fn principal(&self) -> Principal {
        Principal {
            id: Some(self.id),
            is_staff: self.is_staff,
            is_authenticated: true,
        }
    }
}

/// An account about to be inserted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login name
    pub username: String,
    /// Contact address
    pub email: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Whether the account may log in
    pub is_active: bool,
    /// Staff flag
    pub is_staff: bool,
}

/// The outward representation of an account.
///
/// Never carries the password hash or the activity and staff flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    /// Account id
    pub id: UserId,
    /// Login name
    pub username: String,
    /// Contact address
    pub email: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
}

impl From<&UserRecord> for UserView {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username.clone(),
            email: record.email.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
        }
    }
}

/// Body of `PUT`/`PATCH /users/{pk}/`.
///
/// `id` and `username` are read-only and silently ignored if sent.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePayload {
    /// Contact address
    #[serde(default)]
    pub email: Option<String>,
    /// Given name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Password fields
    #[serde(flatten)]
    pub credentials: CredentialChange,
}

impl UpdatePayload {
    /// Field-level checks, run before any credential check.
    pub fn validate_fields(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_profile(
            &mut errors,
            self.email.as_deref(),
            self.first_name.as_deref(),
            self.last_name.as_deref(),
        );
        errors.into_result()
    }

    /// Copies the supplied non-credential fields onto `record`.
    pub fn apply_profile(&self, record: &mut UserRecord) {
        if let Some(email) = &self.email {
            record.email = email.clone();
        }
        if let Some(first_name) = &self.first_name {
            record.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            record.last_name = last_name.clone();
        }
    }
}

/// Body of `POST /users/`.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePayload {
    /// Login name
    #[serde(default)]
    pub username: Option<String>,
    /// Contact address
    #[serde(default)]
    pub email: Option<String>,
    /// Given name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Password fields
    #[serde(flatten)]
    pub credentials: NewCredential,
}

impl CreatePayload {
    /// Field-level checks, run before the password checks.
    ///
    /// `username_taken` reports whether an account already holds a name;
    /// every failing field is collected into one error.
    pub fn validate_fields(
        &self,
        username_taken: impl Fn(&str) -> bool,
    ) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        match self.username.as_deref() {
            None | Some("") => errors.add("username", REQUIRED),
            Some(username) => {
                if username.chars().count() > USERNAME_MAX {
                    errors.add("username", too_long(USERNAME_MAX));
                }
                if !USERNAME_RE.is_match(username) {
                    errors.add("username", INVALID_USERNAME);
                }
                if username_taken(username) {
                    errors.add("username", USERNAME_TAKEN);
                }
            }
        }
        check_profile(
            &mut errors,
            self.email.as_deref(),
            self.first_name.as_deref(),
            self.last_name.as_deref(),
        );

        errors.into_result()
    }

    /// Builds the record to insert. New accounts always start inactive.
    pub fn into_new_user(self, password_hash: String) -> NewUser {
        NewUser {
            username: self.username.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            password_hash,
            is_active: false,
            is_staff: false,
        }
    }
}

fn too_long(max: usize) -> String {
    format!("Ensure this field has no more than {} characters.", max)
}

fn check_profile(
    errors: &mut FieldErrors,
    email: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
) {
    if let Some(email) = email.filter(|e| !e.is_empty()) {
        if email.chars().count() > EMAIL_MAX {
            errors.add("email", too_long(EMAIL_MAX));
        } else if !EMAIL_RE.is_match(email) {
            errors.add("email", INVALID_EMAIL);
        }
    }
    for (field, value) in [("first_name", first_name), ("last_name", last_name)] {
        if value.is_some_and(|v| v.chars().count() > NAME_MAX) {
            errors.add(field, too_long(NAME_MAX));
        }
    }
}
