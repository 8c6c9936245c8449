use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::password::HashError;
use crate::store::StoreError;

/// Key used for errors that belong to the payload as a whole.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Errors surfaced by the account service.
///
/// Every variant is terminal for the request: nothing has been written when
/// one of these is returned.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The access policy refused the request
    #[error(transparent)]
    Violation(#[from] Violation),
    /// One or more input fields were rejected
    #[error("invalid input: {0}")]
    Invalid(#[from] FieldErrors),
    /// A submitted password did not match the stored one
    #[error("{field}: {message}")]
    Credential {
        /// The field the password was submitted in
        field: &'static str,
        /// Message shown to the client
        message: &'static str,
    },
    /// The addressed record does not exist
    #[error("not found")]
    NotFound,
    /// The request body could not be parsed
    #[error("malformed request: {0}")]
    Malformed(String),
    /// Password hashing failed
    #[error(transparent)]
    Hashing(#[from] HashError),
    /// Anything else that is not the caller's fault
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername(_) => ServiceError::Invalid(FieldErrors::single(
                "username",
                "A user with that username already exists.",
            )),
            StoreError::NotFound(_) => ServiceError::NotFound,
        }
    }
}

/// A policy violation with details about what failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct Violation {
    /// The kind of violation that occurred
    pub kind: ViolationKind,
    /// Human-readable message explaining the violation
    pub message: String,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The caller presented no usable credentials.
    pub fn unauthenticated() -> Self {
        Self::new(
            ViolationKind::Unauthenticated,
            "Authentication credentials were not provided.",
        )
    }

    /// The caller is known but not allowed to do this.
    pub fn forbidden() -> Self {
        Self::new(
            ViolationKind::Forbidden,
            "You do not have permission to perform this action.",
        )
    }
}

/// The kind of policy violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// Authentication is required but missing or invalid
    Unauthenticated,
    /// The authenticated principal lacks permission
    Forbidden,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Unauthenticated => write!(f, "Unauthenticated"),
            ViolationKind::Forbidden => write!(f, "Forbidden"),
        }
    }
}

/// Field-keyed validation messages, serialized as `{"field": ["message"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection holding one message.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Records a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Returns the messages recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    /// Returns `true` when no field has been rejected.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of rejected fields.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}
