use serde::Deserialize;

use crate::error::Violation;
use crate::request::{Method, Principal, TargetRef, UserId};

/// Methods routed to the collection endpoint (`/users/`).
pub const COLLECTION_METHODS: &[Method] = &[Method::Get, Method::Head, Method::Options, Method::Post];

/// Methods routed to the record endpoint (`/users/{pk}/`).
pub const RECORD_METHODS: &[Method] = &[
    Method::Get,
    Method::Head,
    Method::Options,
    Method::Put,
    Method::Patch,
    Method::Delete,
];

/// The two account endpoints and the methods each one accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `/users/`
    Collection,
    /// `/users/{pk}/`
    Record,
}

impl Endpoint {
    /// Methods this endpoint accepts.
    pub fn allowed_methods(self) -> &'static [Method] {
        match self {
            Endpoint::Collection => COLLECTION_METHODS,
            Endpoint::Record => RECORD_METHODS,
        }
    }
}

/// Explicit policy settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Let anyone, including anonymous callers, create an account.
    pub self_registration: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            self_registration: true,
        }
    }
}

/// Staff-or-self access rules for user records.
///
/// Two independent gates: [`authorize`](Self::authorize) runs before any
/// record is loaded, [`has_object_permission`](Self::has_object_permission)
/// runs once the addressed record is in hand. Record-level operations must
/// pass both.
///
/// # Examples
///
/// ```
/// use account_policy::{AccessPolicy, Method, PolicyConfig, Principal, TargetRef};
/// use account_policy::policy::COLLECTION_METHODS;
///
/// let policy = AccessPolicy::new(PolicyConfig::default());
///
/// // Anyone may register
/// assert!(policy.authorize(
///     &Principal::anonymous(),
///     Method::Post,
///     &TargetRef::Collection,
///     COLLECTION_METHODS,
/// ));
///
/// // Only staff may list
/// assert!(!policy.authorize(
///     &Principal::user(2),
///     Method::Get,
///     &TargetRef::Collection,
///     COLLECTION_METHODS,
/// ));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    config: PolicyConfig,
}

impl AccessPolicy {
    /// Creates a policy with the given settings.
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Returns the settings this policy was built with.
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Request-level check, evaluated before any record is loaded.
    ///
    /// `target` must already have had `current` resolved against
    /// `principal`.
    pub fn authorize(
        &self,
        principal: &Principal,
        method: Method,
        target: &TargetRef,
        allowed_methods: &[Method],
    ) -> bool {
        if self.config.self_registration
            && method == Method::Post
            && allowed_methods.contains(&Method::Post)
            && target.is_collection()
        {
            return true;
        }

        if !principal.is_authenticated {
            return false;
        }

        if principal.is_staff {
            return true;
        }

        match (target.id(), principal.id) {
            (Some(target_id), Some(own_id)) => target_id == own_id,
            // Listing, or a target that never became a concrete id
            _ => false,
        }
    }

    /// Record-level check, evaluated once the addressed record is loaded.
    pub fn has_object_permission(&self, principal: &Principal, record_id: UserId) -> bool {
        if !principal.is_authenticated {
            return false;
        }
        principal.is_staff || principal.id == Some(record_id)
    }

    /// [`authorize`](Self::authorize), reporting a denial as a [`Violation`].
    ///
    /// Anonymous callers get `Unauthenticated`, everyone else `Forbidden`.
    pub fn check(
        &self,
        principal: &Principal,
        method: Method,
        target: &TargetRef,
        allowed_methods: &[Method],
    ) -> Result<(), Violation> {
        if self.authorize(principal, method, target, allowed_methods) {
            Ok(())
        } else {
            Err(denial(principal))
        }
    }

    /// [`has_object_permission`](Self::has_object_permission), reporting a
    /// denial as a [`Violation`].
    pub fn check_record(&self, principal: &Principal, record_id: UserId) -> Result<(), Violation> {
        if self.has_object_permission(principal, record_id) {
            Ok(())
        } else {
            Err(denial(principal))
        }
    }
}

fn denial(principal: &Principal) -> Violation {
    if principal.is_authenticated {
        Violation::forbidden()
    } else {
        Violation::unauthenticated()
    }
}
