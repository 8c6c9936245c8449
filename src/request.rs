use std::fmt;

use strum_macros::{Display, EnumString};

/// Numeric identifier of a stored user account.
pub type UserId = u64;

/// Path segment that addresses the caller's own account.
pub const CURRENT_SENTINEL: &str = "current";

/// Metadata about an incoming request.
///
/// Carries everything the access policy needs: who is calling, what they
/// want to do and which account they are addressing.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Unique identifier for this request
    pub request_id: String,
    /// Resolved caller identity
    pub principal: Principal,
    /// HTTP method of the request
    pub method: Method,
    /// The account the request addresses
    pub target: TargetRef,
}

/// The caller's resolved identity for the current request.
///
/// Built once per request from a verified bearer token; the policy only
/// reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Account id, `None` for anonymous callers
    pub id: Option<UserId>,
    /// Staff accounts may operate on any record
    pub is_staff: bool,
    /// Whether a valid credential accompanied the request
    pub is_authenticated: bool,
}

impl Principal {
    /// A caller that presented no credentials.
    pub fn anonymous() -> Self {
        Self {
            id: None,
            is_staff: false,
            is_authenticated: false,
        }
    }

    /// An authenticated, non-staff caller.
    pub fn user(id: UserId) -> Self {
        Self {
            id: Some(id),
            is_staff: false,
            is_authenticated: true,
        }
    }

    /// An authenticated staff caller.
    pub fn staff(id: UserId) -> Self {
        Self {
            id: Some(id),
            is_staff: true,
            is_authenticated: true,
        }
    }
}

/// HTTP methods the account endpoints understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Method {
    /// GET
    Get,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

/// Which user record a request addresses.
///
/// The `current` sentinel stays a distinct variant until the principal is
/// known; [`TargetRef::resolve`] then substitutes the caller's own id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRef {
    /// No record: the request addresses the whole collection
    Collection,
    /// The `current` sentinel, not yet resolved
    Current,
    /// A concrete account id
    Id(UserId),
    /// A path segment that is neither numeric nor `current`
    Malformed(String),
}

impl TargetRef {
    /// Parses the optional `{pk}` path segment.
    ///
    /// # Examples
    ///
    /// ```
    /// use account_policy::TargetRef;
    ///
    /// assert_eq!(TargetRef::parse(None), TargetRef::Collection);
    /// assert_eq!(TargetRef::parse(Some("current")), TargetRef::Current);
    /// assert_eq!(TargetRef::parse(Some("42")), TargetRef::Id(42));
    /// assert_eq!(
    ///     TargetRef::parse(Some("abc")),
    ///     TargetRef::Malformed("abc".to_string())
    /// );
    /// ```
    pub fn parse(segment: Option<&str>) -> Self {
        match segment {
            None => TargetRef::Collection,
            Some(CURRENT_SENTINEL) => TargetRef::Current,
            Some(raw) => match raw.parse::<UserId>() {
                Ok(id) => TargetRef::Id(id),
                Err(_) => TargetRef::Malformed(raw.to_string()),
            },
        }
    }

    /// Substitutes the caller's id for `current`.
    ///
    /// Anonymous callers have no id, so `current` is left unresolved and the
    /// policy sees a non-numeric target.
    pub fn resolve(self, principal: &Principal) -> Self {
        match (self, principal.id) {
            (TargetRef::Current, Some(id)) if principal.is_authenticated => TargetRef::Id(id),
            (other, _) => other,
        }
    }

    /// Returns the concrete id, if the target has one.
    pub fn id(&self) -> Option<UserId> {
        match self {
            TargetRef::Id(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns `true` for collection-level requests.
    pub fn is_collection(&self) -> bool {
        matches!(self, TargetRef::Collection)
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Collection => f.write_str("<collection>"),
            TargetRef::Current => f.write_str(CURRENT_SENTINEL),
            TargetRef::Id(id) => write!(f, "{}", id),
            TargetRef::Malformed(raw) => write!(f, "{:?}", raw),
        }
    }
}
