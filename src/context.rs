use crate::capability::{CreateCap, ListCap, RecordCap};
use crate::error::Violation;
use crate::logging::RequestLog;
use crate::policy::AccessPolicy;
use crate::request::{Method, Principal, TargetRef, UserId};

/// Execution context for one request that passed the request-level check.
///
/// Holds the resolved target and whichever capability the request earned.
/// `Ctx` cannot be constructed by user code; obtain one from
/// [`PolicyGate::build`](crate::PolicyGate::build).
///
/// # Examples
///
/// ```
/// use account_policy::{AccessPolicy, Method, PolicyGate, Principal, RequestMeta, TargetRef};
///
/// let policy = AccessPolicy::default();
/// let meta = RequestMeta {
///     request_id: "req-1".to_string(),
///     principal: Principal::user(4),
///     method: Method::Get,
///     target: TargetRef::Current,
/// };
///
/// let ctx = PolicyGate::new(meta, &policy).build().expect("self access");
/// assert_eq!(ctx.target(), &TargetRef::Id(4));
/// assert!(ctx.list_cap().is_err());
///
/// let cap = ctx.grant_record(4).expect("own record");
/// assert_eq!(cap.id(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct Ctx {
    request_id: String,
    principal: Principal,
    method: Method,
    target: TargetRef,
    policy: AccessPolicy,
    create_cap: Option<CreateCap>,
    list_cap: Option<ListCap>,
}

impl Ctx {
    pub(crate) fn new(
        request_id: String,
        principal: Principal,
        method: Method,
        target: TargetRef,
        policy: AccessPolicy,
    ) -> Self {
        Self {
            request_id,
            principal,
            method,
            target,
            policy,
            create_cap: None,
            list_cap: None,
        }
    }

    pub(crate) fn with_create_cap(mut self, cap: CreateCap) -> Self {
        self.create_cap = Some(cap);
        self
    }

    pub(crate) fn with_list_cap(mut self, cap: ListCap) -> Self {
        self.list_cap = Some(cap);
        self
    }

    /// Returns the request ID for this context.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the caller.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the request method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the target, with `current` already resolved.
    pub fn target(&self) -> &TargetRef {
        &self.target
    }

    /// The concrete record id addressed, if any.
    pub fn record_id(&self) -> Option<UserId> {
        self.target.id()
    }

    /// Returns the creation capability.
    ///
    /// # Errors
    ///
    /// Returns `Err(Violation)` if this request was not a permitted creation.
    pub fn create_cap(&self) -> Result<CreateCap, Violation> {
        self.create_cap.ok_or_else(Violation::forbidden)
    }

    /// Returns the listing capability.
    ///
    /// # Errors
    ///
    /// Returns `Err(Violation)` if this request was not a permitted listing.
    pub fn list_cap(&self) -> Result<ListCap, Violation> {
        self.list_cap.ok_or_else(Violation::forbidden)
    }

    /// Runs the record-level check against a loaded record.
    ///
    /// # Errors
    ///
    /// Returns `Err(Violation)` unless the caller is staff or owns the
    /// record, or if `record_id` is not the record this request addressed.
    pub fn grant_record(&self, record_id: UserId) -> Result<RecordCap, Violation> {
        self.policy.check_record(&self.principal, record_id)?;
        if self.target.id() != Some(record_id) {
            return Err(Violation::forbidden());
        }
        Ok(RecordCap::new(record_id))
    }

    /// Returns a logger bound to this request.
    pub fn log(&self) -> RequestLog<'_> {
        RequestLog::new(&self.request_id, self.principal.id)
    }
}
