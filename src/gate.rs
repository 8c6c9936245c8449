use crate::{
    capability::{CreateCap, ListCap},
    context::Ctx,
    error::Violation,
    policy::{AccessPolicy, Endpoint},
    request::{Method, RequestMeta},
};

/// The policy enforcement gate.
///
/// `PolicyGate` is the only way to construct a [`Ctx`]. It resolves the
/// `current` sentinel, runs the request-level access check and grants the
/// capability the request earned.
///
/// # Examples
///
/// ```
/// use account_policy::{AccessPolicy, Method, PolicyGate, Principal, RequestMeta, TargetRef};
///
/// let policy = AccessPolicy::default();
/// let meta = RequestMeta {
///     request_id: "req-123".to_string(),
///     principal: Principal::staff(1),
///     method: Method::Get,
///     target: TargetRef::Collection,
/// };
///
/// let ctx = PolicyGate::new(meta, &policy)
///     .build()
///     .expect("staff may list");
///
/// assert!(ctx.list_cap().is_ok());
/// ```
pub struct PolicyGate<'p> {
    meta: RequestMeta,
    policy: &'p AccessPolicy,
    endpoint: Option<Endpoint>,
}

impl<'p> PolicyGate<'p> {
    /// Creates a gate for one request.
    pub fn new(meta: RequestMeta, policy: &'p AccessPolicy) -> Self {
        Self {
            meta,
            policy,
            endpoint: None,
        }
    }

    /// Pins the endpoint whose allowed methods apply.
    ///
    /// Without this the endpoint follows the target: collection targets hit
    /// `/users/`, everything else hits `/users/{pk}/`.
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Validates the request and returns its context.
    ///
    /// # Errors
    ///
    /// Returns a `Violation` if the access policy denies the request:
    /// `Unauthenticated` for anonymous callers, `Forbidden` otherwise.
    pub fn build(self) -> Result<Ctx, Violation> {
        let RequestMeta {
            request_id,
            principal,
            method,
            target,
        } = self.meta;

        // `current` must be concrete before the policy looks at it
        let target = target.resolve(&principal);
        let endpoint = self.endpoint.unwrap_or(if target.is_collection() {
            Endpoint::Collection
        } else {
            Endpoint::Record
        });

        let decision = self
            .policy
            .check(&principal, method, &target, endpoint.allowed_methods());
        tracing::debug!(
            request_id = %request_id,
            principal = ?principal.id,
            staff = principal.is_staff,
            %method,
            %target,
            allowed = decision.is_ok(),
            "access policy evaluated"
        );
        decision?;

        let collection = endpoint == Endpoint::Collection && target.is_collection();
        let mut ctx = Ctx::new(request_id, principal, method, target, self.policy.clone());
        if collection {
            match method {
                Method::Post => ctx = ctx.with_create_cap(CreateCap::new()),
                Method::Get | Method::Head | Method::Options => {
                    ctx = ctx.with_list_cap(ListCap::new())
                }
                _ => {}
            }
        }
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViolationKind;
    use crate::request::{Principal, TargetRef};

    fn meta(principal: Principal, method: Method, target: TargetRef) -> RequestMeta {
        RequestMeta {
            request_id: "req-gate".to_string(),
            principal,
            method,
            target,
        }
    }

    #[test]
    fn anonymous_creation_grants_create_cap() {
        let policy = AccessPolicy::default();
        let ctx = PolicyGate::new(
            meta(Principal::anonymous(), Method::Post, TargetRef::Collection),
            &policy,
        )
        .build()
        .unwrap();

        assert!(ctx.create_cap().is_ok());
        assert!(ctx.list_cap().is_err());
    }

    #[test]
    fn anonymous_current_is_unauthenticated() {
        let policy = AccessPolicy::default();
        let err = PolicyGate::new(
            meta(Principal::anonymous(), Method::Get, TargetRef::Current),
            &policy,
        )
        .build()
        .unwrap_err();

        assert_eq!(err.kind, ViolationKind::Unauthenticated);
    }

    #[test]
    fn current_resolves_before_evaluation() {
        let policy = AccessPolicy::default();
        let ctx = PolicyGate::new(meta(Principal::user(9), Method::Patch, TargetRef::Current), &policy)
            .build()
            .unwrap();

        assert_eq!(ctx.record_id(), Some(9));
    }

    #[test]
    fn user_listing_is_forbidden() {
        let policy = AccessPolicy::default();
        let err = PolicyGate::new(meta(Principal::user(2), Method::Get, TargetRef::Collection), &policy)
            .build()
            .unwrap_err();

        assert_eq!(err.kind, ViolationKind::Forbidden);
    }

    #[test]
    fn record_endpoint_never_grants_collection_caps() {
        let policy = AccessPolicy::default();
        let ctx = PolicyGate::new(meta(Principal::staff(1), Method::Get, TargetRef::Collection), &policy)
            .endpoint(Endpoint::Record)
            .build()
            .unwrap();

        assert!(ctx.list_cap().is_err());
        assert!(ctx.create_cap().is_err());
    }
}
