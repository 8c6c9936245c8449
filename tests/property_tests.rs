//! Property tests for the access policy and the credential rules.

use account_policy::credential::{
    check_change, ChangeOutcome, CredentialChange, CredentialError, CredentialValidator,
    NewCredential, CURRENT_PASSWORD, NEW_PASSWORD1, NEW_PASSWORD2,
};
use account_policy::policy::{COLLECTION_METHODS, RECORD_METHODS};
use account_policy::{
    AccessPolicy, Argon2Hasher, Argon2Params, CreatePayload, Method, PasswordHasher, PolicyGate,
    Principal, RequestMeta, Secret, TargetRef, ViolationKind,
};
use proptest::prelude::*;

fn arb_method() -> impl Strategy<Value = Method> {
    prop_oneof![
        Just(Method::Get),
        Just(Method::Head),
        Just(Method::Options),
        Just(Method::Post),
        Just(Method::Put),
        Just(Method::Patch),
        Just(Method::Delete),
    ]
}

fn arb_target() -> impl Strategy<Value = TargetRef> {
    prop_oneof![
        Just(TargetRef::Collection),
        Just(TargetRef::Current),
        (1u64..1000).prop_map(TargetRef::Id),
        "[a-z]{1,8}".prop_map(TargetRef::Malformed),
    ]
}

fn arb_allowed() -> impl Strategy<Value = &'static [Method]> {
    prop_oneof![Just(COLLECTION_METHODS), Just(RECORD_METHODS)]
}

fn hasher() -> Argon2Hasher {
    Argon2Hasher::new(Argon2Params {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}

fn secret(value: &str) -> Option<Secret<String>> {
    Some(Secret::new(value.to_string()))
}

fn change(current: Option<&str>, new1: Option<&str>, new2: Option<&str>) -> CredentialChange {
    CredentialChange {
        current_password: current.and_then(secret),
        new_password1: new1.and_then(secret),
        new_password2: new2.and_then(secret),
    }
}

fn field_of(err: &CredentialError) -> Option<&'static str> {
    match err {
        CredentialError::Field { field, .. } => Some(*field),
        _ => None,
    }
}

proptest! {
    #[test]
    fn staff_is_always_allowed(
        id in 1u64..1000,
        method in arb_method(),
        target in arb_target(),
        allowed in arb_allowed(),
    ) {
        let policy = AccessPolicy::default();
        prop_assert!(policy.authorize(&Principal::staff(id), method, &target, allowed));
    }

    #[test]
    fn anonymous_may_register_but_never_read(target in arb_target(), allowed in arb_allowed()) {
        let policy = AccessPolicy::default();
        let anon = Principal::anonymous();

        prop_assert!(policy.authorize(&anon, Method::Post, &TargetRef::Collection, COLLECTION_METHODS));
        prop_assert!(!policy.authorize(&anon, Method::Get, &target, allowed));
    }

    #[test]
    fn users_never_list(id in 1u64..1000, allowed in arb_allowed()) {
        let policy = AccessPolicy::default();
        prop_assert!(!policy.authorize(&Principal::user(id), Method::Get, &TargetRef::Collection, allowed));
    }

    #[test]
    fn users_never_touch_other_records(
        id in 1u64..1000,
        other in 1u64..1000,
        method in arb_method(),
        allowed in arb_allowed(),
    ) {
        prop_assume!(id != other);
        let policy = AccessPolicy::default();
        let user = Principal::user(id);

        prop_assert!(!policy.authorize(&user, method, &TargetRef::Id(other), allowed));
        prop_assert!(!policy.has_object_permission(&user, other));
    }

    #[test]
    fn users_reach_themselves_through_current(id in 1u64..1000, method in arb_method()) {
        prop_assume!(method != Method::Post);
        let policy = AccessPolicy::default();
        let meta = RequestMeta {
            request_id: "req-prop".to_string(),
            principal: Principal::user(id),
            method,
            target: TargetRef::Current,
        };

        let ctx = PolicyGate::new(meta, &policy).build().unwrap();
        prop_assert_eq!(ctx.record_id(), Some(id));
        prop_assert!(ctx.grant_record(id).is_ok());
    }

    #[test]
    fn anonymous_denials_are_unauthenticated(method in arb_method(), target in arb_target()) {
        prop_assume!(!(method == Method::Post && target == TargetRef::Collection));
        let policy = AccessPolicy::default();
        let meta = RequestMeta {
            request_id: "req-prop".to_string(),
            principal: Principal::anonymous(),
            method,
            target,
        };

        let err = PolicyGate::new(meta, &policy).build().unwrap_err();
        prop_assert_eq!(err.kind, ViolationKind::Unauthenticated);
    }

    #[test]
    fn short_new_password_is_rejected(
        current in "[a-z]{6,12}",
        short in "[a-z]{0,5}",
    ) {
        let err = check_change(&change(Some(current.as_str()), Some(short.as_str()), Some(short.as_str()))).unwrap_err();
        prop_assert_eq!(field_of(&err), Some(NEW_PASSWORD1));
    }

    #[test]
    fn reusing_current_password_is_rejected(current in "[a-z]{6,12}") {
        let err = check_change(&change(Some(current.as_str()), Some(current.as_str()), Some(current.as_str()))).unwrap_err();
        prop_assert_eq!(field_of(&err), Some(NEW_PASSWORD1));
        prop_assert_eq!(
            err.message(),
            Some("Your new password has to be different from your existing password.")
        );
    }

    #[test]
    fn mismatched_confirmation_is_rejected(
        current in "[A-Z]{6,12}",
        new in "[a-z]{6,12}",
        suffix in "[0-9]{1,3}",
    ) {
        let confirm = format!("{new}{suffix}");
        let err = check_change(&change(Some(current.as_str()), Some(new.as_str()), Some(confirm.as_str()))).unwrap_err();
        prop_assert_eq!(field_of(&err), Some(NEW_PASSWORD2));
    }

    #[test]
    fn new_password_without_current_is_rejected(new in "[a-z]{6,12}") {
        let err = check_change(&change(None, Some(new.as_str()), Some(new.as_str()))).unwrap_err();
        prop_assert_eq!(field_of(&err), Some(CURRENT_PASSWORD));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn wrong_current_password_is_an_auth_error(
        stored in "[a-z]{6,12}",
        wrong in "[A-Z]{6,12}",
    ) {
        let hasher = hasher();
        let hash = hasher.hash(&stored).unwrap();
        let err = CredentialValidator::new(&hasher)
            .validate_change(&change(Some(wrong.as_str()), Some("booyah"), Some("booyah")), &hash)
            .unwrap_err();

        let is_auth = matches!(err, CredentialError::Auth { .. });
        prop_assert!(is_auth);
        prop_assert_eq!(err.field_name(), Some(CURRENT_PASSWORD));
    }

    #[test]
    fn successful_change_swaps_the_hash(stored in "[a-z]{6,12}") {
        prop_assume!(stored != "booyah");
        let hasher = hasher();
        let hash = hasher.hash(&stored).unwrap();
        let outcome = CredentialValidator::new(&hasher)
            .validate_change(&change(Some(stored.as_str()), Some("booyah"), Some("booyah")), &hash)
            .unwrap();

        let ChangeOutcome::Replaced { password_hash } = outcome else {
            return Err(TestCaseError::fail("expected a replacement hash"));
        };
        prop_assert!(hasher.verify("booyah", &password_hash).unwrap());
        prop_assert!(!hasher.verify(&stored, &password_hash).unwrap());
    }

    #[test]
    fn creation_yields_inactive_account(username in "[a-z]{1,20}", password in "[a-z]{6,12}") {
        let hasher = hasher();
        let payload = CreatePayload {
            username: Some(username.clone()),
            credentials: NewCredential {
                new_password1: secret(&password),
                new_password2: secret(&password),
            },
            ..Default::default()
        };

        let hash = CredentialValidator::new(&hasher)
            .validate_creation(&payload.credentials)
            .unwrap();
        let user = payload.into_new_user(hash);

        prop_assert!(!user.is_active);
        prop_assert_eq!(user.username, username);
        prop_assert!(hasher.verify(&password, &user.password_hash).unwrap());
    }
}

#[test]
fn creation_without_password_is_rejected() {
    let hasher = hasher();
    let err = CredentialValidator::new(&hasher)
        .validate_creation(&NewCredential::default())
        .unwrap_err();
    assert_eq!(err.field_name(), Some(NEW_PASSWORD1));
    assert_eq!(err.message(), Some("You need to create a password."));
}
