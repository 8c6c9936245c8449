use crate::request::UserId;

/// Proof that the caller may create a new account.
///
/// Zero-sized; only [`PolicyGate`](crate::PolicyGate) hands these out.
#[derive(Debug, Clone, Copy)]
pub struct CreateCap {
    // Private field prevents construction outside the crate
    _private: (),
}

impl CreateCap {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// Proof that the caller may enumerate every account.
#[derive(Debug, Clone, Copy)]
pub struct ListCap {
    _private: (),
}

impl ListCap {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// Proof that the caller passed both the request-level and the
/// record-level check for one specific account.
///
/// Obtained from [`Ctx::grant_record`](crate::Ctx::grant_record) after the
/// record has been loaded.
///
/// ```compile_fail
/// use account_policy::RecordCap;
/// // Error: RecordCap cannot be constructed outside the crate
/// let cap = RecordCap { id: 1, _private: () };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordCap {
    id: UserId,
    _private: (),
}

impl RecordCap {
    pub(crate) fn new(id: UserId) -> Self {
        Self { id, _private: () }
    }

    /// The account this capability covers.
    pub fn id(&self) -> UserId {
        self.id
    }
}
