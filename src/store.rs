use std::collections::BTreeMap;

use parking_lot::RwLock;
use thiserror::Error;

use crate::request::UserId;
use crate::user::{NewUser, UserRecord};

/// Storage failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Usernames are unique
    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),
    /// No record with this id
    #[error("user {0} not found")]
    NotFound(UserId),
}

/// Persistence for user accounts, keyed by numeric id.
///
/// Implementations serialize concurrent writes to the same record; callers
/// do read-modify-write without further locking.
pub trait UserStore: Send + Sync {
    /// All accounts, ordered by id.
    fn list(&self) -> Vec<UserRecord>;

    /// Looks up one account.
    fn get(&self, id: UserId) -> Option<UserRecord>;

    /// Looks up an account by its exact, case-sensitive username.
    fn find_by_username(&self, username: &str) -> Option<UserRecord>;

    /// Inserts a new account and assigns its id.
    fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    /// Overwrites an existing account.
    fn save(&self, user: &UserRecord) -> Result<(), StoreError>;

    /// Removes an account.
    fn delete(&self, id: UserId) -> Result<(), StoreError>;

    /// Flips the activation flag, the out-of-band activation step.
    fn set_active(&self, id: UserId, active: bool) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<UserId, UserRecord>,
    last_id: UserId,
}

/// In-memory [`UserStore`].
///
/// Ids start at 1 and are never reused, even after a delete.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryStore {
    fn list(&self) -> Vec<UserRecord> {
        self.inner.read().users.values().cloned().collect()
    }

    fn get(&self, id: UserId) -> Option<UserRecord> {
        self.inner.read().users.get(&id).cloned()
    }

    fn find_by_username(&self, username: &str) -> Option<UserRecord> {
        self.inner
            .read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
    }

    fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut inner = self.inner.write();
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::DuplicateUsername(user.username));
        }

        inner.last_id += 1;
        let record = UserRecord {
            id: inner.last_id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            is_active: user.is_active,
            is_staff: user.is_staff,
        };
        inner.users.insert(record.id, record.clone());
        Ok(record)
    }

    fn save(&self, user: &UserRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let slot = inner
            .users
            .get_mut(&user.id)
            .ok_or(StoreError::NotFound(user.id))?;
        *slot = user.clone();
        Ok(())
    }

    fn delete(&self, id: UserId) -> Result<(), StoreError> {
        self.inner
            .write()
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    fn set_active(&self, id: UserId, active: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        user.is_active = active;
        Ok(())
    }
}
