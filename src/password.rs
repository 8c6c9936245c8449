use argon2::password_hash::{
    self, rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::Deserialize;
use thiserror::Error;

/// Password hashing failures.
///
/// A mismatch is not an error; these only cover broken parameters or a
/// stored hash that cannot be parsed.
#[derive(Debug, Error)]
pub enum HashError {
    /// The configured Argon2 parameters were rejected
    #[error("invalid hashing parameters: {0}")]
    Params(String),
    /// The stored hash is not a valid PHC string
    #[error("stored password hash is malformed: {0}")]
    Malformed(String),
    /// Hash computation failed
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Computes and checks stored credentials.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plain-text password for storage.
    fn hash(&self, plain: &str) -> Result<String, HashError>;

    /// Checks a plain-text password against a stored hash.
    fn verify(&self, plain: &str, hash: &str) -> Result<bool, HashError>;
}

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Argon2Params {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Argon2id hasher producing PHC strings with a random salt.
///
/// # Examples
///
/// ```
/// use account_policy::{Argon2Hasher, Argon2Params, PasswordHasher};
///
/// let hasher = Argon2Hasher::new(Argon2Params {
///     memory_kib: 1024,
///     iterations: 1,
///     parallelism: 1,
/// })
/// .unwrap();
///
/// let hash = hasher.hash("johnpassword").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// assert!(hasher.verify("johnpassword", &hash).unwrap());
/// assert!(!hasher.verify("booyah", &hash).unwrap());
/// ```
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for Argon2Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2Hasher")
            .field("params", self.argon2.params())
            .finish()
    }
}

impl Argon2Hasher {
    /// Builds a hasher, validating the cost parameters up front.
    pub fn new(params: Argon2Params) -> Result<Self, HashError> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|err| HashError::Params(err.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|err| HashError::Hash(err.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, plain: &str, hash: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(hash).map_err(|err| HashError::Malformed(err.to_string()))?;
        // Cost parameters come from the PHC string, not from `self`
        match self.argon2.verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(HashError::Hash(err.to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> Argon2Hasher {
    Argon2Hasher::new(Argon2Params {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .expect("test params are valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted() {
        let hasher = test_hasher();
        let a = hasher.hash("johnpassword").unwrap();
        let b = hasher.hash("johnpassword").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("johnpassword", &a).unwrap());
        assert!(hasher.verify("johnpassword", &b).unwrap());
    }

    #[test]
    fn hash_from_other_params_still_verifies() {
        let cheap = test_hasher();
        let other = Argon2Hasher::new(Argon2Params {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();

        let hash = other.hash("booyah").unwrap();
        assert!(cheap.verify("booyah", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        let hasher = test_hasher();
        let err = hasher.verify("booyah", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, HashError::Malformed(_)));
    }

    #[test]
    fn invalid_params_are_rejected() {
        let err = Argon2Hasher::new(Argon2Params {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        })
        .unwrap_err();
        assert!(matches!(err, HashError::Params(_)));
    }
}
